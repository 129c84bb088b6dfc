//! [`SiteMapStore`] for [`SqliteStore`]: maps, measurements, rules.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  measure::{ComplianceRule, Point},
  site_map::{Measurement, NewComplianceRule, NewMeasurement, NewSiteMap, SiteMap},
  store::SiteMapStore,
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{decode_dt, decode_enum, decode_uuid, encode_dt, encode_enum, encode_uuid},
};

// ─── Rows ────────────────────────────────────────────────────────────────────

const SITE_MAP_COLUMNS: &str = "site_map_id, event_id, name, width, height, unit, created_at";

struct RawSiteMap {
  site_map_id: String,
  event_id:    String,
  name:        String,
  width:       f64,
  height:      f64,
  unit:        String,
  created_at:  String,
}

impl RawSiteMap {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      site_map_id: row.get(0)?,
      event_id:    row.get(1)?,
      name:        row.get(2)?,
      width:       row.get(3)?,
      height:      row.get(4)?,
      unit:        row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  fn into_site_map(self) -> Result<SiteMap> {
    Ok(SiteMap {
      site_map_id: decode_uuid(&self.site_map_id)?,
      event_id:    decode_uuid(&self.event_id)?,
      name:        self.name,
      width:       self.width,
      height:      self.height,
      unit:        decode_enum(&self.unit, "unit")?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

const MEASUREMENT_COLUMNS: &str =
  "measurement_id, site_map_id, label, kind, points_json, unit, value, created_at";

struct RawMeasurement {
  measurement_id: String,
  site_map_id:    String,
  label:          String,
  kind:           String,
  points_json:    String,
  unit:           String,
  value:          f64,
  created_at:     String,
}

impl RawMeasurement {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      measurement_id: row.get(0)?,
      site_map_id:    row.get(1)?,
      label:          row.get(2)?,
      kind:           row.get(3)?,
      points_json:    row.get(4)?,
      unit:           row.get(5)?,
      value:          row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  fn into_measurement(self) -> Result<Measurement> {
    let points: Vec<Point> = serde_json::from_str(&self.points_json)?;
    Ok(Measurement {
      measurement_id: decode_uuid(&self.measurement_id)?,
      site_map_id:    decode_uuid(&self.site_map_id)?,
      label:          self.label,
      kind:           decode_enum(&self.kind, "measurement kind")?,
      points,
      unit:           decode_enum(&self.unit, "unit")?,
      value:          self.value,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

const RULE_COLUMNS: &str = "rule_id, name, kind, min_value, max_value, unit, severity";

struct RawRule {
  rule_id:   String,
  name:      String,
  kind:      String,
  min_value: Option<f64>,
  max_value: Option<f64>,
  unit:      String,
  severity:  String,
}

impl RawRule {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rule_id:   row.get(0)?,
      name:      row.get(1)?,
      kind:      row.get(2)?,
      min_value: row.get(3)?,
      max_value: row.get(4)?,
      unit:      row.get(5)?,
      severity:  row.get(6)?,
    })
  }

  fn into_rule(self) -> Result<ComplianceRule> {
    Ok(ComplianceRule {
      rule_id:   decode_uuid(&self.rule_id)?,
      name:      self.name,
      kind:      decode_enum(&self.kind, "measurement kind")?,
      min_value: self.min_value,
      max_value: self.max_value,
      unit:      decode_enum(&self.unit, "unit")?,
      severity:  decode_enum(&self.severity, "severity")?,
    })
  }
}

impl SqliteStore {
  async fn site_map_exists(&self, site_map_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(site_map_id);
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM site_maps WHERE site_map_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }
}

// ─── SiteMapStore impl ───────────────────────────────────────────────────────

impl SiteMapStore for SqliteStore {
  async fn create_site_map(&self, input: NewSiteMap) -> Result<SiteMap> {
    input.validate()?;

    let site_map = SiteMap {
      site_map_id: Uuid::new_v4(),
      event_id:    input.event_id,
      name:        input.name.trim().to_owned(),
      width:       input.width,
      height:      input.height,
      unit:        input.unit,
      created_at:  Utc::now(),
    };

    let id_str    = encode_uuid(site_map.site_map_id);
    let event_str = encode_uuid(site_map.event_id);
    let name      = site_map.name.clone();
    let (width, height) = (site_map.width, site_map.height);
    let unit_str  = encode_enum(site_map.unit);
    let at_str    = encode_dt(site_map.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO site_maps ({SITE_MAP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![id_str, event_str, name, width, height, unit_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(site_map)
  }

  async fn get_site_map(&self, site_map_id: Uuid) -> Result<Option<SiteMap>> {
    let id_str = encode_uuid(site_map_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {SITE_MAP_COLUMNS} FROM site_maps WHERE site_map_id = ?1"),
              rusqlite::params![id_str],
              RawSiteMap::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSiteMap::into_site_map).transpose()
  }

  async fn list_site_maps(&self, event_id: Uuid) -> Result<Vec<SiteMap>> {
    let event_str = encode_uuid(event_id);
    let raws: Vec<RawSiteMap> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SITE_MAP_COLUMNS} FROM site_maps WHERE event_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], RawSiteMap::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSiteMap::into_site_map).collect()
  }

  async fn add_measurement(&self, input: NewMeasurement) -> Result<Measurement> {
    input.validate()?;
    if !self.site_map_exists(input.site_map_id).await? {
      return Err(CoreError::not_found("site map", input.site_map_id).into());
    }

    let measurement = Measurement {
      measurement_id: Uuid::new_v4(),
      site_map_id:    input.site_map_id,
      label:          input.label.trim().to_owned(),
      kind:           input.kind,
      value:          input.value(),
      points:         input.points,
      unit:           input.unit,
      created_at:     Utc::now(),
    };

    let id_str      = encode_uuid(measurement.measurement_id);
    let map_str     = encode_uuid(measurement.site_map_id);
    let label       = measurement.label.clone();
    let kind_str    = encode_enum(measurement.kind);
    let points_json = serde_json::to_string(&measurement.points)?;
    let unit_str    = encode_enum(measurement.unit);
    let value       = measurement.value;
    let at_str      = encode_dt(measurement.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO measurements ({MEASUREMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
          ),
          rusqlite::params![id_str, map_str, label, kind_str, points_json, unit_str, value, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(
      measurement_id = %measurement.measurement_id,
      value = measurement.value,
      "recorded measurement"
    );
    Ok(measurement)
  }

  async fn get_measurement(&self, measurement_id: Uuid) -> Result<Option<Measurement>> {
    let id_str = encode_uuid(measurement_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE measurement_id = ?1"),
              rusqlite::params![id_str],
              RawMeasurement::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawMeasurement::into_measurement).transpose()
  }

  async fn list_measurements(&self, site_map_id: Uuid) -> Result<Vec<Measurement>> {
    let map_str = encode_uuid(site_map_id);
    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEASUREMENT_COLUMNS} FROM measurements
           WHERE site_map_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![map_str], RawMeasurement::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMeasurement::into_measurement).collect()
  }

  async fn delete_measurement(&self, measurement_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(measurement_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM measurements WHERE measurement_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn add_rule(&self, input: NewComplianceRule) -> Result<ComplianceRule> {
    input.validate()?;
    if !self.site_map_exists(input.site_map_id).await? {
      return Err(CoreError::not_found("site map", input.site_map_id).into());
    }

    let rule = ComplianceRule {
      rule_id:   Uuid::new_v4(),
      name:      input.name.trim().to_owned(),
      kind:      input.kind,
      min_value: input.min_value,
      max_value: input.max_value,
      unit:      input.unit,
      severity:  input.severity,
    };

    let id_str       = encode_uuid(rule.rule_id);
    let map_str      = encode_uuid(input.site_map_id);
    let name         = rule.name.clone();
    let kind_str     = encode_enum(rule.kind);
    let (min, max)   = (rule.min_value, rule.max_value);
    let unit_str     = encode_enum(rule.unit);
    let severity_str = encode_enum(rule.severity);
    let at_str       = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO compliance_rules (
             rule_id, site_map_id, name, kind, min_value, max_value, unit, severity, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            map_str,
            name,
            kind_str,
            min,
            max,
            unit_str,
            severity_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(rule)
  }

  async fn list_rules(&self, site_map_id: Uuid) -> Result<Vec<ComplianceRule>> {
    let map_str = encode_uuid(site_map_id);
    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RULE_COLUMNS} FROM compliance_rules
           WHERE site_map_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![map_str], RawRule::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawRule::into_rule).collect()
  }
}
