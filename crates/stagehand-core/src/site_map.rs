//! Site maps, the measurements drawn on them, and compliance reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  measure::{
    self, ComplianceResult, ComplianceRule, ComplianceStatus, MeasurementKind, Point,
    Severity, Unit,
  },
};

/// A scaled floor or ground plan attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteMap {
  pub site_map_id: Uuid,
  pub event_id:    Uuid,
  pub name:        String,
  pub width:       f64,
  pub height:      f64,
  /// Unit of `width`, `height`, and every point drawn on the map.
  pub unit:        Unit,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSiteMap {
  pub event_id: Uuid,
  pub name:     String,
  pub width:    f64,
  pub height:   f64,
  pub unit:     Unit,
}

impl NewSiteMap {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("site map name must not be empty"));
    }
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(self.width) || !positive(self.height) {
      return Err(Error::invalid("site map dimensions must be positive"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
  pub measurement_id: Uuid,
  pub site_map_id:    Uuid,
  pub label:          String,
  pub kind:           MeasurementKind,
  pub points:         Vec<Point>,
  pub unit:           Unit,
  /// Computed from `points` when recorded.
  pub value:          f64,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMeasurement {
  pub site_map_id: Uuid,
  pub label:       String,
  pub kind:        MeasurementKind,
  pub points:      Vec<Point>,
  pub unit:        Unit,
}

impl NewMeasurement {
  pub fn validate(&self) -> Result<()> {
    if self.label.trim().is_empty() {
      return Err(Error::invalid("measurement label must not be empty"));
    }
    let (needed, exact) = self.kind.point_requirement();
    let count = self.points.len();
    if count < needed || (exact && count != needed) {
      let qualifier = if exact { "exactly" } else { "at least" };
      return Err(Error::invalid(format!(
        "{} measurement needs {qualifier} {needed} points, got {count}",
        <&'static str>::from(self.kind),
      )));
    }
    if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
      return Err(Error::invalid("points must have finite coordinates"));
    }
    if self.kind == MeasurementKind::Angle
      && measure::angle(self.points[0], self.points[1], self.points[2]).is_none()
    {
      return Err(Error::invalid("angle arms must have non-zero length"));
    }
    Ok(())
  }

  pub fn value(&self) -> f64 { measure::measure(self.kind, &self.points) }
}

#[derive(Debug, Clone)]
pub struct NewComplianceRule {
  pub site_map_id: Uuid,
  pub name:        String,
  pub kind:        MeasurementKind,
  pub min_value:   Option<f64>,
  pub max_value:   Option<f64>,
  pub unit:        Unit,
  pub severity:    Severity,
}

impl NewComplianceRule {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("rule name must not be empty"));
    }
    match (self.min_value, self.max_value) {
      (None, None) => Err(Error::invalid("a rule needs a minimum or a maximum")),
      (Some(min), Some(max)) if min > max => {
        Err(Error::invalid("rule minimum exceeds its maximum"))
      }
      _ => Ok(()),
    }
  }
}

/// Compliance of one measurement against every applicable rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementCompliance {
  pub measurement_id: Uuid,
  pub label:          String,
  pub status:         ComplianceStatus,
  pub results:        Vec<ComplianceResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceReport {
  pub site_map_id:  Uuid,
  pub generated_at: DateTime<Utc>,
  /// Worst status across all measurements.
  pub status:       ComplianceStatus,
  pub measurements: Vec<MeasurementCompliance>,
}

impl ComplianceReport {
  pub fn build(
    site_map_id: Uuid,
    measurements: &[Measurement],
    rules: &[ComplianceRule],
    generated_at: DateTime<Utc>,
  ) -> Self {
    let measurements: Vec<MeasurementCompliance> = measurements
      .iter()
      .map(|m| {
        let results = measure::check_compliance(m.kind, m.value, m.unit, rules);
        MeasurementCompliance {
          measurement_id: m.measurement_id,
          label:          m.label.clone(),
          status:         worst(results.iter().map(|r| r.status)),
          results,
        }
      })
      .collect();

    Self {
      site_map_id,
      generated_at,
      status: worst(measurements.iter().map(|m| m.status)),
      measurements,
    }
  }
}

fn worst(statuses: impl Iterator<Item = ComplianceStatus>) -> ComplianceStatus {
  statuses.max().unwrap_or(ComplianceStatus::Compliant)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn measurement(kind: MeasurementKind, points: Vec<Point>) -> NewMeasurement {
    NewMeasurement {
      site_map_id: Uuid::nil(),
      label: "stage".into(),
      kind,
      points,
      unit: Unit::Meters,
    }
  }

  #[test]
  fn point_counts_are_enforced() {
    let two = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
    assert!(measurement(MeasurementKind::Distance, two.clone()).validate().is_ok());
    assert!(measurement(MeasurementKind::Area, two.clone()).validate().is_err());

    let mut four = two.clone();
    four.extend([Point::new(2.0, 0.0), Point::new(3.0, 3.0)]);
    assert!(measurement(MeasurementKind::Angle, four).validate().is_err());
  }

  #[test]
  fn degenerate_angle_is_rejected() {
    let points = vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)];
    assert!(measurement(MeasurementKind::Angle, points).validate().is_err());
  }

  #[test]
  fn report_takes_worst_status() {
    let now = Utc::now();
    let rule = ComplianceRule {
      rule_id:   Uuid::new_v4(),
      name:      "exit width".into(),
      kind:      MeasurementKind::Distance,
      min_value: Some(1.2),
      max_value: None,
      unit:      Unit::Meters,
      severity:  Severity::Critical,
    };
    let make = |value: f64| Measurement {
      measurement_id: Uuid::new_v4(),
      site_map_id: Uuid::nil(),
      label: "exit".into(),
      kind: MeasurementKind::Distance,
      points: vec![],
      unit: Unit::Meters,
      value,
      created_at: now,
    };

    let report = ComplianceReport::build(Uuid::nil(), &[make(2.0), make(0.9)], &[rule], now);
    assert_eq!(report.measurements[0].status, ComplianceStatus::Compliant);
    assert_eq!(report.measurements[1].status, ComplianceStatus::Violation);
    assert_eq!(report.status, ComplianceStatus::Violation);

    let empty = ComplianceReport::build(Uuid::nil(), &[], &[], now);
    assert_eq!(empty.status, ComplianceStatus::Compliant);
  }
}
