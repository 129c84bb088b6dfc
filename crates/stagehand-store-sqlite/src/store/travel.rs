//! [`TravelStore`] for [`SqliteStore`]: groups, membership, itinerary legs.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  store::TravelStore,
  travel::{NewTravelGroup, NewTravelLeg, TravelGroup, TravelLeg},
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    decode_dt, decode_enum, decode_opt_dt, decode_u32, decode_uuid, encode_dt, encode_enum,
    encode_uuid, is_constraint_violation,
  },
};

// ─── Rows ────────────────────────────────────────────────────────────────────

const GROUP_COLUMNS: &str = "g.group_id, g.event_id, g.name, g.created_by, g.created_at";

struct RawGroup {
  group_id:   String,
  event_id:   String,
  name:       String,
  created_by: String,
  created_at: String,
}

impl RawGroup {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:   row.get(0)?,
      event_id:   row.get(1)?,
      name:       row.get(2)?,
      created_by: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  fn into_group(self) -> Result<TravelGroup> {
    Ok(TravelGroup {
      group_id:   decode_uuid(&self.group_id)?,
      event_id:   decode_uuid(&self.event_id)?,
      name:       self.name,
      created_by: decode_uuid(&self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

const LEG_COLUMNS: &str = "l.leg_id, l.group_id, l.kind, l.description, l.departs_at, l.arrives_at";

struct RawLeg {
  leg_id:      String,
  group_id:    String,
  kind:        String,
  description: String,
  departs_at:  String,
  arrives_at:  Option<String>,
}

impl RawLeg {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      leg_id:      row.get(0)?,
      group_id:    row.get(1)?,
      kind:        row.get(2)?,
      description: row.get(3)?,
      departs_at:  row.get(4)?,
      arrives_at:  row.get(5)?,
    })
  }

  fn into_leg(self) -> Result<TravelLeg> {
    Ok(TravelLeg {
      leg_id:      decode_uuid(&self.leg_id)?,
      group_id:    decode_uuid(&self.group_id)?,
      kind:        decode_enum(&self.kind, "leg kind")?,
      description: self.description,
      departs_at:  decode_dt(&self.departs_at)?,
      arrives_at:  decode_opt_dt(self.arrives_at)?,
    })
  }
}

fn group_exists(conn: &rusqlite::Connection, group_id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM travel_groups WHERE group_id = ?1",
        rusqlite::params![group_id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

// ─── TravelStore impl ────────────────────────────────────────────────────────

impl TravelStore for SqliteStore {
  async fn create_travel_group(&self, input: NewTravelGroup) -> Result<TravelGroup> {
    input.validate()?;

    let group = TravelGroup {
      group_id:   Uuid::new_v4(),
      event_id:   input.event_id,
      name:       input.name.trim().to_owned(),
      created_by: input.created_by,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(group.group_id);
    let event_str   = encode_uuid(group.event_id);
    let name        = group.name.clone();
    let creator_str = encode_uuid(group.created_by);
    let at_str      = encode_dt(group.created_at);
    let event_id    = group.event_id;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let inserted = tx.execute(
          "INSERT INTO travel_groups (group_id, event_id, name, created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, event_str, name, creator_str, at_str],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_constraint_violation(&e) => {
            return Ok(Err(CoreError::not_found("event", event_id)));
          }
          Err(e) => return Err(e.into()),
        }
        tx.execute(
          "INSERT INTO travel_members (group_id, account_id, joined_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, creator_str, at_str],
        )?;

        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    tracing::info!(group_id = %group.group_id, event_id = %group.event_id, "created travel group");
    Ok(group)
  }

  async fn get_travel_group(&self, group_id: Uuid) -> Result<Option<TravelGroup>> {
    let id_str = encode_uuid(group_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {GROUP_COLUMNS} FROM travel_groups g WHERE g.group_id = ?1"),
              rusqlite::params![id_str],
              RawGroup::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawGroup::into_group).transpose()
  }

  async fn join_travel_group(&self, group_id: Uuid, account_id: Uuid) -> Result<bool> {
    let group_str   = encode_uuid(group_id);
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    let joined = self
      .conn
      .call(move |conn| {
        if !group_exists(conn, &group_str)? {
          return Ok(Err(CoreError::not_found("travel group", group_id)));
        }
        let inserted = conn.execute(
          "INSERT OR IGNORE INTO travel_members (group_id, account_id, joined_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![group_str, account_str, at_str],
        )?;
        Ok(Ok(inserted > 0))
      })
      .await??;

    if joined {
      tracing::debug!(%group_id, %account_id, "joined travel group");
    }
    Ok(joined)
  }

  async fn leave_travel_group(&self, group_id: Uuid, account_id: Uuid) -> Result<bool> {
    let group_str   = encode_uuid(group_id);
    let account_str = encode_uuid(account_id);

    let left = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM travel_members WHERE group_id = ?1 AND account_id = ?2",
          rusqlite::params![group_str, account_str],
        )?)
      })
      .await?;
    Ok(left > 0)
  }

  async fn is_travel_member(&self, group_id: Uuid, account_id: Uuid) -> Result<bool> {
    let group_str   = encode_uuid(group_id);
    let account_str = encode_uuid(account_id);

    let member = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM travel_members WHERE group_id = ?1 AND account_id = ?2",
              rusqlite::params![group_str, account_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(member)
  }

  async fn add_travel_leg(&self, input: NewTravelLeg) -> Result<TravelLeg> {
    input.validate()?;

    let leg = TravelLeg {
      leg_id:      Uuid::new_v4(),
      group_id:    input.group_id,
      kind:        input.kind,
      description: input.description.trim().to_owned(),
      departs_at:  input.departs_at,
      arrives_at:  input.arrives_at,
    };

    let id_str      = encode_uuid(leg.leg_id);
    let group_str   = encode_uuid(leg.group_id);
    let kind_str    = encode_enum(leg.kind);
    let description = leg.description.clone();
    let departs_str = encode_dt(leg.departs_at);
    let arrives_str = leg.arrives_at.map(encode_dt);
    let group_id    = leg.group_id;

    self
      .conn
      .call(move |conn| {
        if !group_exists(conn, &group_str)? {
          return Ok(Err(CoreError::not_found("travel group", group_id)));
        }
        conn.execute(
          "INSERT INTO travel_legs (leg_id, group_id, kind, description, departs_at, arrives_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, group_str, kind_str, description, departs_str, arrives_str],
        )?;
        Ok(Ok(()))
      })
      .await??;

    Ok(leg)
  }

  async fn list_travel_legs(&self, group_id: Uuid) -> Result<Vec<TravelLeg>> {
    let group_str = encode_uuid(group_id);
    let raws: Vec<RawLeg> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LEG_COLUMNS} FROM travel_legs l
           WHERE l.group_id = ?1 ORDER BY l.departs_at, l.leg_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![group_str], RawLeg::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawLeg::into_leg).collect()
  }

  async fn travel_groups_for(&self, account_id: Uuid) -> Result<Vec<TravelGroup>> {
    let account_str = encode_uuid(account_id);
    let raws: Vec<RawGroup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GROUP_COLUMNS}
           FROM travel_groups g JOIN travel_members m ON m.group_id = g.group_id
           WHERE m.account_id = ?1
           ORDER BY g.created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![account_str], RawGroup::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawGroup::into_group).collect()
  }

  async fn upcoming_legs_for(
    &self,
    account_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<TravelLeg>> {
    let account_str = encode_uuid(account_id);
    let now_str     = encode_dt(now);
    let raws: Vec<RawLeg> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LEG_COLUMNS}
           FROM travel_legs l JOIN travel_members m ON m.group_id = l.group_id
           WHERE m.account_id = ?1 AND l.departs_at >= ?2
           ORDER BY l.departs_at, l.leg_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![account_str, now_str], RawLeg::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawLeg::into_leg).collect()
  }

  async fn member_counts_for(&self, account_id: Uuid) -> Result<Vec<(Uuid, u32)>> {
    let account_str = encode_uuid(account_id);
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT m.group_id, COUNT(*)
           FROM travel_members m
           WHERE m.group_id IN (SELECT group_id FROM travel_members WHERE account_id = ?1)
           GROUP BY m.group_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![account_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(group_id, count)| -> Result<(Uuid, u32)> {
        Ok((decode_uuid(&group_id)?, decode_u32(count, "member count")?))
      })
      .collect()
  }
}
