//! [`EventStore`] for [`SqliteStore`]: events, ticket tiers, and orders.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  event::{Event, EventPatch, EventQuery, EventStatus, NewEvent},
  store::EventStore,
  ticket::{NewTicketTier, TicketOrder, TicketTier, check_order_quantity},
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    decode_dt, decode_enum, decode_opt_uuid, decode_u32, decode_uuid, encode_dt, encode_enum,
    encode_uuid,
  },
};

// ─── Rows ────────────────────────────────────────────────────────────────────

const EVENT_COLUMNS: &str = "event_id, organizer_id, venue_id, title, description, \
                             starts_at, ends_at, capacity, status, created_at";

struct RawEvent {
  event_id:     String,
  organizer_id: String,
  venue_id:     Option<String>,
  title:        String,
  description:  String,
  starts_at:    String,
  ends_at:      String,
  capacity:     Option<i64>,
  status:       String,
  created_at:   String,
}

impl RawEvent {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      organizer_id: row.get(1)?,
      venue_id:     row.get(2)?,
      title:        row.get(3)?,
      description:  row.get(4)?,
      starts_at:    row.get(5)?,
      ends_at:      row.get(6)?,
      capacity:     row.get(7)?,
      status:       row.get(8)?,
      created_at:   row.get(9)?,
    })
  }

  fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:     decode_uuid(&self.event_id)?,
      organizer_id: decode_uuid(&self.organizer_id)?,
      venue_id:     decode_opt_uuid(self.venue_id)?,
      title:        self.title,
      description:  self.description,
      starts_at:    decode_dt(&self.starts_at)?,
      ends_at:      decode_dt(&self.ends_at)?,
      capacity:     self.capacity.map(|c| decode_u32(c, "capacity")).transpose()?,
      status:       decode_enum(&self.status, "event status")?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

const TIER_COLUMNS: &str = "tier_id, event_id, name, price_cents, quantity, sold, created_at";

struct RawTier {
  tier_id:     String,
  event_id:    String,
  name:        String,
  price_cents: i64,
  quantity:    i64,
  sold:        i64,
  created_at:  String,
}

impl RawTier {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tier_id:     row.get(0)?,
      event_id:    row.get(1)?,
      name:        row.get(2)?,
      price_cents: row.get(3)?,
      quantity:    row.get(4)?,
      sold:        row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  fn into_tier(self) -> Result<TicketTier> {
    Ok(TicketTier {
      tier_id:     decode_uuid(&self.tier_id)?,
      event_id:    decode_uuid(&self.event_id)?,
      name:        self.name,
      price_cents: self.price_cents,
      quantity:    decode_u32(self.quantity, "tier quantity")?,
      sold:        decode_u32(self.sold, "tickets sold")?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

const ORDER_COLUMNS: &str =
  "order_id, tier_id, event_id, buyer_id, quantity, total_cents, created_at";

struct RawOrder {
  order_id:    String,
  tier_id:     String,
  event_id:    String,
  buyer_id:    String,
  quantity:    i64,
  total_cents: i64,
  created_at:  String,
}

impl RawOrder {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      order_id:    row.get(0)?,
      tier_id:     row.get(1)?,
      event_id:    row.get(2)?,
      buyer_id:    row.get(3)?,
      quantity:    row.get(4)?,
      total_cents: row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  fn into_order(self) -> Result<TicketOrder> {
    Ok(TicketOrder {
      order_id:    decode_uuid(&self.order_id)?,
      tier_id:     decode_uuid(&self.tier_id)?,
      event_id:    decode_uuid(&self.event_id)?,
      buyer_id:    decode_uuid(&self.buyer_id)?,
      quantity:    decode_u32(self.quantity, "order quantity")?,
      total_cents: self.total_cents,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

fn load_event(conn: &rusqlite::Connection, event_id: &str) -> rusqlite::Result<Option<RawEvent>> {
  conn
    .query_row(
      &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
      rusqlite::params![event_id],
      RawEvent::from_row,
    )
    .optional()
}

fn load_tier(conn: &rusqlite::Connection, tier_id: &str) -> rusqlite::Result<Option<RawTier>> {
  conn
    .query_row(
      &format!("SELECT {TIER_COLUMNS} FROM ticket_tiers WHERE tier_id = ?1"),
      rusqlite::params![tier_id],
      RawTier::from_row,
    )
    .optional()
}

fn allocated_to_tiers(conn: &rusqlite::Connection, event_id: &str) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COALESCE(SUM(quantity), 0) FROM ticket_tiers WHERE event_id = ?1",
    rusqlite::params![event_id],
    |row| row.get(0),
  )
}

/// Overwrite every mutable column of an event row.
fn write_event(conn: &rusqlite::Connection, event: &Event) -> rusqlite::Result<()> {
  conn.execute(
    "UPDATE events SET
       venue_id = ?2, title = ?3, description = ?4,
       starts_at = ?5, ends_at = ?6, capacity = ?7, status = ?8
     WHERE event_id = ?1",
    rusqlite::params![
      encode_uuid(event.event_id),
      event.venue_id.map(encode_uuid),
      event.title,
      event.description,
      encode_dt(event.starts_at),
      encode_dt(event.ends_at),
      event.capacity.map(i64::from),
      encode_enum(event.status),
    ],
  )?;
  Ok(())
}

/// Load an event inside `tx`, let `change` rewrite it, and store the result.
/// The caller commits.
fn modify_event(
  tx: &rusqlite::Transaction<'_>,
  event_id: Uuid,
  change: impl FnOnce(Event) -> Result<Event>,
) -> tokio_rusqlite::Result<Result<Event>> {
  let Some(raw) = load_event(tx, &encode_uuid(event_id))? else {
    return Ok(Err(CoreError::not_found("event", event_id).into()));
  };
  let updated = match raw.into_event().and_then(change) {
    Ok(event) => event,
    Err(e) => return Ok(Err(e)),
  };
  write_event(tx, &updated)?;
  Ok(Ok(updated))
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  async fn create_event(&self, input: NewEvent) -> Result<Event> {
    input.validate()?;

    let event = Event {
      event_id:     Uuid::new_v4(),
      organizer_id: input.organizer_id,
      venue_id:     input.venue_id,
      title:        input.title.trim().to_owned(),
      description:  input.description,
      starts_at:    input.starts_at,
      ends_at:      input.ends_at,
      capacity:     input.capacity,
      status:       input.status,
      created_at:   Utc::now(),
    };

    let id_str        = encode_uuid(event.event_id);
    let organizer_str = encode_uuid(event.organizer_id);
    let venue_str     = event.venue_id.map(encode_uuid);
    let title         = event.title.clone();
    let description   = event.description.clone();
    let starts_str    = encode_dt(event.starts_at);
    let ends_str      = encode_dt(event.ends_at);
    let capacity      = event.capacity.map(i64::from);
    let status_str    = encode_enum(event.status);
    let at_str        = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
          rusqlite::params![
            id_str,
            organizer_str,
            venue_str,
            title,
            description,
            starts_str,
            ends_str,
            capacity,
            status_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(event_id = %event.event_id, "created event");
    Ok(event)
  }

  async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
    let id_str = encode_uuid(event_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_event(conn, &id_str)?))
      .await?;
    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self, query: EventQuery) -> Result<Vec<Event>> {
    let status_str    = query.status.map(encode_enum);
    let organizer_str = query.organizer_id.map(encode_uuid);
    let venue_str     = query.venue_id.map(encode_uuid);
    let after_str     = query.starts_after.map(encode_dt);
    let viewer_str    = query.viewer_id.map(encode_uuid);
    let limit_val     = i64::try_from(query.effective_limit()).unwrap_or(i64::MAX);
    let offset_val    = query.effective_offset();

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        // Unset filters bind NULL and short-circuit to true.
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 IS NULL OR organizer_id = ?2)
             AND (?3 IS NULL OR venue_id = ?3)
             AND (?4 IS NULL OR starts_at >= ?4)
             AND (?7 IS NULL OR status != 'draft' OR organizer_id = ?7)
           ORDER BY starts_at, event_id
           LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              status_str,
              organizer_str,
              venue_str,
              after_str,
              limit_val,
              offset_val,
              viewer_str,
            ],
            RawEvent::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn update_event(&self, event_id: Uuid, patch: EventPatch) -> Result<Event> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let allocated = allocated_to_tiers(&tx, &encode_uuid(event_id))?;
        let updated = modify_event(&tx, event_id, |current| {
          let updated = patch.apply(current)?;
          if let Some(capacity) = updated.capacity
            && i64::from(capacity) < allocated
          {
            return Err(
              CoreError::Conflict(format!(
                "capacity {capacity} is below the {allocated} tickets already allocated to tiers"
              ))
              .into(),
            );
          }
          Ok(updated)
        })?;
        if updated.is_ok() {
          tx.commit()?;
        }
        Ok(updated)
      })
      .await?
  }

  async fn cancel_event(&self, event_id: Uuid) -> Result<Event> {
    let event = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let cancelled = modify_event(&tx, event_id, |mut event| {
          if event.status == EventStatus::Cancelled {
            return Err(CoreError::Conflict(format!("event {event_id} is already cancelled")).into());
          }
          event.status = EventStatus::Cancelled;
          Ok(event)
        })?;
        if cancelled.is_ok() {
          tx.commit()?;
        }
        Ok(cancelled)
      })
      .await??;
    tracing::info!(%event_id, "cancelled event");
    Ok(event)
  }

  async fn add_ticket_tier(&self, input: NewTicketTier) -> Result<TicketTier> {
    input.validate()?;

    let tier = TicketTier {
      tier_id:     Uuid::new_v4(),
      event_id:    input.event_id,
      name:        input.name.trim().to_owned(),
      price_cents: input.price_cents,
      quantity:    input.quantity,
      sold:        0,
      created_at:  Utc::now(),
    };

    let tier_str  = encode_uuid(tier.tier_id);
    let event_id  = tier.event_id;
    let event_str = encode_uuid(event_id);
    let name      = tier.name.clone();
    let price     = tier.price_cents;
    let quantity  = i64::from(tier.quantity);
    let at_str    = encode_dt(tier.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(event) = load_event(&tx, &event_str)? else {
          return Ok(Err(CoreError::not_found("event", event_id)));
        };
        if let Some(capacity) = event.capacity {
          let allocated = allocated_to_tiers(&tx, &event_str)?;
          if allocated + quantity > capacity {
            return Ok(Err(CoreError::Conflict(format!(
              "tiers would exceed event capacity ({allocated} of {capacity} allocated)"
            ))));
          }
        }

        tx.execute(
          &format!("INSERT INTO ticket_tiers ({TIER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)"),
          rusqlite::params![tier_str, event_str, name, price, quantity, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(tier)
  }

  async fn get_ticket_tier(&self, tier_id: Uuid) -> Result<Option<TicketTier>> {
    let id_str = encode_uuid(tier_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_tier(conn, &id_str)?))
      .await?;
    raw.map(RawTier::into_tier).transpose()
  }

  async fn list_ticket_tiers(&self, event_id: Uuid) -> Result<Vec<TicketTier>> {
    let event_str = encode_uuid(event_id);
    let raws: Vec<RawTier> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TIER_COLUMNS} FROM ticket_tiers
           WHERE event_id = ?1 ORDER BY price_cents, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], RawTier::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawTier::into_tier).collect()
  }

  async fn purchase_tickets(
    &self,
    tier_id: Uuid,
    buyer_id: Uuid,
    quantity: u32,
  ) -> Result<TicketOrder> {
    check_order_quantity(quantity)?;

    let order_id  = Uuid::new_v4();
    let now       = Utc::now();
    let order_str = encode_uuid(order_id);
    let tier_str  = encode_uuid(tier_id);
    let buyer_str = encode_uuid(buyer_id);
    let at_str    = encode_dt(now);
    let wanted    = i64::from(quantity);

    // Read, check, and increment inside one transaction so two buyers cannot
    // both take the last tickets.
    let raw: RawOrder = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(tier) = load_tier(&tx, &tier_str)? else {
          return Ok(Err(CoreError::not_found("ticket tier", tier_id)));
        };
        let status: String = tx.query_row(
          "SELECT status FROM events WHERE event_id = ?1",
          rusqlite::params![tier.event_id],
          |row| row.get(0),
        )?;
        if status != <&str>::from(EventStatus::Published) {
          return Ok(Err(CoreError::Conflict(format!(
            "tickets are not on sale for a {status} event"
          ))));
        }
        let remaining = tier.quantity - tier.sold;
        if wanted > remaining {
          return Ok(Err(CoreError::Conflict(format!(
            "sold out: {remaining} tickets left in {:?}",
            tier.name
          ))));
        }

        let Some(total) = tier.price_cents.checked_mul(wanted) else {
          return Ok(Err(CoreError::invalid("order total overflows")));
        };

        tx.execute(
          "UPDATE ticket_tiers SET sold = sold + ?2 WHERE tier_id = ?1",
          rusqlite::params![tier_str, wanted],
        )?;
        tx.execute(
          &format!("INSERT INTO ticket_orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![order_str, tier_str, tier.event_id, buyer_str, wanted, total, at_str],
        )?;
        tx.commit()?;

        Ok(Ok(RawOrder {
          order_id:    order_str,
          tier_id:     tier_str,
          event_id:    tier.event_id,
          buyer_id:    buyer_str,
          quantity:    wanted,
          total_cents: total,
          created_at:  at_str,
        }))
      })
      .await??;

    tracing::info!(%tier_id, %buyer_id, quantity, "tickets purchased");
    raw.into_order()
  }

  async fn list_orders(&self, buyer_id: Uuid) -> Result<Vec<TicketOrder>> {
    let buyer_str = encode_uuid(buyer_id);
    let raws: Vec<RawOrder> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ORDER_COLUMNS} FROM ticket_orders
           WHERE buyer_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![buyer_str], RawOrder::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawOrder::into_order).collect()
  }
}
