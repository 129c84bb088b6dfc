//! [`BookingStore`] for [`SqliteStore`].

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  booking::{Booking, BookingQuery, BookingStatus, NewBooking},
  store::BookingStore,
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    decode_dt, decode_enum, decode_uuid, encode_dt, encode_enum, encode_uuid,
    is_constraint_violation,
  },
};

const BOOKING_COLUMNS: &str = "booking_id, event_id, organizer_id, artist_id, requested_by, \
                               status, fee_cents, message, created_at, updated_at";

struct RawBooking {
  booking_id:   String,
  event_id:     String,
  organizer_id: String,
  artist_id:    String,
  requested_by: String,
  status:       String,
  fee_cents:    Option<i64>,
  message:      Option<String>,
  created_at:   String,
  updated_at:   String,
}

impl RawBooking {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      booking_id:   row.get(0)?,
      event_id:     row.get(1)?,
      organizer_id: row.get(2)?,
      artist_id:    row.get(3)?,
      requested_by: row.get(4)?,
      status:       row.get(5)?,
      fee_cents:    row.get(6)?,
      message:      row.get(7)?,
      created_at:   row.get(8)?,
      updated_at:   row.get(9)?,
    })
  }

  fn into_booking(self) -> Result<Booking> {
    Ok(Booking {
      booking_id:   decode_uuid(&self.booking_id)?,
      event_id:     decode_uuid(&self.event_id)?,
      organizer_id: decode_uuid(&self.organizer_id)?,
      artist_id:    decode_uuid(&self.artist_id)?,
      requested_by: decode_uuid(&self.requested_by)?,
      status:       decode_enum(&self.status, "booking status")?,
      fee_cents:    self.fee_cents,
      message:      self.message,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

fn load_booking(
  conn: &rusqlite::Connection,
  booking_id: &str,
) -> rusqlite::Result<Option<RawBooking>> {
  conn
    .query_row(
      &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_id = ?1"),
      rusqlite::params![booking_id],
      RawBooking::from_row,
    )
    .optional()
}

impl BookingStore for SqliteStore {
  async fn request_booking(&self, input: NewBooking) -> Result<Booking> {
    input.validate()?;

    let now = Utc::now();
    let booking = Booking {
      booking_id:   Uuid::new_v4(),
      event_id:     input.event_id,
      organizer_id: input.organizer_id,
      artist_id:    input.artist_id,
      requested_by: input.requested_by,
      status:       BookingStatus::Pending,
      fee_cents:    input.fee_cents,
      message:      input.message.filter(|m| !m.trim().is_empty()),
      created_at:   now,
      updated_at:   now,
    };

    let id_str        = encode_uuid(booking.booking_id);
    let event_str     = encode_uuid(booking.event_id);
    let organizer_str = encode_uuid(booking.organizer_id);
    let artist_str    = encode_uuid(booking.artist_id);
    let requester_str = encode_uuid(booking.requested_by);
    let status_str    = encode_enum(booking.status);
    let fee           = booking.fee_cents;
    let message       = booking.message.clone();
    let at_str        = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let open = tx
          .query_row(
            "SELECT 1 FROM bookings
             WHERE event_id = ?1 AND artist_id = ?2 AND status IN ('pending', 'accepted')",
            rusqlite::params![event_str, artist_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if open {
          return Ok(Err(CoreError::Conflict(
            "this artist already has an open booking for the event".into(),
          )));
        }

        let inserted = tx.execute(
          &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)"
          ),
          rusqlite::params![
            id_str,
            event_str,
            organizer_str,
            artist_str,
            requester_str,
            status_str,
            fee,
            message,
            at_str,
          ],
        );
        match inserted {
          Ok(_) => {
            tx.commit()?;
            Ok(Ok(()))
          }
          Err(e) if is_constraint_violation(&e) => Ok(Err(CoreError::Conflict(
            "booking references an unknown event or account".into(),
          ))),
          Err(e) => Err(e.into()),
        }
      })
      .await??;

    tracing::info!(booking_id = %booking.booking_id, event_id = %booking.event_id, "booking requested");
    Ok(booking)
  }

  async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
    let id_str = encode_uuid(booking_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_booking(conn, &id_str)?))
      .await?;
    raw.map(RawBooking::into_booking).transpose()
  }

  async fn list_bookings(&self, query: BookingQuery) -> Result<Vec<Booking>> {
    let event_str   = query.event_id.map(encode_uuid);
    let account_str = query.account_id.map(encode_uuid);
    let status_str  = query.status.map(encode_enum);

    let raws: Vec<RawBooking> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BOOKING_COLUMNS} FROM bookings
           WHERE (?1 IS NULL OR event_id = ?1)
             AND (?2 IS NULL OR organizer_id = ?2 OR artist_id = ?2)
             AND (?3 IS NULL OR status = ?3)
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![event_str, account_str, status_str],
            RawBooking::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBooking::into_booking).collect()
  }

  async fn set_booking_status(
    &self,
    booking_id: Uuid,
    status: BookingStatus,
  ) -> Result<Booking> {
    let id_str = encode_uuid(booking_id);
    let at_str = encode_dt(Utc::now());

    let raw: RawBooking = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(mut raw) = load_booking(&tx, &id_str)? else {
          return Ok(Err(CoreError::not_found("booking", booking_id)));
        };
        let current: BookingStatus = match raw.status.parse() {
          Ok(s) => s,
          Err(_) => {
            return Ok(Err(CoreError::invalid(format!(
              "stored booking status {:?} is unknown",
              raw.status
            ))));
          }
        };
        if let Err(e) = current.transition(status) {
          return Ok(Err(e));
        }

        let status_str = encode_enum(status);
        tx.execute(
          "UPDATE bookings SET status = ?2, updated_at = ?3 WHERE booking_id = ?1",
          rusqlite::params![id_str, status_str, at_str],
        )?;
        tx.commit()?;

        raw.status = status_str;
        raw.updated_at = at_str;
        Ok(Ok(raw))
      })
      .await??;

    tracing::info!(%booking_id, %status, "booking status changed");
    raw.into_booking()
  }
}
