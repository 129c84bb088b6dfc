//! Artist bookings and their status machine.
//!
//! ```text
//! Pending ──accept──▶ Accepted ──cancel──▶ Cancelled
//!    │ └────decline──▶ Declined               ▲
//!    └───────────────cancel───────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Accepted,
  Declined,
  Cancelled,
}

impl BookingStatus {
  pub fn can_transition_to(self, next: Self) -> bool {
    use BookingStatus::*;
    matches!(
      (self, next),
      (Pending, Accepted) | (Pending, Declined) | (Pending, Cancelled) | (Accepted, Cancelled)
    )
  }

  /// Whether a booking in this status blocks a new request for the same
  /// event/artist pair.
  pub fn is_open(self) -> bool { matches!(self, Self::Pending | Self::Accepted) }

  pub fn transition(self, next: Self) -> Result<Self> {
    if self.can_transition_to(next) {
      Ok(next)
    } else {
      Err(Error::InvalidTransition { from: self, to: next })
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id:   Uuid,
  pub event_id:     Uuid,
  /// Owner of the event at the time of the request.
  pub organizer_id: Uuid,
  pub artist_id:    Uuid,
  /// Either `organizer_id` (an offer) or `artist_id` (an application).
  pub requested_by: Uuid,
  pub status:       BookingStatus,
  pub fee_cents:    Option<i64>,
  pub message:      Option<String>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

impl Booking {
  pub fn is_party(&self, account_id: Uuid) -> bool {
    account_id == self.organizer_id || account_id == self.artist_id
  }

  /// Only the side that did not make the request may accept or decline it.
  pub fn can_respond(&self, account_id: Uuid) -> bool {
    self.is_party(account_id) && account_id != self.requested_by
  }
}

/// Input to [`crate::store::BookingStore::request_booking`].
#[derive(Debug, Clone)]
pub struct NewBooking {
  pub event_id:     Uuid,
  pub organizer_id: Uuid,
  pub artist_id:    Uuid,
  pub requested_by: Uuid,
  pub fee_cents:    Option<i64>,
  pub message:      Option<String>,
}

impl NewBooking {
  pub fn validate(&self) -> Result<()> {
    if self.requested_by != self.organizer_id && self.requested_by != self.artist_id {
      return Err(Error::Forbidden(
        "bookings are requested by the organizer or the artist".into(),
      ));
    }
    if self.organizer_id == self.artist_id {
      return Err(Error::invalid("an account cannot book itself"));
    }
    if self.fee_cents.is_some_and(|fee| fee < 0) {
      return Err(Error::invalid("fee must not be negative"));
    }
    Ok(())
  }
}

/// Parameters for [`crate::store::BookingStore::list_bookings`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingQuery {
  pub event_id:   Option<Uuid>,
  /// Bookings where this account is organizer or artist.
  pub account_id: Option<Uuid>,
  pub status:     Option<BookingStatus>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use BookingStatus::*;

  #[test]
  fn legal_transitions() {
    assert!(Pending.can_transition_to(Accepted));
    assert!(Pending.can_transition_to(Declined));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Accepted.can_transition_to(Cancelled));
  }

  #[test]
  fn terminal_states_do_not_move() {
    for from in [Declined, Cancelled] {
      for to in [Pending, Accepted, Declined, Cancelled] {
        assert!(from.transition(to).is_err(), "{from} -> {to}");
      }
    }
    assert!(Accepted.transition(Declined).is_err());
    assert!(Accepted.transition(Pending).is_err());
  }

  #[test]
  fn requester_cannot_respond() {
    let organizer = Uuid::new_v4();
    let artist = Uuid::new_v4();
    let now = Utc::now();
    let booking = Booking {
      booking_id: Uuid::new_v4(),
      event_id: Uuid::new_v4(),
      organizer_id: organizer,
      artist_id: artist,
      requested_by: organizer,
      status: Pending,
      fee_cents: Some(50_000),
      message: None,
      created_at: now,
      updated_at: now,
    };
    assert!(!booking.can_respond(organizer));
    assert!(booking.can_respond(artist));
    assert!(!booking.can_respond(Uuid::new_v4()));
  }
}
