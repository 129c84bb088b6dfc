//! Events and the queries over them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

pub const DEFAULT_EVENT_LIMIT: usize = 100;
pub const MAX_EVENT_LIMIT: usize = 500;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
  #[default]
  Draft,
  Published,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:     Uuid,
  /// The organizer or venue account that owns the event.
  pub organizer_id: Uuid,
  /// The hosting venue account, if it is on the platform.
  pub venue_id:     Option<Uuid>,
  pub title:        String,
  pub description:  String,
  pub starts_at:    DateTime<Utc>,
  pub ends_at:      DateTime<Utc>,
  pub capacity:     Option<u32>,
  pub status:       EventStatus,
  pub created_at:   DateTime<Utc>,
}

impl Event {
  pub fn validate(&self) -> Result<()> {
    check_fields(&self.title, self.starts_at, self.ends_at, self.capacity)
  }
}

fn check_fields(
  title: &str,
  starts_at: DateTime<Utc>,
  ends_at: DateTime<Utc>,
  capacity: Option<u32>,
) -> Result<()> {
  if title.trim().is_empty() {
    return Err(Error::invalid("title must not be empty"));
  }
  if ends_at <= starts_at {
    return Err(Error::invalid("event must end after it starts"));
  }
  if capacity == Some(0) {
    return Err(Error::invalid("capacity must be positive"));
  }
  Ok(())
}

/// Input to [`crate::store::EventStore::create_event`].
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub organizer_id: Uuid,
  pub venue_id:     Option<Uuid>,
  pub title:        String,
  pub description:  String,
  pub starts_at:    DateTime<Utc>,
  pub ends_at:      DateTime<Utc>,
  pub capacity:     Option<u32>,
  pub status:       EventStatus,
}

impl NewEvent {
  pub fn validate(&self) -> Result<()> {
    if self.status == EventStatus::Cancelled {
      return Err(Error::invalid("an event cannot be created cancelled"));
    }
    check_fields(&self.title, self.starts_at, self.ends_at, self.capacity)
  }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub venue_id:    Option<Uuid>,
  pub starts_at:   Option<DateTime<Utc>>,
  pub ends_at:     Option<DateTime<Utc>>,
  pub capacity:    Option<u32>,
  pub status:      Option<EventStatus>,
}

impl EventPatch {
  /// Apply the patch to `event`, returning the validated result.
  ///
  /// Cancellation is a separate operation and cannot be patched in; a
  /// cancelled event cannot be patched at all.
  pub fn apply(self, mut event: Event) -> Result<Event> {
    if event.status == EventStatus::Cancelled {
      return Err(Error::Conflict(format!("event {} is cancelled", event.event_id)));
    }
    if self.status == Some(EventStatus::Cancelled) {
      return Err(Error::invalid("use the cancel operation to cancel an event"));
    }
    if let Some(title) = self.title {
      event.title = title;
    }
    if let Some(description) = self.description {
      event.description = description;
    }
    if let Some(venue_id) = self.venue_id {
      event.venue_id = Some(venue_id);
    }
    if let Some(starts_at) = self.starts_at {
      event.starts_at = starts_at;
    }
    if let Some(ends_at) = self.ends_at {
      event.ends_at = ends_at;
    }
    if let Some(capacity) = self.capacity {
      event.capacity = Some(capacity);
    }
    if let Some(status) = self.status {
      event.status = status;
    }
    event.validate()?;
    Ok(event)
  }
}

/// Parameters for [`crate::store::EventStore::list_events`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
  pub status:        Option<EventStatus>,
  pub organizer_id:  Option<Uuid>,
  pub venue_id:      Option<Uuid>,
  /// Only events starting at or after this instant.
  pub starts_after:  Option<DateTime<Utc>>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
  /// When set, drafts are listed only if this account organizes them.
  #[serde(skip)]
  pub viewer_id:     Option<Uuid>,
}

impl EventQuery {
  pub fn effective_limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_EVENT_LIMIT).clamp(1, MAX_EVENT_LIMIT)
  }

  pub fn effective_offset(&self) -> i64 {
    i64::try_from(self.offset.unwrap_or(0)).unwrap_or(i64::MAX)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn event() -> Event {
    let starts_at = Utc::now();
    Event {
      event_id: Uuid::new_v4(),
      organizer_id: Uuid::new_v4(),
      venue_id: None,
      title: "Warehouse night".into(),
      description: String::new(),
      starts_at,
      ends_at: starts_at + Duration::hours(6),
      capacity: Some(300),
      status: EventStatus::Draft,
      created_at: starts_at,
    }
  }

  #[test]
  fn patch_updates_and_revalidates() {
    let original = event();
    let patch = EventPatch {
      title: Some("Rooftop night".into()),
      status: Some(EventStatus::Published),
      ..Default::default()
    };
    let updated = patch.apply(original.clone()).unwrap();
    assert_eq!(updated.title, "Rooftop night");
    assert_eq!(updated.status, EventStatus::Published);
    assert_eq!(updated.starts_at, original.starts_at);

    let backwards = EventPatch {
      ends_at: Some(original.starts_at - Duration::hours(1)),
      ..Default::default()
    };
    assert!(matches!(backwards.apply(original), Err(Error::Invalid(_))));
  }

  #[test]
  fn cancelled_events_are_frozen() {
    let mut cancelled = event();
    cancelled.status = EventStatus::Cancelled;
    let patch = EventPatch { title: Some("x".into()), ..Default::default() };
    assert!(matches!(patch.apply(cancelled), Err(Error::Conflict(_))));

    let cancel = EventPatch { status: Some(EventStatus::Cancelled), ..Default::default() };
    assert!(cancel.apply(event()).is_err());
  }

  #[test]
  fn query_paging_is_clamped() {
    let query = EventQuery::default();
    assert_eq!(query.effective_limit(), DEFAULT_EVENT_LIMIT);
    assert_eq!(query.effective_offset(), 0);

    let huge = EventQuery { limit: Some(usize::MAX), offset: Some(usize::MAX), ..Default::default() };
    assert_eq!(huge.effective_limit(), MAX_EVENT_LIMIT);
    assert_eq!(huge.effective_offset(), i64::MAX);

    let zero = EventQuery { limit: Some(0), ..Default::default() };
    assert_eq!(zero.effective_limit(), 1);
  }

  #[test]
  fn viewer_is_not_read_from_the_query_string() {
    let viewer = Uuid::new_v4();
    let query: EventQuery =
      serde_json::from_value(serde_json::json!({ "viewer_id": viewer, "limit": 5 })).unwrap();
    assert_eq!(query.viewer_id, None);
    assert_eq!(query.limit, Some(5));
  }
}
