//! The social feed and cross-platform post scheduling.
//!
//! A scheduled post is only a row with a timestamp. A periodic publisher
//! (see [`crate::store::FeedStore::publish_due`]) turns due rows into feed
//! posts; nothing is delivered to third-party networks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

pub const MAX_POST_CHARS: usize = 5000;

/// Default and maximum page size for feed listings.
pub const DEFAULT_FEED_LIMIT: usize = 20;
pub const MAX_FEED_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
  pub post_id:    Uuid,
  pub author_id:  Uuid,
  pub event_id:   Option<Uuid>,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
  pub author_id: Uuid,
  pub event_id:  Option<Uuid>,
  pub body:      String,
}

impl NewPost {
  pub fn validate(&self) -> Result<()> { check_body(&self.body) }
}

fn check_body(body: &str) -> Result<()> {
  if body.trim().is_empty() {
    return Err(Error::invalid("post body must not be empty"));
  }
  if body.chars().count() > MAX_POST_CHARS {
    return Err(Error::invalid(format!(
      "post body exceeds {MAX_POST_CHARS} characters"
    )));
  }
  Ok(())
}

/// Parameters for [`crate::store::FeedStore::list_posts`]. Results are newest
/// first; `before` is an exclusive cursor on `created_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
  pub author_id: Option<Uuid>,
  pub event_id:  Option<Uuid>,
  pub before:    Option<DateTime<Utc>>,
  pub limit:     Option<usize>,
}

impl FeedQuery {
  pub fn effective_limit(&self) -> usize {
    self.limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
  }
}

// ─── Scheduling ──────────────────────────────────────────────────────────────

/// An outlet a scheduled post is intended for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
  Stagehand,
  Instagram,
  Facebook,
  X,
  TikTok,
  Threads,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScheduleStatus {
  Scheduled,
  Published,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
  pub scheduled_post_id: Uuid,
  pub account_id:        Uuid,
  pub body:              String,
  pub platforms:         Vec<Platform>,
  pub scheduled_for:     DateTime<Utc>,
  pub status:            ScheduleStatus,
  /// The feed post created on publication.
  pub post_id:           Option<Uuid>,
  pub created_at:        DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScheduledPost {
  pub account_id:    Uuid,
  pub body:          String,
  pub platforms:     Vec<Platform>,
  pub scheduled_for: DateTime<Utc>,
}

impl NewScheduledPost {
  /// Validate against the current time and deduplicate `platforms` in place,
  /// keeping first occurrences.
  pub fn normalize(&mut self, now: DateTime<Utc>) -> Result<()> {
    check_body(&self.body)?;
    if self.scheduled_for <= now {
      return Err(Error::invalid("scheduled time must be in the future"));
    }
    let mut seen = Vec::with_capacity(self.platforms.len());
    self.platforms.retain(|p| {
      if seen.contains(p) {
        false
      } else {
        seen.push(*p);
        true
      }
    });
    if self.platforms.is_empty() {
      return Err(Error::invalid("at least one platform is required"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  #[test]
  fn feed_limit_is_clamped() {
    assert_eq!(FeedQuery::default().effective_limit(), DEFAULT_FEED_LIMIT);
    let huge = FeedQuery { limit: Some(10_000), ..Default::default() };
    assert_eq!(huge.effective_limit(), MAX_FEED_LIMIT);
    let zero = FeedQuery { limit: Some(0), ..Default::default() };
    assert_eq!(zero.effective_limit(), 1);
  }

  #[test]
  fn body_bounds() {
    let post = |body: String| NewPost { author_id: Uuid::nil(), event_id: None, body };
    assert!(post("   ".into()).validate().is_err());
    assert!(post("x".repeat(MAX_POST_CHARS)).validate().is_ok());
    assert!(post("x".repeat(MAX_POST_CHARS + 1)).validate().is_err());
  }

  #[test]
  fn scheduling_dedupes_platforms_and_requires_future() {
    let now = Utc::now();
    let mut input = NewScheduledPost {
      account_id:    Uuid::nil(),
      body:          "Doors at 8".into(),
      platforms:     vec![Platform::Instagram, Platform::X, Platform::Instagram],
      scheduled_for: now + Duration::hours(1),
    };
    input.normalize(now).unwrap();
    assert_eq!(input.platforms, vec![Platform::Instagram, Platform::X]);

    input.scheduled_for = now - Duration::minutes(1);
    assert!(input.normalize(now).is_err());
  }
}
