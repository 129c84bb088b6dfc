//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, nanosecond
//! precision) so that lexical order in SQL matches chronological order. Enums
//! are stored as their snake_case names, UUIDs as hyphenated lowercase strings,
//! structured fields as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

pub fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Store an enum by its static name (derived with `strum::IntoStaticStr`).
pub fn encode_enum<T: Into<&'static str>>(value: T) -> String { value.into().to_owned() }

/// Parse an enum stored with [`encode_enum`].
pub fn decode_enum<T: FromStr>(s: &str, what: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

// ─── Integers ────────────────────────────────────────────────────────────────

pub fn decode_u32(v: i64, what: &str) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Decode(format!("{what} out of range: {v}")))
}

// ─── Constraint failures ─────────────────────────────────────────────────────

/// Whether a statement failed on a UNIQUE, CHECK, or FOREIGN KEY constraint.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let later = base + Duration::nanoseconds(1_500);
    assert!(encode_dt(base) < encode_dt(later));
    assert_eq!(encode_dt(base).len(), encode_dt(later).len());
  }

  #[test]
  fn timestamps_roundtrip_exactly() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn unknown_enum_is_a_decode_error() {
    let result: Result<stagehand_core::account::AccountKind> =
      decode_enum("wizard", "account kind");
    assert!(matches!(result, Err(Error::Decode(_))));
  }
}
