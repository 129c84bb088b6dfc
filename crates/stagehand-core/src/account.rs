//! Accounts: the personas a profile can act as, and what each may do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// The persona an account represents.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountKind {
  Personal,
  Artist,
  Venue,
  Organizer,
  Admin,
}

/// A capability granted by an account kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
  Post,
  Message,
  ManageBookings,
  ManageEvents,
  ManageSiteMaps,
  Administer,
}

impl AccountKind {
  pub fn permissions(self) -> &'static [Permission] {
    use Permission::*;
    match self {
      Self::Personal => &[Post, Message],
      Self::Artist => &[Post, Message, ManageBookings],
      Self::Venue | Self::Organizer => {
        &[Post, Message, ManageBookings, ManageEvents, ManageSiteMaps]
      }
      Self::Admin => {
        &[Post, Message, ManageBookings, ManageEvents, ManageSiteMaps, Administer]
      }
    }
  }

  pub fn allows(self, permission: Permission) -> bool {
    self.permissions().contains(&permission)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:   Uuid,
  /// The profile that owns (and may switch to) this account.
  pub owner_id:     Uuid,
  pub kind:         AccountKind,
  /// Unique, URL-safe public handle.
  pub handle:       String,
  pub display_name: String,
  pub bio:          Option<String>,
  pub created_at:   DateTime<Utc>,
}

impl Account {
  pub fn allows(&self, permission: Permission) -> bool { self.kind.allows(permission) }
}

/// Input to [`crate::store::AccountStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub owner_id:     Uuid,
  pub kind:         AccountKind,
  pub handle:       String,
  pub display_name: String,
  pub bio:          Option<String>,
}

impl NewAccount {
  pub fn validate(&self) -> Result<()> {
    validate_handle(&self.handle)?;
    if self.display_name.trim().is_empty() {
      return Err(Error::invalid("display name must not be empty"));
    }
    Ok(())
  }
}

/// Handles are 3–32 characters of `[a-z0-9_]`.
pub fn validate_handle(handle: &str) -> Result<()> {
  let len_ok = (3..=32).contains(&handle.len());
  let chars_ok = handle
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
  if len_ok && chars_ok {
    Ok(())
  } else {
    Err(Error::invalid(format!(
      "handle {handle:?} must be 3-32 characters of a-z, 0-9 or _"
    )))
  }
}

/// Derive a handle candidate from free text, e.g. an email local part.
pub fn handle_from(text: &str) -> String {
  let mut handle: String = text
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
    .take(24)
    .collect();
  while handle.len() < 3 {
    handle.push('_');
  }
  handle
}

/// Partial update for an account's public fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
  pub display_name: Option<String>,
  pub bio:          Option<String>,
}

impl AccountPatch {
  pub fn validate(&self) -> Result<()> {
    if self.display_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
      return Err(Error::invalid("display name must not be empty"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn permissions_widen_with_kind() {
    assert!(!AccountKind::Personal.allows(Permission::ManageEvents));
    assert!(AccountKind::Artist.allows(Permission::ManageBookings));
    assert!(!AccountKind::Artist.allows(Permission::ManageSiteMaps));
    assert!(AccountKind::Venue.allows(Permission::ManageSiteMaps));
    assert!(AccountKind::Admin.allows(Permission::Administer));
    assert!(!AccountKind::Organizer.allows(Permission::Administer));
  }

  #[test]
  fn handle_rules() {
    assert!(validate_handle("the_band_99").is_ok());
    assert!(validate_handle("ab").is_err());
    assert!(validate_handle("Has-Caps").is_err());
    assert!(validate_handle(&"x".repeat(33)).is_err());
  }

  #[test]
  fn derived_handles_are_valid() {
    for seed in ["Ada.Lovelace", "x", "très-bien"] {
      assert!(validate_handle(&handle_from(seed)).is_ok(), "{seed}");
    }
  }
}
