//! Profiles: the authenticated human behind one or more accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, account::Account};

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A login identity. Everything public-facing happens through an [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub profile_id:        Uuid,
  pub email:             String,
  pub display_name:      String,
  /// The account the profile currently acts as.
  pub active_account_id: Option<Uuid>,
  pub created_at:        DateTime<Utc>,
}

/// Input to [`crate::store::ProfileStore::register`].
///
/// The password is hashed by the caller; no plaintext reaches the store.
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub email:         String,
  pub display_name:  String,
  pub password_hash: String,
}

impl NewProfile {
  pub fn validate(&self) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::invalid("display name must not be empty"));
    }
    normalize_email(&self.email)?;
    Ok(())
  }
}

/// Trim and lowercase an email address, rejecting anything without a local
/// part and a domain.
pub fn normalize_email(raw: &str) -> Result<String> {
  let email = raw.trim().to_lowercase();
  match email.split_once('@') {
    Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
    _ => Err(Error::invalid(format!("not an email address: {raw:?}"))),
  }
}

pub fn check_password(password: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::invalid(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }
  Ok(())
}

/// A server-side session. Only the digest of the bearer token is stored.
#[derive(Debug, Clone)]
pub struct Session {
  pub token_hash: String,
  pub profile_id: Uuid,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

/// The authenticated caller's own view: the profile plus every account it
/// can switch to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileView {
  pub profile:  Profile,
  pub accounts: Vec<Account>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_is_normalized() {
    assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
  }

  #[test]
  fn malformed_emails_are_rejected() {
    for bad in ["", "ada", "@example.com", "ada@localhost"] {
      assert!(normalize_email(bad).is_err(), "{bad:?} accepted");
    }
  }

  #[test]
  fn short_passwords_are_rejected() {
    assert!(check_password("hunter2").is_err());
    assert!(check_password("correct horse").is_ok());
  }
}
