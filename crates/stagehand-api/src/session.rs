//! Password hashing, session tokens, and the [`Session`] extractor.
//!
//! A token is 32 random bytes, URL-safe base64 encoded, handed to the client
//! once. Only its hex SHA-256 digest is stored. Requests present the token as
//! `Authorization: Bearer <token>` or, failing that, in the session cookie.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use stagehand_core::{
  account::{Account, Permission},
  profile::Profile,
  store::PlatformStore,
};

use crate::{AppState, error::ApiError};

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::store(PasswordError(e.to_string())))
}

/// Check a password against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
struct PasswordError(String);

impl stagehand_core::Classify for PasswordError {
  fn kind(&self) -> stagehand_core::ErrorKind { stagehand_core::ErrorKind::Internal }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh bearer token.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// The digest under which a token is stored.
pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Pull the raw token from a bearer header or the named cookie.
pub fn token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
  let bearer = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty());
  if let Some(token) = bearer {
    return Some(token.to_owned());
  }

  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, value)| *name == cookie_name && !value.is_empty())
    .map(|(_, value)| value.to_owned())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller: their profile and the account they act as.
#[derive(Debug, Clone)]
pub struct Session {
  pub profile:    Profile,
  pub account:    Account,
  pub token_hash: String,
}

impl Session {
  /// Fail with 403 unless the active account grants `permission`.
  pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
    if self.account.allows(permission) {
      Ok(())
    } else {
      Err(ApiError::forbidden(format!(
        "a {} account cannot do this ({permission:?})",
        <&'static str>::from(self.account.kind)
      )))
    }
  }
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: PlatformStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = token_from_headers(&parts.headers, &state.config.cookie_name)
      .ok_or(ApiError::Unauthorized)?;
    let token_hash = hash_token(&token);

    let profile = state
      .store
      .session_profile(token_hash.clone(), Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    let account_id = profile.active_account_id.ok_or(ApiError::Unauthorized)?;
    let account = state
      .store
      .get_account(account_id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(Session { profile, account, token_hash })
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn password_round_trip() {
    let hash = hash_password("correct horse").unwrap();
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("wrong horse", &hash));
    assert!(!verify_password("correct horse", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_and_hashed() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert_eq!(hash_token(&a).len(), 64);
    assert_eq!(hash_token(&a), hash_token(&a));
  }

  #[test]
  fn bearer_wins_over_cookie() {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sid=from-cookie"));
    assert_eq!(token_from_headers(&headers, "sid").as_deref(), Some("from-cookie"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(token_from_headers(&headers, "sid").as_deref(), Some("from-header"));
  }

  #[test]
  fn missing_token() {
    let mut headers = HeaderMap::new();
    assert!(token_from_headers(&headers, "sid").is_none());
    headers.insert(header::COOKIE, HeaderValue::from_static("sid="));
    assert!(token_from_headers(&headers, "sid").is_none());
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
    assert!(token_from_headers(&headers, "sid").is_none());
  }
}
