//! Handlers for registration, login, logout, and `/me`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Creates a profile and its personal account; 201 + token |
//! | `POST` | `/auth/login` | 401 on unknown email or wrong password |
//! | `POST` | `/auth/logout` | Deletes the presented session; 204 |
//! | `GET`  | `/me` | Profile plus every owned account |

use axum::{
  Json,
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use stagehand_core::{
  account::Account,
  profile::{
    NewProfile, Profile, ProfileView, Session as StoredSession, check_password,
    normalize_email,
  },
  store::PlatformStore,
};

use crate::{
  ApiConfig, AppState,
  error::ApiError,
  session::{Session, generate_token, hash_password, hash_token, verify_password},
};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub profile:    Profile,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub account:    Option<Account>,
}

/// Issue a token for `profile`, persist its digest, and build the cookie.
async fn open_session<S>(
  state: &AppState<S>,
  profile: &Profile,
) -> Result<(String, DateTime<Utc>, String), ApiError>
where
  S: PlatformStore,
{
  let token = generate_token();
  let now = Utc::now();
  let expires_at = now + Duration::hours(i64::from(state.config.session_ttl_hours));

  state
    .store
    .create_session(StoredSession {
      token_hash: hash_token(&token),
      profile_id: profile.profile_id,
      created_at: now,
      expires_at,
    })
    .await
    .map_err(ApiError::store)?;

  let cookie = session_cookie(&state.config, &token, state.config.session_ttl_hours);
  Ok((token, expires_at, cookie))
}

fn session_cookie(config: &ApiConfig, token: &str, ttl_hours: u32) -> String {
  let max_age = u64::from(ttl_hours) * 3600;
  format!(
    "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}",
    config.cookie_name
  )
}

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:        String,
  pub display_name: String,
  pub password:     String,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  check_password(&body.password)?;
  let password_hash = hash_password(&body.password)?;

  let (profile, account) = state
    .store
    .register(NewProfile {
      email: body.email,
      display_name: body.display_name,
      password_hash,
    })
    .await
    .map_err(ApiError::store)?;

  let (token, expires_at, cookie) = open_session(&state, &profile).await?;
  Ok((
    StatusCode::CREATED,
    [(header::SET_COOKIE, cookie)],
    Json(TokenResponse { token, expires_at, profile, account: Some(account) }),
  ))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  let email = normalize_email(&body.email).map_err(|_| ApiError::Unauthorized)?;
  let (profile, phc) = state
    .store
    .credentials(email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  if !verify_password(&body.password, &phc) {
    tracing::info!(profile_id = %profile.profile_id, "rejected login");
    return Err(ApiError::Unauthorized);
  }

  let (token, expires_at, cookie) = open_session(&state, &profile).await?;
  tracing::info!(profile_id = %profile.profile_id, "login");
  Ok((
    [(header::SET_COOKIE, cookie)],
    Json(TokenResponse { token, expires_at, profile, account: None }),
  ))
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  state
    .store
    .delete_session(session.token_hash)
    .await
    .map_err(ApiError::store)?;

  let cleared = session_cookie(&state.config, "", 0);
  Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cleared)]))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<ProfileView>, ApiError>
where
  S: PlatformStore + 'static,
{
  let accounts = state
    .store
    .list_accounts(session.profile.profile_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ProfileView { profile: session.profile, accounts }))
}
