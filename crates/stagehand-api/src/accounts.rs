//! Handlers for `/accounts` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/accounts` | Accounts owned by the caller's profile |
//! | `POST`  | `/accounts` | 409 on a taken handle; admin accounts need an admin |
//! | `GET`   | `/accounts/{id}` | Public view of any account |
//! | `PATCH` | `/accounts/{id}` | Owner only |
//! | `POST`  | `/accounts/{id}/switch` | Owner only; returns the updated profile |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stagehand_core::{
  account::{Account, AccountKind, AccountPatch, NewAccount},
  profile::Profile,
  store::PlatformStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session};

/// `GET /accounts`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<Account>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let accounts = state
    .store
    .list_accounts(session.profile.profile_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(accounts))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub kind:         AccountKind,
  pub handle:       String,
  pub display_name: String,
  pub bio:          Option<String>,
}

/// `POST /accounts`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  let owner_id = session.profile.profile_id;

  if body.kind == AccountKind::Admin {
    let owned = state
      .store
      .list_accounts(owner_id)
      .await
      .map_err(ApiError::store)?;
    if !owned.iter().any(|a| a.kind == AccountKind::Admin) {
      return Err(ApiError::forbidden("only an administrator can create admin accounts"));
    }
  }

  let account = state
    .store
    .create_account(NewAccount {
      owner_id,
      kind: body.kind,
      handle: body.handle,
      display_name: body.display_name,
      bio: body.bio,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(account)))
}

/// `GET /accounts/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Account>, ApiError>
where
  S: PlatformStore + 'static,
{
  let account = state
    .store
    .get_account(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("account", id))?;
  Ok(Json(account))
}

/// `PATCH /accounts/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(patch): Json<AccountPatch>,
) -> Result<Json<Account>, ApiError>
where
  S: PlatformStore + 'static,
{
  let account = state
    .store
    .get_account(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("account", id))?;
  if account.owner_id != session.profile.profile_id {
    return Err(ApiError::forbidden("only the owner can edit this account"));
  }

  let updated = state
    .store
    .update_account(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}

/// `POST /accounts/{id}/switch`
pub async fn switch<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: PlatformStore + 'static,
{
  let profile = state
    .store
    .switch_account(session.profile.profile_id, id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profile))
}
