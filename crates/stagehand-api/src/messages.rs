//! Handlers for direct messages between accounts.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/messages?with={account_id}` | Conversation with one account, oldest first |
//! | `POST` | `/messages` | Body: `{"recipient_id", "body"}`; requires `Message` |
//! | `GET`  | `/messages/inbox` | Latest message per counterpart with unread counts |
//! | `POST` | `/messages/{id}/read` | Recipient only; idempotent |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use stagehand_core::{
  account::Permission,
  message::{InboxEntry, Message, NewMessage},
  store::PlatformStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session};

#[derive(Debug, Deserialize)]
pub struct ConversationParams {
  pub with: Uuid,
}

/// `GET /messages`
pub async fn conversation<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Query(params): Query<ConversationParams>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let messages = state
    .store
    .conversation(session.account.account_id, params.with)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
  pub recipient_id: Uuid,
  pub body:         String,
}

/// `POST /messages`
pub async fn send<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<SendBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::Message)?;

  let message = state
    .store
    .send_message(NewMessage {
      sender_id:    session.account.account_id,
      recipient_id: body.recipient_id,
      body:         body.body,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::debug!(message_id = %message.message_id, "message sent");
  Ok((StatusCode::CREATED, Json(message)))
}

/// `GET /messages/inbox`
pub async fn inbox<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<InboxEntry>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let entries = state
    .store
    .inbox(session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

/// `POST /messages/{id}/read`
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Message>, ApiError>
where
  S: PlatformStore + 'static,
{
  let message = state
    .store
    .get_message(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("message", id))?;
  if message.recipient_id != session.account.account_id {
    return Err(ApiError::forbidden("only the recipient can mark a message read"));
  }

  let message = state
    .store
    .mark_read(id, Utc::now())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(message))
}
