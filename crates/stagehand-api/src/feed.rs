//! Handlers for the feed and scheduled posts.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/posts` | Newest first; `?author_id=&event_id=&before=&limit=` |
//! | `POST`   | `/posts` | Requires `Post`; authored by the active account |
//! | `GET`    | `/posts/{id}` | |
//! | `DELETE` | `/posts/{id}` | Author only; 204 |
//! | `GET`    | `/scheduled-posts` | The active account's schedule |
//! | `POST`   | `/scheduled-posts` | `scheduled_for` must be in the future |
//! | `POST`   | `/scheduled-posts/{id}/cancel` | 409 once published or cancelled |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stagehand_core::{
  account::Permission,
  feed::{FeedQuery, NewPost, NewScheduledPost, Platform, Post, ScheduledPost},
  store::PlatformStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, events::visible_event, session::Session};

// ─── Posts ───────────────────────────────────────────────────────────────────

/// `GET /posts`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Post>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let posts = state
    .store
    .list_posts(query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(posts))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub body:     String,
  pub event_id: Option<Uuid>,
}

/// `POST /posts`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::Post)?;
  if let Some(event_id) = body.event_id {
    visible_event(&state, &session, event_id).await?;
  }

  let post = state
    .store
    .create_post(NewPost {
      author_id: session.account.account_id,
      event_id:  body.event_id,
      body:      body.body,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /posts/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Post>, ApiError>
where
  S: PlatformStore + 'static,
{
  let post = state
    .store
    .get_post(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("post", id))?;
  Ok(Json(post))
}

/// `DELETE /posts/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PlatformStore + 'static,
{
  let post = state
    .store
    .get_post(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("post", id))?;
  if post.author_id != session.account.account_id {
    return Err(ApiError::forbidden("only the author can delete this post"));
  }

  state.store.delete_post(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Scheduling ──────────────────────────────────────────────────────────────

/// `GET /scheduled-posts`
pub async fn list_scheduled<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<ScheduledPost>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let scheduled = state
    .store
    .list_scheduled_posts(session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(scheduled))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
  pub body:          String,
  pub platforms:     Vec<Platform>,
  pub scheduled_for: DateTime<Utc>,
}

/// `POST /scheduled-posts`
pub async fn schedule<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<ScheduleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::Post)?;
  let scheduled = state
    .store
    .schedule_post(NewScheduledPost {
      account_id:    session.account.account_id,
      body:          body.body,
      platforms:     body.platforms,
      scheduled_for: body.scheduled_for,
    })
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    scheduled_post_id = %scheduled.scheduled_post_id,
    scheduled_for = %scheduled.scheduled_for,
    "post scheduled"
  );
  Ok((StatusCode::CREATED, Json(scheduled)))
}

/// `POST /scheduled-posts/{id}/cancel`
pub async fn cancel_scheduled<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<ScheduledPost>, ApiError>
where
  S: PlatformStore + 'static,
{
  let scheduled = state
    .store
    .get_scheduled_post(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("scheduled post", id))?;
  if scheduled.account_id != session.account.account_id {
    return Err(ApiError::forbidden("only the scheduling account can cancel this post"));
  }

  let cancelled = state
    .store
    .cancel_scheduled_post(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(cancelled))
}
