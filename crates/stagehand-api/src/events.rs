//! Handlers for events, ticket tiers, and ticket purchases.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/events` | `?status=&organizer_id=&venue_id=&starts_after=&limit=&offset=` |
//! | `POST`  | `/events` | Requires `ManageEvents`; the active account organizes |
//! | `GET`   | `/events/{id}` | Drafts are visible to their organizer only |
//! | `PATCH` | `/events/{id}` | Organizer only |
//! | `POST`  | `/events/{id}/cancel` | Organizer only; 409 if already cancelled |
//! | `GET`   | `/events/{id}/tiers` | |
//! | `POST`  | `/events/{id}/tiers` | Organizer only; tiers may not exceed capacity |
//! | `POST`  | `/tiers/{id}/purchase` | Body: `{"quantity":2}`; 409 when sold out |
//! | `GET`   | `/orders` | The active account's orders |

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
  event::{Event, EventPatch, EventQuery, EventStatus, NewEvent},
  store::PlatformStore,
  ticket::{NewTicketTier, TicketOrder, TicketTier},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, session::Session};

/// Load an event the caller can see. Drafts of other organizers are hidden.
pub(crate) async fn visible_event<S>(
  state: &AppState<S>,
  session: &Session,
  event_id: Uuid,
) -> Result<Event, ApiError>
where
  S: PlatformStore,
{
  state
    .store
    .get_event(event_id)
    .await
    .map_err(ApiError::store)?
    .filter(|e| e.status != EventStatus::Draft || e.organizer_id == session.account.account_id)
    .ok_or_else(|| ApiError::not_found("event", event_id))
}

/// Load an event the caller's active account organizes.
pub(crate) async fn organized_event<S>(
  state: &AppState<S>,
  session: &Session,
  event_id: Uuid,
) -> Result<Event, ApiError>
where
  S: PlatformStore,
{
  let event = visible_event(state, session, event_id).await?;
  if event.organizer_id != session.account.account_id {
    return Err(ApiError::forbidden("only the event organizer can do this"));
  }
  Ok(event)
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// `GET /events`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Query(mut query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: PlatformStore + 'static,
{
  query.viewer_id = Some(session.account.account_id);
  let events = state
    .store
    .list_events(query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:       String,
  #[serde(default)]
  pub description: String,
  pub venue_id:    Option<Uuid>,
  pub starts_at:   DateTime<Utc>,
  pub ends_at:     DateTime<Utc>,
  pub capacity:    Option<u32>,
  #[serde(default)]
  pub status:      EventStatus,
}

/// `POST /events`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::ManageEvents)?;

  let event = state
    .store
    .create_event(NewEvent {
      organizer_id: session.account.account_id,
      venue_id:     body.venue_id,
      title:        body.title,
      description:  body.description,
      starts_at:    body.starts_at,
      ends_at:      body.ends_at,
      capacity:     body.capacity,
      status:       body.status,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError>
where
  S: PlatformStore + 'static,
{
  Ok(Json(visible_event(&state, &session, id).await?))
}

/// `PATCH /events/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, ApiError>
where
  S: PlatformStore + 'static,
{
  organized_event(&state, &session, id).await?;
  let event = state
    .store
    .update_event(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(event))
}

/// `POST /events/{id}/cancel`
pub async fn cancel<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError>
where
  S: PlatformStore + 'static,
{
  organized_event(&state, &session, id).await?;
  let event = state
    .store
    .cancel_event(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(event))
}

// ─── Tiers ───────────────────────────────────────────────────────────────────

/// `GET /events/{id}/tiers`
pub async fn list_tiers<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TicketTier>>, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_event(&state, &session, id).await?;
  let tiers = state
    .store
    .list_ticket_tiers(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tiers))
}

#[derive(Debug, Deserialize)]
pub struct TierBody {
  pub name:        String,
  pub price_cents: i64,
  pub quantity:    u32,
}

/// `POST /events/{id}/tiers`
pub async fn add_tier<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<TierBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  organized_event(&state, &session, id).await?;
  let tier = state
    .store
    .add_ticket_tier(NewTicketTier {
      event_id:    id,
      name:        body.name,
      price_cents: body.price_cents,
      quantity:    body.quantity,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(tier)))
}

// ─── Orders ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
  pub quantity: u32,
}

/// `POST /tiers/{id}/purchase`
pub async fn purchase<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<PurchaseBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  let order = state
    .store
    .purchase_tickets(id, session.account.account_id, body.quantity)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /orders`
pub async fn list_orders<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<TicketOrder>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let orders = state
    .store
    .list_orders(session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(orders))
}
