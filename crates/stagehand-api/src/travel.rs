//! Handlers for travel groups, itinerary legs, and the travel dashboard.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/travel-groups` | Groups the active account belongs to |
//! | `POST` | `/travel-groups` | Body: `{"event_id", "name"}`; the creator joins |
//! | `POST` | `/travel-groups/{id}/join` | Idempotent |
//! | `POST` | `/travel-groups/{id}/leave` | 204; 404 if not a member |
//! | `GET`  | `/travel-groups/{id}/legs` | Members only |
//! | `POST` | `/travel-groups/{id}/legs` | Members only |
//! | `GET`  | `/travel/dashboard` | Partial failures are reported in `warnings` |

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stagehand_core::{
  store::{PlatformStore, TravelStore},
  travel::{
    GroupSummary, LegKind, NewTravelGroup, NewTravelLeg, TravelDashboard, TravelGroup,
    TravelLeg,
  },
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, events::visible_event, session::Session};

async fn member_group<S>(
  state: &AppState<S>,
  session: &Session,
  group_id: Uuid,
) -> Result<TravelGroup, ApiError>
where
  S: PlatformStore,
{
  let group = state
    .store
    .get_travel_group(group_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("travel group", group_id))?;
  let member = state
    .store
    .is_travel_member(group_id, session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  if !member {
    return Err(ApiError::forbidden("only group members can do this"));
  }
  Ok(group)
}

// ─── Groups ──────────────────────────────────────────────────────────────────

/// `GET /travel-groups`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Result<Json<Vec<TravelGroup>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let groups = state
    .store
    .travel_groups_for(session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub event_id: Uuid,
  pub name:     String,
}

/// `POST /travel-groups`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_event(&state, &session, body.event_id).await?;
  let group = state
    .store
    .create_travel_group(NewTravelGroup {
      event_id:   body.event_id,
      name:       body.name,
      created_by: session.account.account_id,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(group)))
}

/// `POST /travel-groups/{id}/join`
pub async fn join<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<TravelGroup>, ApiError>
where
  S: PlatformStore + 'static,
{
  let group = state
    .store
    .get_travel_group(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("travel group", id))?;
  visible_event(&state, &session, group.event_id).await?;

  let joined = state
    .store
    .join_travel_group(id, session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  if joined {
    tracing::debug!(group_id = %id, account_id = %session.account.account_id, "joined travel group");
  }
  Ok(Json(group))
}

/// `POST /travel-groups/{id}/leave`
pub async fn leave<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PlatformStore + 'static,
{
  let left = state
    .store
    .leave_travel_group(id, session.account.account_id)
    .await
    .map_err(ApiError::store)?;
  if !left {
    return Err(ApiError::NotFound(format!("not a member of travel group {id}")));
  }
  Ok(StatusCode::NO_CONTENT)
}

// ─── Legs ────────────────────────────────────────────────────────────────────

/// `GET /travel-groups/{id}/legs`
pub async fn list_legs<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<TravelLeg>>, ApiError>
where
  S: PlatformStore + 'static,
{
  member_group(&state, &session, id).await?;
  let legs = state
    .store
    .list_travel_legs(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(legs))
}

#[derive(Debug, Deserialize)]
pub struct LegBody {
  pub kind:        LegKind,
  pub description: String,
  pub departs_at:  DateTime<Utc>,
  pub arrives_at:  Option<DateTime<Utc>>,
}

/// `POST /travel-groups/{id}/legs`
pub async fn add_leg<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<LegBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  member_group(&state, &session, id).await?;
  let leg = state
    .store
    .add_travel_leg(NewTravelLeg {
      group_id:    id,
      kind:        body.kind,
      description: body.description,
      departs_at:  body.departs_at,
      arrives_at:  body.arrives_at,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(leg)))
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// `GET /travel/dashboard`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  session: Session,
) -> Json<TravelDashboard>
where
  S: PlatformStore + 'static,
{
  Json(load_dashboard(state.store.as_ref(), session.account.account_id, Utc::now()).await)
}

/// Assemble the dashboard for `account_id`.
///
/// The three sections load concurrently. A section that fails is left empty
/// and a warning is recorded in its place.
pub async fn load_dashboard<S>(store: &S, account_id: Uuid, now: DateTime<Utc>) -> TravelDashboard
where
  S: TravelStore,
{
  let (groups, legs, counts) = tokio::join!(
    store.travel_groups_for(account_id),
    store.upcoming_legs_for(account_id, now),
    store.member_counts_for(account_id),
  );

  let mut warnings = Vec::new();

  let counts: HashMap<Uuid, u32> = match counts {
    Ok(counts) => counts.into_iter().collect(),
    Err(e) => {
      tracing::warn!(%account_id, error = %e, "member counts unavailable");
      warnings.push(format!("member counts unavailable: {e}"));
      HashMap::new()
    }
  };

  let groups = match groups {
    Ok(groups) => groups
      .into_iter()
      .map(|group| {
        let member_count = counts.get(&group.group_id).copied().unwrap_or(0);
        GroupSummary { group, member_count }
      })
      .collect(),
    Err(e) => {
      tracing::warn!(%account_id, error = %e, "travel groups unavailable");
      warnings.push(format!("travel groups unavailable: {e}"));
      Vec::new()
    }
  };

  let upcoming_legs = legs.unwrap_or_else(|e| {
    tracing::warn!(%account_id, error = %e, "upcoming legs unavailable");
    warnings.push(format!("upcoming legs unavailable: {e}"));
    Vec::new()
  });

  TravelDashboard {
    account_id,
    generated_at: now,
    groups,
    upcoming_legs,
    warnings,
  }
}
