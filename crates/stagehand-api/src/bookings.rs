//! Handlers for `/bookings` endpoints.
//!
//! A booking is either an offer (the event organizer asks an artist) or an
//! application (an artist asks the organizer). The side that did not make
//! the request accepts or declines it; either side may cancel.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/bookings` | Bookings the active account is party to; `?event_id=&status=` |
//! | `POST` | `/bookings` | Body: `{"event_id", "artist_id"?, "fee_cents"?, "message"?}` |
//! | `GET`  | `/bookings/{id}` | Parties only |
//! | `POST` | `/bookings/{id}/accept` | Responding party only |
//! | `POST` | `/bookings/{id}/decline` | Responding party only |
//! | `POST` | `/bookings/{id}/cancel` | Either party |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use stagehand_core::{
  account::{AccountKind, Permission},
  booking::{Booking, BookingQuery, BookingStatus, NewBooking},
  event::EventStatus,
  store::PlatformStore,
};
use uuid::Uuid;

use crate::{AppState, error::ApiError, events::visible_event, session::Session};

async fn party_booking<S>(
  state: &AppState<S>,
  session: &Session,
  booking_id: Uuid,
) -> Result<Booking, ApiError>
where
  S: PlatformStore,
{
  let booking = state
    .store
    .get_booking(booking_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("booking", booking_id))?;
  if !booking.is_party(session.account.account_id) {
    return Err(ApiError::forbidden("not a party to this booking"));
  }
  Ok(booking)
}

// ─── List / get ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub event_id: Option<Uuid>,
  pub status:   Option<BookingStatus>,
}

/// `GET /bookings`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Booking>>, ApiError>
where
  S: PlatformStore + 'static,
{
  let bookings = state
    .store
    .list_bookings(BookingQuery {
      event_id:   params.event_id,
      account_id: Some(session.account.account_id),
      status:     params.status,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(bookings))
}

/// `GET /bookings/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError>
where
  S: PlatformStore + 'static,
{
  Ok(Json(party_booking(&state, &session, id).await?))
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RequestBody {
  pub event_id:  Uuid,
  /// Required when the organizer makes an offer; ignored for applications.
  pub artist_id: Option<Uuid>,
  pub fee_cents: Option<i64>,
  pub message:   Option<String>,
}

/// `POST /bookings`
pub async fn request<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Json(body): Json<RequestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::ManageBookings)?;
  let me = session.account.account_id;

  let event = visible_event(&state, &session, body.event_id).await?;
  if event.status == EventStatus::Cancelled {
    return Err(ApiError::Domain(stagehand_core::Error::Conflict(
      "cannot book acts for a cancelled event".into(),
    )));
  }

  let artist_id = if event.organizer_id == me {
    let artist_id = body
      .artist_id
      .ok_or_else(|| ApiError::BadRequest("artist_id is required for an offer".into()))?;
    let artist = state
      .store
      .get_account(artist_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::not_found("account", artist_id))?;
    if artist.kind != AccountKind::Artist {
      return Err(ApiError::BadRequest(format!("account {artist_id} is not an artist")));
    }
    artist_id
  } else if session.account.kind == AccountKind::Artist {
    me
  } else {
    return Err(ApiError::forbidden(
      "only the event organizer or an artist can request a booking",
    ));
  };

  let booking = state
    .store
    .request_booking(NewBooking {
      event_id:     event.event_id,
      organizer_id: event.organizer_id,
      artist_id,
      requested_by: me,
      fee_cents:    body.fee_cents,
      message:      body.message,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(booking)))
}

// ─── Respond / cancel ────────────────────────────────────────────────────────

async fn respond<S>(
  state: AppState<S>,
  session: Session,
  booking_id: Uuid,
  status: BookingStatus,
) -> Result<Json<Booking>, ApiError>
where
  S: PlatformStore,
{
  let booking = party_booking(&state, &session, booking_id).await?;
  let me = session.account.account_id;

  let allowed = match status {
    BookingStatus::Cancelled => booking.is_party(me),
    _ => booking.can_respond(me),
  };
  if !allowed {
    return Err(ApiError::forbidden("the requesting side cannot answer its own request"));
  }

  let updated = state
    .store
    .set_booking_status(booking_id, status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updated))
}

/// `POST /bookings/{id}/accept`
pub async fn accept<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError>
where
  S: PlatformStore + 'static,
{
  respond(state, session, id, BookingStatus::Accepted).await
}

/// `POST /bookings/{id}/decline`
pub async fn decline<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError>
where
  S: PlatformStore + 'static,
{
  respond(state, session, id, BookingStatus::Declined).await
}

/// `POST /bookings/{id}/cancel`
pub async fn cancel<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError>
where
  S: PlatformStore + 'static,
{
  respond(state, session, id, BookingStatus::Cancelled).await
}
