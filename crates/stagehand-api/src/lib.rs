//! JSON REST API for Stagehand.
//!
//! Exposes an axum [`Router`] backed by any [`PlatformStore`]. Every route
//! except registration, login, and `/health` requires a [`session::Session`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = stagehand_api::api_router(AppState::new(store, ApiConfig::default()));
//! ```

pub mod accounts;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod events;
pub mod feed;
pub mod messages;
pub mod session;
pub mod site_maps;
pub mod travel;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use stagehand_core::store::PlatformStore;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Settings the HTTP layer needs at request time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Lifetime of a session token.
  pub session_ttl_hours: u32,
  /// Cookie consulted when no bearer header is present.
  pub cookie_name:       String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { session_ttl_hours: 720, cookie_name: "stagehand_session".into() }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ApiConfig) -> Self {
    Self { store: Arc::new(store), config: Arc::new(config) }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: Arc::clone(&self.config) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PlatformStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Profiles & sessions
    .route("/auth/register", post(auth::register::<S>))
    .route("/auth/login", post(auth::login::<S>))
    .route("/auth/logout", post(auth::logout::<S>))
    .route("/me", get(auth::me::<S>))
    // Accounts
    .route("/accounts", get(accounts::list::<S>).post(accounts::create::<S>))
    .route("/accounts/{id}", get(accounts::get_one::<S>).patch(accounts::update::<S>))
    .route("/accounts/{id}/switch", post(accounts::switch::<S>))
    // Events & tickets
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route("/events/{id}", get(events::get_one::<S>).patch(events::update::<S>))
    .route("/events/{id}/cancel", post(events::cancel::<S>))
    .route("/events/{id}/tiers", get(events::list_tiers::<S>).post(events::add_tier::<S>))
    .route("/tiers/{id}/purchase", post(events::purchase::<S>))
    .route("/orders", get(events::list_orders::<S>))
    // Bookings
    .route("/bookings", get(bookings::list::<S>).post(bookings::request::<S>))
    .route("/bookings/{id}", get(bookings::get_one::<S>))
    .route("/bookings/{id}/accept", post(bookings::accept::<S>))
    .route("/bookings/{id}/decline", post(bookings::decline::<S>))
    .route("/bookings/{id}/cancel", post(bookings::cancel::<S>))
    // Site maps
    .route(
      "/events/{id}/site-maps",
      get(site_maps::list::<S>).post(site_maps::create::<S>),
    )
    .route("/site-maps/{id}", get(site_maps::get_one::<S>))
    .route(
      "/site-maps/{id}/measurements",
      get(site_maps::list_measurements::<S>).post(site_maps::add_measurement::<S>),
    )
    .route("/measurements/{id}", delete(site_maps::delete_measurement::<S>))
    .route(
      "/site-maps/{id}/rules",
      get(site_maps::list_rules::<S>).post(site_maps::add_rule::<S>),
    )
    .route("/site-maps/{id}/compliance", get(site_maps::compliance::<S>))
    // Feed
    .route("/posts", get(feed::list::<S>).post(feed::create::<S>))
    .route("/posts/{id}", get(feed::get_one::<S>).delete(feed::remove::<S>))
    .route(
      "/scheduled-posts",
      get(feed::list_scheduled::<S>).post(feed::schedule::<S>),
    )
    .route("/scheduled-posts/{id}/cancel", post(feed::cancel_scheduled::<S>))
    // Messaging
    .route("/messages", get(messages::conversation::<S>).post(messages::send::<S>))
    .route("/messages/inbox", get(messages::inbox::<S>))
    .route("/messages/{id}/read", post(messages::mark_read::<S>))
    // Travel
    .route("/travel-groups", get(travel::list::<S>).post(travel::create::<S>))
    .route("/travel-groups/{id}/join", post(travel::join::<S>))
    .route("/travel-groups/{id}/leave", post(travel::leave::<S>))
    .route(
      "/travel-groups/{id}/legs",
      get(travel::list_legs::<S>).post(travel::add_leg::<S>),
    )
    .route("/travel/dashboard", get(travel::dashboard::<S>))
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
