use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use axum::{Json, response::IntoResponse as _};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use stagehand_core::{
  store::{FeedStore as _, Store, TravelStore},
  travel::{NewTravelGroup, NewTravelLeg, TravelGroup, TravelLeg},
};
use stagehand_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use super::*;

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(store, ApiConfig::default())
}

async fn oneshot_raw(
  state:   AppState<SqliteStore>,
  method:  &str,
  uri:     &str,
  headers: Vec<(header::HeaderName, String)>,
  body:    Option<Value>,
) -> axum::response::Response {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let req = builder.body(body).unwrap();
  api_router(state).oneshot(req).await.unwrap()
}

/// Send a request as the holder of `token` and decode the JSON reply.
async fn call(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  token:  Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let headers = token
    .map(|t| vec![(header::AUTHORIZATION, format!("Bearer {t}"))])
    .unwrap_or_default();
  let resp = oneshot_raw(state.clone(), method, uri, headers, body).await;
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

/// Register a profile and return its bearer token.
async fn register(state: &AppState<SqliteStore>, email: &str, name: &str) -> String {
  let (status, body) = call(
    state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "email": email, "display_name": name, "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["token"].as_str().unwrap().to_owned()
}

/// Create an account of `kind` for the token's profile and switch to it.
async fn become_kind(state: &AppState<SqliteStore>, token: &str, kind: &str, handle: &str) -> String {
  let (status, account) = call(
    state,
    "POST",
    "/accounts",
    Some(token),
    Some(json!({ "kind": kind, "handle": handle, "display_name": handle })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{account}");
  let id = account["account_id"].as_str().unwrap().to_owned();

  let (status, _) = call(state, "POST", &format!("/accounts/{id}/switch"), Some(token), None).await;
  assert_eq!(status, StatusCode::OK);
  id
}

async fn published_event(state: &AppState<SqliteStore>, token: &str, capacity: u32) -> String {
  let starts_at = Utc::now() + Duration::days(30);
  let (status, event) = call(
    state,
    "POST",
    "/events",
    Some(token),
    Some(json!({
      "title": "Harbour Nights",
      "starts_at": starts_at,
      "ends_at": starts_at + Duration::hours(6),
      "capacity": capacity,
      "status": "published",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{event}");
  event["event_id"].as_str().unwrap().to_owned()
}

// ── Health & auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_needs_no_session() {
  let state = make_state().await;
  let (status, body) = call(&state, "GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn register_login_and_me() {
  let state = make_state().await;
  register(&state, "  Ada@Example.COM ", "Ada").await;

  let (status, body) = call(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ada@example.com", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap();

  let (status, me) = call(&state, "GET", "/me", Some(token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["profile"]["email"], "ada@example.com");
  assert_eq!(me["accounts"].as_array().unwrap().len(), 1);
  assert_eq!(me["accounts"][0]["kind"], "personal");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let state = make_state().await;
  register(&state, "ada@example.com", "Ada").await;
  let (status, body) = call(
    &state,
    "POST",
    "/auth/register",
    None,
    Some(json!({ "email": "ADA@example.com", "display_name": "Ada", "password": "hunter2hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
  let state = make_state().await;
  register(&state, "ada@example.com", "Ada").await;
  let (status, _) = call(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "ada@example.com", "password": "not the password" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_token_is_unauthorized_with_challenge() {
  let state = make_state().await;
  let resp = oneshot_raw(state, "GET", "/me", vec![], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
  assert!(challenge.to_str().unwrap().starts_with("Bearer"));

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["error"].as_str().unwrap().contains("session"));
}

#[tokio::test]
async fn cookie_authenticates_and_logout_revokes() {
  let state = make_state().await;
  let token = register(&state, "ada@example.com", "Ada").await;
  let cookie = vec![(header::COOKIE, format!("theme=dark; stagehand_session={token}"))];

  let resp = oneshot_raw(state.clone(), "GET", "/me", cookie.clone(), None).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = oneshot_raw(state.clone(), "POST", "/auth/logout", cookie.clone(), None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let cleared = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
  assert!(cleared.contains("Max-Age=0"), "{cleared}");

  let resp = oneshot_raw(state, "GET", "/me", cookie, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn accounts_switch_and_permissions() {
  let state = make_state().await;
  let token = register(&state, "ada@example.com", "Ada").await;

  // A personal account cannot organize events.
  let starts_at = Utc::now() + Duration::days(1);
  let event = json!({
    "title": "Too soon",
    "starts_at": starts_at,
    "ends_at": starts_at + Duration::hours(1),
  });
  let (status, _) = call(&state, "POST", "/events", Some(token.as_str()), Some(event.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let organizer = become_kind(&state, &token, "organizer", "ada_presents").await;
  let (status, created) = call(&state, "POST", "/events", Some(token.as_str()), Some(event)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["organizer_id"], organizer.as_str());
  assert_eq!(created["status"], "draft");

  let (status, _) = call(
    &state,
    "POST",
    "/accounts",
    Some(token.as_str()),
    Some(json!({ "kind": "admin", "handle": "ada_admin", "display_name": "Ada" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(
    &state,
    "POST",
    "/accounts",
    Some(token.as_str()),
    Some(json!({ "kind": "artist", "handle": "ada_presents", "display_name": "Ada" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cannot_switch_to_someone_elses_account() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  let bob = register(&state, "bob@example.com", "Bob").await;
  let bobs = become_kind(&state, &bob, "artist", "bob_band").await;

  let (status, _) = call(&state, "POST", &format!("/accounts/{bobs}/switch"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(
    &state,
    "PATCH",
    &format!("/accounts/{bobs}"),
    Some(ada.as_str()),
    Some(json!({ "display_name": "Not Bob" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Events & tickets ─────────────────────────────────────────────────────────

#[tokio::test]
async fn drafts_are_hidden_from_others() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let bob = register(&state, "bob@example.com", "Bob").await;

  let starts_at = Utc::now() + Duration::days(3);
  let (_, draft) = call(
    &state,
    "POST",
    "/events",
    Some(ada.as_str()),
    Some(json!({ "title": "Secret", "starts_at": starts_at, "ends_at": starts_at + Duration::hours(2) })),
  )
  .await;
  let id = draft["event_id"].as_str().unwrap();

  let (status, _) = call(&state, "GET", &format!("/events/{id}"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, listed) = call(&state, "GET", "/events", Some(bob.as_str()), None).await;
  assert!(listed.as_array().unwrap().is_empty());

  let (status, _) = call(&state, "GET", &format!("/events/{id}"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);

  // The draft starts first; a one-item page for Bob still holds the public event.
  let public = published_event(&state, &ada, 50).await;
  let (status, page) = call(&state, "GET", "/events?limit=1", Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page.as_array().unwrap().len(), 1);
  assert_eq!(page[0]["event_id"], public.as_str());

  let (_, mine) = call(&state, "GET", "/events", Some(ada.as_str()), None).await;
  assert_eq!(mine.as_array().unwrap().len(), 2);

  let huge = format!("/events?limit={}&offset={}", u64::MAX, u64::MAX);
  let (status, past_the_end) = call(&state, "GET", &huge, Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(past_the_end.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ticket_purchase_sells_out() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 100).await;

  let (status, tier) = call(
    &state,
    "POST",
    &format!("/events/{event}/tiers"),
    Some(ada.as_str()),
    Some(json!({ "name": "Early bird", "price_cents": 2500, "quantity": 3 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let tier = tier["tier_id"].as_str().unwrap();

  let bob = register(&state, "bob@example.com", "Bob").await;
  let uri = format!("/tiers/{tier}/purchase");
  let (status, order) = call(&state, "POST", &uri, Some(bob.as_str()), Some(json!({ "quantity": 2 }))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(order["total_cents"], 5000);

  let (status, body) = call(&state, "POST", &uri, Some(bob.as_str()), Some(json!({ "quantity": 2 }))).await;
  assert_eq!(status, StatusCode::CONFLICT, "{body}");

  let (_, orders) = call(&state, "GET", "/orders", Some(bob.as_str()), None).await;
  assert_eq!(orders.as_array().unwrap().len(), 1);

  // Only the organizer may add tiers.
  let (status, _) = call(
    &state,
    "POST",
    &format!("/events/{event}/tiers"),
    Some(bob.as_str()),
    Some(json!({ "name": "Free", "price_cents": 0, "quantity": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn capacity_patch_respects_allocated_tiers() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 100).await;

  let (status, _) = call(
    &state,
    "POST",
    &format!("/events/{event}/tiers"),
    Some(ada.as_str()),
    Some(json!({ "name": "General", "price_cents": 2500, "quantity": 100 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let uri = format!("/events/{event}");
  let (status, body) = call(&state, "PATCH", &uri, Some(ada.as_str()), Some(json!({ "capacity": 10 }))).await;
  assert_eq!(status, StatusCode::CONFLICT, "{body}");

  let (_, stored) = call(&state, "GET", &uri, Some(ada.as_str()), None).await;
  assert_eq!(stored["capacity"], 100);

  let (status, grown) = call(&state, "PATCH", &uri, Some(ada.as_str()), Some(json!({ "capacity": 120 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(grown["capacity"], 120);
}

#[tokio::test]
async fn oversized_tier_price_is_rejected() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 100).await;

  let (status, _) = call(
    &state,
    "POST",
    &format!("/events/{event}/tiers"),
    Some(ada.as_str()),
    Some(json!({ "name": "Platinum", "price_cents": i64::MAX, "quantity": 5 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Bookings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn offer_is_answered_by_the_artist() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 500).await;

  let bob = register(&state, "bob@example.com", "Bob").await;
  let artist = become_kind(&state, &bob, "artist", "bob_band").await;

  let (status, booking) = call(
    &state,
    "POST",
    "/bookings",
    Some(ada.as_str()),
    Some(json!({ "event_id": event, "artist_id": artist, "fee_cents": 40000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{booking}");
  assert_eq!(booking["status"], "pending");
  let id = booking["booking_id"].as_str().unwrap();

  // A second open booking for the same pair is refused.
  let (status, _) = call(
    &state,
    "POST",
    "/bookings",
    Some(bob.as_str()),
    Some(json!({ "event_id": event })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  // The requester cannot accept its own offer.
  let (status, _) = call(&state, "POST", &format!("/bookings/{id}/accept"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, accepted) =
    call(&state, "POST", &format!("/bookings/{id}/accept"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(accepted["status"], "accepted");

  let (status, _) = call(&state, "POST", &format!("/bookings/{id}/decline"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, cancelled) =
    call(&state, "POST", &format!("/bookings/{id}/cancel"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cancelled["status"], "cancelled");

  let (_, listed) = call(&state, "GET", "/bookings", Some(bob.as_str()), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn personal_accounts_cannot_book() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 50).await;

  let bob = register(&state, "bob@example.com", "Bob").await;
  let (status, _) = call(
    &state,
    "POST",
    "/bookings",
    Some(bob.as_str()),
    Some(json!({ "event_id": event })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Site maps ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn site_map_compliance_report() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "venue", "the_warehouse").await;
  let event = published_event(&state, &ada, 800).await;

  let (status, map) = call(
    &state,
    "POST",
    &format!("/events/{event}/site-maps"),
    Some(ada.as_str()),
    Some(json!({ "name": "Ground floor", "width": 40.0, "height": 25.0 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{map}");
  assert_eq!(map["unit"], "meters");
  let map = map["site_map_id"].as_str().unwrap();

  let (status, exit) = call(
    &state,
    "POST",
    &format!("/site-maps/{map}/measurements"),
    Some(ada.as_str()),
    Some(json!({
      "label": "Fire exit width",
      "kind": "distance",
      "points": [{ "x": 0.0, "y": 0.0 }, { "x": 0.9, "y": 0.0 }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert!((exit["value"].as_f64().unwrap() - 0.9).abs() < 1e-9);

  let (status, _) = call(
    &state,
    "POST",
    &format!("/site-maps/{map}/measurements"),
    Some(ada.as_str()),
    Some(json!({ "label": "Bad angle", "kind": "angle", "points": [{ "x": 0.0, "y": 0.0 }] })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &state,
    "POST",
    &format!("/site-maps/{map}/rules"),
    Some(ada.as_str()),
    Some(json!({
      "name": "Exit width",
      "kind": "distance",
      "min_value": 1.2,
      "severity": "critical",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, report) =
    call(&state, "GET", &format!("/site-maps/{map}/compliance"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["status"], "violation");
  assert_eq!(report["measurements"][0]["label"], "Fire exit width");

  // Other accounts can read the report but not draw on the map.
  let bob = register(&state, "bob@example.com", "Bob").await;
  let (status, _) =
    call(&state, "GET", &format!("/site-maps/{map}/compliance"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  let measurement = exit["measurement_id"].as_str().unwrap();
  let (status, _) =
    call(&state, "DELETE", &format!("/measurements/{measurement}"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&state, "DELETE", &format!("/measurements/{measurement}"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, report) =
    call(&state, "GET", &format!("/site-maps/{map}/compliance"), Some(ada.as_str()), None).await;
  assert_eq!(report["status"], "compliant");
}

// ── Feed ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn posts_and_scheduled_publication() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;

  let (status, post) =
    call(&state, "POST", "/posts", Some(ada.as_str()), Some(json!({ "body": "Doors at eight" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let post_id = post["post_id"].as_str().unwrap();

  let (status, _) = call(&state, "POST", "/posts", Some(ada.as_str()), Some(json!({ "body": "   " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let bob = register(&state, "bob@example.com", "Bob").await;
  let (status, _) = call(&state, "DELETE", &format!("/posts/{post_id}"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(
    &state,
    "POST",
    "/scheduled-posts",
    Some(ada.as_str()),
    Some(json!({
      "body": "Too late",
      "platforms": ["stagehand"],
      "scheduled_for": Utc::now() - Duration::minutes(1),
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let when = Utc::now() + Duration::minutes(5);
  let (status, scheduled) = call(
    &state,
    "POST",
    "/scheduled-posts",
    Some(ada.as_str()),
    Some(json!({
      "body": "Lineup announced",
      "platforms": ["instagram", "stagehand", "instagram"],
      "scheduled_for": when,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(scheduled["platforms"], json!(["instagram", "stagehand"]));

  let published = state.store.publish_due(when + Duration::seconds(1)).await.unwrap();
  assert_eq!(published.len(), 1);

  let (_, feed) = call(&state, "GET", "/posts?limit=10", Some(bob.as_str()), None).await;
  let feed = feed.as_array().unwrap();
  assert_eq!(feed.len(), 2);
  assert_eq!(feed[0]["body"], "Lineup announced");

  let id = scheduled["scheduled_post_id"].as_str().unwrap();
  let (status, _) =
    call(&state, "POST", &format!("/scheduled-posts/{id}/cancel"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(&state, "DELETE", &format!("/posts/{post_id}"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ── Messaging ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn messages_inbox_and_read_receipts() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  let bob = register(&state, "bob@example.com", "Bob").await;
  let (_, bob_me) = call(&state, "GET", "/me", Some(bob.as_str()), None).await;
  let bob_account = bob_me["accounts"][0]["account_id"].as_str().unwrap().to_owned();
  let (_, ada_me) = call(&state, "GET", "/me", Some(ada.as_str()), None).await;
  let ada_account = ada_me["accounts"][0]["account_id"].as_str().unwrap().to_owned();

  for body in ["hi bob", "are you playing friday?"] {
    let (status, _) = call(
      &state,
      "POST",
      "/messages",
      Some(ada.as_str()),
      Some(json!({ "recipient_id": bob_account, "body": body })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (status, _) = call(
    &state,
    "POST",
    "/messages",
    Some(ada.as_str()),
    Some(json!({ "recipient_id": uuid::Uuid::new_v4(), "body": "anyone there?" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, inbox) = call(&state, "GET", "/messages/inbox", Some(bob.as_str()), None).await;
  let inbox = inbox.as_array().unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0]["counterpart_id"], ada_account.as_str());
  assert_eq!(inbox[0]["unread"], 2);
  let last = inbox[0]["last_message"]["message_id"].as_str().unwrap().to_owned();

  let (status, _) = call(&state, "POST", &format!("/messages/{last}/read"), Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, read) = call(&state, "POST", &format!("/messages/{last}/read"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(read["read_at"].is_string());

  let (_, thread) =
    call(&state, "GET", &format!("/messages?with={ada_account}"), Some(bob.as_str()), None).await;
  let thread = thread.as_array().unwrap();
  assert_eq!(thread.len(), 2);
  assert_eq!(thread[0]["body"], "hi bob");
}

// ── Travel ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn travel_groups_and_dashboard() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  become_kind(&state, &ada, "organizer", "ada_presents").await;
  let event = published_event(&state, &ada, 200).await;

  let (status, group) = call(
    &state,
    "POST",
    "/travel-groups",
    Some(ada.as_str()),
    Some(json!({ "event_id": event, "name": "Crew van" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let group = group["group_id"].as_str().unwrap();

  let bob = register(&state, "bob@example.com", "Bob").await;
  let legs_uri = format!("/travel-groups/{group}/legs");
  let departs_at = Utc::now() + Duration::days(29);
  let leg = json!({ "kind": "ground", "description": "Van from the depot", "departs_at": departs_at });

  let (status, _) = call(&state, "POST", &legs_uri, Some(bob.as_str()), Some(leg.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&state, "POST", &format!("/travel-groups/{group}/join"), Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call(&state, "POST", &legs_uri, Some(bob.as_str()), Some(leg)).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, dashboard) = call(&state, "GET", "/travel/dashboard", Some(ada.as_str()), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(dashboard["groups"][0]["member_count"], 2);
  assert_eq!(dashboard["upcoming_legs"].as_array().unwrap().len(), 1);
  assert!(dashboard["warnings"].as_array().unwrap().is_empty());

  let leave = format!("/travel-groups/{group}/leave");
  let (status, _) = call(&state, "POST", &leave, Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&state, "POST", &leave, Some(bob.as_str()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Delegates to [`SqliteStore`] but fails the sections named by its flags.
struct FlakyTravel {
  inner:       SqliteStore,
  fail_counts: bool,
  fail_legs:   bool,
}

impl FlakyTravel {
  fn offline(section: &str) -> stagehand_store_sqlite::Error {
    stagehand_store_sqlite::Error::Decode(format!("{section} offline"))
  }
}

impl Store for FlakyTravel {
  type Error = stagehand_store_sqlite::Error;
}

impl TravelStore for FlakyTravel {
  async fn create_travel_group(&self, input: NewTravelGroup) -> Result<TravelGroup, Self::Error> {
    self.inner.create_travel_group(input).await
  }

  async fn get_travel_group(&self, group_id: Uuid) -> Result<Option<TravelGroup>, Self::Error> {
    self.inner.get_travel_group(group_id).await
  }

  async fn join_travel_group(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, Self::Error> {
    self.inner.join_travel_group(group_id, account_id).await
  }

  async fn leave_travel_group(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, Self::Error> {
    self.inner.leave_travel_group(group_id, account_id).await
  }

  async fn is_travel_member(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, Self::Error> {
    self.inner.is_travel_member(group_id, account_id).await
  }

  async fn add_travel_leg(&self, input: NewTravelLeg) -> Result<TravelLeg, Self::Error> {
    self.inner.add_travel_leg(input).await
  }

  async fn list_travel_legs(&self, group_id: Uuid) -> Result<Vec<TravelLeg>, Self::Error> {
    self.inner.list_travel_legs(group_id).await
  }

  async fn travel_groups_for(&self, account_id: Uuid) -> Result<Vec<TravelGroup>, Self::Error> {
    self.inner.travel_groups_for(account_id).await
  }

  async fn upcoming_legs_for(
    &self,
    account_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Vec<TravelLeg>, Self::Error> {
    if self.fail_legs {
      return Err(Self::offline("legs"));
    }
    self.inner.upcoming_legs_for(account_id, now).await
  }

  async fn member_counts_for(&self, account_id: Uuid) -> Result<Vec<(Uuid, u32)>, Self::Error> {
    if self.fail_counts {
      return Err(Self::offline("member counts"));
    }
    self.inner.member_counts_for(account_id).await
  }
}

#[tokio::test]
async fn dashboard_reports_failed_sections_as_warnings() {
  let state = make_state().await;
  let ada = register(&state, "ada@example.com", "Ada").await;
  let ada_id: Uuid = become_kind(&state, &ada, "organizer", "ada_presents").await.parse().unwrap();
  let event = published_event(&state, &ada, 200).await;

  let (_, group) = call(
    &state,
    "POST",
    "/travel-groups",
    Some(ada.as_str()),
    Some(json!({ "event_id": event, "name": "Crew van" })),
  )
  .await;
  let group = group["group_id"].as_str().unwrap();
  let departs_at = Utc::now() + Duration::days(29);
  let (status, _) = call(
    &state,
    "POST",
    &format!("/travel-groups/{group}/legs"),
    Some(ada.as_str()),
    Some(json!({ "kind": "flight", "description": "BOS to LIS", "departs_at": departs_at })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let now = Utc::now();
  let healthy = FlakyTravel { inner: (*state.store).clone(), fail_counts: false, fail_legs: false };
  let full = travel::load_dashboard(&healthy, ada_id, now).await;
  assert!(full.warnings.is_empty());
  assert_eq!(full.groups[0].member_count, 1);
  assert_eq!(full.upcoming_legs.len(), 1);

  let no_counts = FlakyTravel { fail_counts: true, ..healthy };
  let partial = travel::load_dashboard(&no_counts, ada_id, now).await;
  assert_eq!(partial.groups.len(), 1);
  assert_eq!(partial.groups[0].member_count, 0);
  assert_eq!(partial.upcoming_legs.len(), 1);
  assert_eq!(partial.warnings.len(), 1);
  assert!(partial.warnings[0].contains("member counts unavailable"), "{:?}", partial.warnings);

  let no_legs = FlakyTravel { fail_counts: false, fail_legs: true, ..no_counts };
  let partial = travel::load_dashboard(&no_legs, ada_id, now).await;
  assert_eq!(partial.groups[0].member_count, 1);
  assert!(partial.upcoming_legs.is_empty());
  assert_eq!(partial.warnings.len(), 1);
  assert!(partial.warnings[0].contains("upcoming legs unavailable"), "{:?}", partial.warnings);

  // The handler serves the same assembly with a 200 and the JSON shape intact.
  let response = Json(partial).into_response();
  assert_eq!(response.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["upcoming_legs"].as_array().unwrap().is_empty());
  assert_eq!(body["warnings"].as_array().unwrap().len(), 1);
}

