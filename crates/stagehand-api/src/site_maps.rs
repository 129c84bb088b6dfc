//! Handlers for site maps, measurements, compliance rules, and reports.
//!
//! Measurement values are always computed here from the submitted points;
//! clients never send a value.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/events/{id}/site-maps` | |
//! | `POST`   | `/events/{id}/site-maps` | Organizer with `ManageSiteMaps` |
//! | `GET`    | `/site-maps/{id}` | |
//! | `GET`    | `/site-maps/{id}/measurements` | |
//! | `POST`   | `/site-maps/{id}/measurements` | `unit` defaults to the map's unit |
//! | `DELETE` | `/measurements/{id}` | 204; organizer only |
//! | `GET`    | `/site-maps/{id}/rules` | |
//! | `POST`   | `/site-maps/{id}/rules` | Organizer only |
//! | `GET`    | `/site-maps/{id}/compliance` | Every measurement against every rule |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use stagehand_core::{
  account::Permission,
  measure::{ComplianceRule, MeasurementKind, Point, Severity, Unit},
  site_map::{
    ComplianceReport, Measurement, NewComplianceRule, NewMeasurement, NewSiteMap, SiteMap,
  },
  store::PlatformStore,
};
use tokio::try_join;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  events::{organized_event, visible_event},
  session::Session,
};

/// Load a site map whose event the caller can see.
async fn visible_map<S>(
  state: &AppState<S>,
  session: &Session,
  site_map_id: Uuid,
) -> Result<SiteMap, ApiError>
where
  S: PlatformStore,
{
  let map = state
    .store
    .get_site_map(site_map_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("site map", site_map_id))?;
  visible_event(state, session, map.event_id).await?;
  Ok(map)
}

/// Load a site map the caller may edit.
async fn managed_map<S>(
  state: &AppState<S>,
  session: &Session,
  site_map_id: Uuid,
) -> Result<SiteMap, ApiError>
where
  S: PlatformStore,
{
  session.require(Permission::ManageSiteMaps)?;
  let map = visible_map(state, session, site_map_id).await?;
  organized_event(state, session, map.event_id).await?;
  Ok(map)
}

// ─── Maps ────────────────────────────────────────────────────────────────────

/// `GET /events/{id}/site-maps`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<SiteMap>>, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_event(&state, &session, event_id).await?;
  let maps = state
    .store
    .list_site_maps(event_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(maps))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:   String,
  pub width:  f64,
  pub height: f64,
  #[serde(default)]
  pub unit:   Unit,
}

/// `POST /events/{id}/site-maps`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(event_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  session.require(Permission::ManageSiteMaps)?;
  organized_event(&state, &session, event_id).await?;

  let map = state
    .store
    .create_site_map(NewSiteMap {
      event_id,
      name: body.name,
      width: body.width,
      height: body.height,
      unit: body.unit,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(map)))
}

/// `GET /site-maps/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<SiteMap>, ApiError>
where
  S: PlatformStore + 'static,
{
  Ok(Json(visible_map(&state, &session, id).await?))
}

// ─── Measurements ────────────────────────────────────────────────────────────

/// `GET /site-maps/{id}/measurements`
pub async fn list_measurements<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Measurement>>, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_map(&state, &session, id).await?;
  let measurements = state
    .store
    .list_measurements(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(measurements))
}

#[derive(Debug, Deserialize)]
pub struct MeasurementBody {
  pub label:  String,
  pub kind:   MeasurementKind,
  pub points: Vec<Point>,
  pub unit:   Option<Unit>,
}

/// `POST /site-maps/{id}/measurements`
pub async fn add_measurement<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<MeasurementBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  let map = managed_map(&state, &session, id).await?;
  let measurement = state
    .store
    .add_measurement(NewMeasurement {
      site_map_id: id,
      label:       body.label,
      kind:        body.kind,
      points:      body.points,
      unit:        body.unit.unwrap_or(map.unit),
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(measurement)))
}

/// `DELETE /measurements/{id}`
pub async fn delete_measurement<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: PlatformStore + 'static,
{
  let measurement = state
    .store
    .get_measurement(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::not_found("measurement", id))?;
  managed_map(&state, &session, measurement.site_map_id).await?;

  state
    .store
    .delete_measurement(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Rules & compliance ──────────────────────────────────────────────────────

/// `GET /site-maps/{id}/rules`
pub async fn list_rules<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ComplianceRule>>, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_map(&state, &session, id).await?;
  let rules = state.store.list_rules(id).await.map_err(ApiError::store)?;
  Ok(Json(rules))
}

#[derive(Debug, Deserialize)]
pub struct RuleBody {
  pub name:      String,
  pub kind:      MeasurementKind,
  pub min_value: Option<f64>,
  pub max_value: Option<f64>,
  pub unit:      Option<Unit>,
  pub severity:  Severity,
}

/// `POST /site-maps/{id}/rules`
pub async fn add_rule<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
  Json(body): Json<RuleBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore + 'static,
{
  let map = managed_map(&state, &session, id).await?;
  let rule = state
    .store
    .add_rule(NewComplianceRule {
      site_map_id: id,
      name:        body.name,
      kind:        body.kind,
      min_value:   body.min_value,
      max_value:   body.max_value,
      unit:        body.unit.unwrap_or(map.unit),
      severity:    body.severity,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(rule)))
}

/// `GET /site-maps/{id}/compliance`
pub async fn compliance<S>(
  State(state): State<AppState<S>>,
  session: Session,
  Path(id): Path<Uuid>,
) -> Result<Json<ComplianceReport>, ApiError>
where
  S: PlatformStore + 'static,
{
  visible_map(&state, &session, id).await?;
  let (measurements, rules) = try_join!(
    async { state.store.list_measurements(id).await.map_err(ApiError::store) },
    async { state.store.list_rules(id).await.map_err(ApiError::store) },
  )?;

  let report = ComplianceReport::build(id, &measurements, &rules, Utc::now());
  tracing::debug!(site_map_id = %id, status = ?report.status, "compliance report");
  Ok(Json(report))
}
