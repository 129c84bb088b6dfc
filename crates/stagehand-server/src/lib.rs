//! Process-level wiring for the Stagehand server: configuration, the HTTP
//! app with request tracing, and the background publisher.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stagehand_api::{ApiConfig, AppState, api_router};
use stagehand_core::store::PlatformStore;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STAGEHAND_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// SQLite database file. A leading `~/` is expanded.
  pub store_path:            PathBuf,
  pub session_ttl_hours:     u32,
  /// Seconds between runs of the scheduled-post publisher.
  pub publish_interval_secs: u64,
  pub cookie_name:           String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let api = ApiConfig::default();
    Self {
      host:                  "127.0.0.1".into(),
      port:                  8080,
      store_path:            PathBuf::from("~/.local/share/stagehand/stagehand.db"),
      session_ttl_hours:     api.session_ttl_hours,
      publish_interval_secs: 60,
      cookie_name:           api.cookie_name,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      session_ttl_hours: self.session_ttl_hours,
      cookie_name:       self.cookie_name.clone(),
    }
  }

  pub fn publish_interval(&self) -> Duration {
    Duration::from_secs(self.publish_interval_secs.max(1))
  }
}

// ─── App ─────────────────────────────────────────────────────────────────────

/// The API router with a tracing span per request.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: PlatformStore + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}

// ─── Publisher ───────────────────────────────────────────────────────────────

/// What one publisher run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
  pub published: usize,
  pub purged:    usize,
}

/// Publish every due scheduled post and drop expired sessions.
pub async fn publish_once<S>(store: &S, now: DateTime<Utc>) -> Result<Tick, S::Error>
where
  S: PlatformStore,
{
  let published = store.publish_due(now).await?;
  for post in &published {
    tracing::info!(
      scheduled_post_id = %post.scheduled_post_id,
      post_id = ?post.post_id,
      "published scheduled post"
    );
  }
  let purged = store.purge_expired_sessions(now).await?;
  Ok(Tick { published: published.len(), purged })
}

/// Run [`publish_once`] every `period` until the task is aborted. Failures
/// are logged and retried on the next tick.
pub fn spawn_publisher<S>(store: Arc<S>, period: Duration) -> JoinHandle<()>
where
  S: PlatformStore + 'static,
{
  tracing::info!("starting publisher (interval: {}s)", period.as_secs());
  tokio::spawn(async move {
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      timer.tick().await;
      match publish_once(store.as_ref(), Utc::now()).await {
        Ok(tick) if tick != Tick::default() => {
          tracing::debug!(published = tick.published, purged = tick.purged, "publisher tick");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "publisher tick failed"),
      }
    }
  })
}
