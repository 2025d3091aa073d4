//! Read-only JSON query API for the payload tracker.
//!
//! Exposes an axum [`Router`] backed by any [`TrackerStore`]. Auth and TLS are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = AppState::new(store.clone(), ApiConfig::default());
//! .nest("/api/v1", tracker_api::api_router(state))
//! ```

pub mod error;
pub mod kibana;
pub mod metrics;
pub mod payloads;
pub mod statuses;

use std::{sync::Arc, time::Instant};

use axum::{Json, Router, extract::State, middleware, routing::get};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracker_core::store::{Paged, TrackerStore};
use tracker_ingest::IngestStats;

pub use error::ApiError;
pub use kibana::KibanaConfig;
pub use metrics::ApiMetrics;

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub kibana: KibanaConfig,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub config:  Arc<ApiConfig>,
  pub metrics: Arc<ApiMetrics>,
  /// Counters of a consumer running in the same process, if any.
  pub ingest:  Option<Arc<IngestStats>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      config:  Arc::clone(&self.config),
      metrics: Arc::clone(&self.metrics),
      ingest:  self.ingest.clone(),
    }
  }
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, config: ApiConfig) -> Self {
    Self {
      store,
      config: Arc::new(config),
      metrics: Arc::new(ApiMetrics::default()),
      ingest: None,
    }
  }

  pub fn with_ingest_stats(mut self, stats: Arc<IngestStats>) -> Self {
    self.ingest = Some(stats);
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Body of every paged listing: total match count, handler time in seconds,
/// and the requested page.
#[derive(Debug, Serialize)]
pub struct Listing<T> {
  pub count:   u64,
  pub elapsed: f64,
  pub data:    Vec<T>,
}

impl<T> Listing<T> {
  fn new(page: Paged<T>, start: Instant) -> Self {
    Self { count: page.count, elapsed: start.elapsed().as_secs_f64(), data: page.items }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: TrackerStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let api_metrics = Arc::clone(&state.metrics);
  Router::new()
    .route("/payloads", get(payloads::list::<S>))
    .route("/payloads/{request_id}", get(payloads::timeline::<S>))
    .route("/payloads/{request_id}/kibanaLink", get(kibana::handler::<S>))
    .route("/statuses", get(statuses::list::<S>))
    .route("/health", get(health::<S>))
    .route("/metrics", get(metrics::handler::<S>))
    .layer(middleware::from_fn_with_state(api_metrics, metrics::track))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// `GET /health`
async fn health<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
  S: TrackerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  state.store.ping().await.map_err(ApiError::store)?;
  Ok(Json(json!({ "status": "ok" })))
}
