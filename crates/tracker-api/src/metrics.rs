//! Request counters for the query API and the `GET /metrics` read-out.
//!
//! When the API shares a process with a consumer, the consumer's
//! [`IngestStats`] are reported alongside.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
  },
  time::Duration,
};

use axum::{
  Json,
  extract::{Request, State},
  middleware::Next,
  response::Response,
};
use serde::Serialize;
use tracker_core::store::TrackerStore;
use tracker_ingest::{IngestStats, StatsSnapshot};

use crate::AppState;

#[derive(Debug, Default)]
pub struct ApiMetrics {
  requests:            AtomicU64,
  invalid_request_ids: AtomicU64,
  db_calls:            AtomicU64,
  db_micros:           AtomicU64,
  responses:           Mutex<BTreeMap<u16, u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiMetricsSnapshot {
  pub requests:            u64,
  pub invalid_request_ids: u64,
  pub db_calls:            u64,
  /// Cumulative time spent waiting on the store.
  pub db_seconds:          f64,
  /// Response count keyed by HTTP status code.
  pub responses:           BTreeMap<u16, u64>,
}

impl ApiMetrics {
  pub fn record_request(&self) { self.requests.fetch_add(1, Ordering::Relaxed); }

  pub fn record_invalid_request_id(&self) {
    self.invalid_request_ids.fetch_add(1, Ordering::Relaxed);
  }

  pub fn observe_db(&self, elapsed: Duration) {
    let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    self.db_calls.fetch_add(1, Ordering::Relaxed);
    self.db_micros.fetch_add(micros, Ordering::Relaxed);
  }

  pub fn record_response(&self, status: u16) {
    let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
    *responses.entry(status).or_default() += 1;
  }

  pub fn snapshot(&self) -> ApiMetricsSnapshot {
    ApiMetricsSnapshot {
      requests:            self.requests.load(Ordering::Relaxed),
      invalid_request_ids: self.invalid_request_ids.load(Ordering::Relaxed),
      db_calls:            self.db_calls.load(Ordering::Relaxed),
      db_seconds:          self.db_micros.load(Ordering::Relaxed) as f64 / 1e6,
      responses:           self
        .responses
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone(),
    }
  }
}

/// Middleware counting every request and its response status.
pub async fn track(State(metrics): State<Arc<ApiMetrics>>, req: Request, next: Next) -> Response {
  metrics.record_request();
  let response = next.run(req).await;
  metrics.record_response(response.status().as_u16());
  response
}

#[derive(Debug, Serialize)]
pub struct MetricsBody {
  pub api:    ApiMetricsSnapshot,
  /// `null` unless a consumer runs in this process.
  pub ingest: Option<StatsSnapshot>,
}

/// `GET /metrics`
pub async fn handler<S>(State(state): State<AppState<S>>) -> Json<MetricsBody>
where
  S: TrackerStore,
{
  Json(MetricsBody {
    api:    state.metrics.snapshot(),
    ingest: state.ingest.as_deref().map(IngestStats::snapshot),
  })
}
