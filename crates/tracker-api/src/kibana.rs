//! `GET /payloads/{request_id}/kibanaLink`: a Kibana Discover URL that
//! searches the log index for one request id, optionally narrowed to a
//! service. Pure URL construction; the store is not consulted.

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tracker_core::store::TrackerStore;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Where the log dashboard lives and how its documents are keyed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KibanaConfig {
  /// Base Discover URL. Without one the link endpoint answers 404.
  pub dashboard_url: Option<String>,
  pub index:         String,
  /// Document field holding the service name.
  pub service_field: String,
}

impl Default for KibanaConfig {
  fn default() -> Self {
    Self { dashboard_url: None, index: String::new(), service_field: "app".to_owned() }
  }
}

/// Build the Discover URL for the last 24 hours of `request_id` logs.
pub fn kibana_url(
  dashboard_url: &str,
  cfg: &KibanaConfig,
  request_id: &str,
  service: Option<&str>,
) -> String {
  let mut query = format!("request_id:{request_id}");
  if let Some(service) = service {
    query.push_str(&format!(" AND {}:{service}", cfg.service_field));
  }
  format!(
    "{dashboard_url}?_g=(filters:!(),refreshInterval:(pause:!t,value:0),time:(from:now-24h,to:now))\
     &_a=(columns:!(_source),filters:!(),index:'{index}',interval:auto,\
     query:(language:lucene,query:'{query}'),sort:!('@timestamp',desc))",
    index = cfg.index,
  )
}

#[derive(Debug, Deserialize, Default)]
pub struct KibanaParams {
  pub service: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KibanaLink {
  pub url: String,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(request_id): Path<String>,
  params: Result<Query<KibanaParams>, QueryRejection>,
) -> Result<Json<KibanaLink>, ApiError>
where
  S: TrackerStore,
{
  let Query(params) = params?;

  if Uuid::try_parse(&request_id).is_err() {
    state.metrics.record_invalid_request_id();
    return Err(ApiError::BadRequest(format!("{request_id} is not a valid UUID")));
  }

  let cfg = &state.config.kibana;
  let dashboard_url = cfg
    .dashboard_url
    .as_deref()
    .ok_or_else(|| ApiError::NotFound("kibana dashboard is not configured".to_owned()))?;

  let service = params.service.as_deref().filter(|s| !s.trim().is_empty());
  let url = kibana_url(dashboard_url, cfg, &request_id, service);
  debug!(%url, "generated kibana link");
  Ok(Json(KibanaLink { url }))
}
