//! Handler for `GET /statuses`.
//!
//! Dimension filters match on the canonical (lower-case) name, so callers may
//! pass any casing.

use std::time::Instant;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracker_core::{
  dimension::canonical_name,
  status::TimelineEntry,
  store::{Page, SortDir, StatusQuery, StatusSort, TimeRange, TrackerStore},
};

use crate::{AppState, Listing, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct StatusParams {
  pub service:        Option<String>,
  pub source:         Option<String>,
  pub status:         Option<String>,
  pub status_msg:     Option<String>,
  pub date_lt:        Option<DateTime<Utc>>,
  pub date_lte:       Option<DateTime<Utc>>,
  pub date_gt:        Option<DateTime<Utc>>,
  pub date_gte:       Option<DateTime<Utc>>,
  pub created_at_lt:  Option<DateTime<Utc>>,
  pub created_at_lte: Option<DateTime<Utc>>,
  pub created_at_gt:  Option<DateTime<Utc>>,
  pub created_at_gte: Option<DateTime<Utc>>,
  #[serde(default)]
  pub sort_by:        StatusSort,
  #[serde(default)]
  pub sort_dir:       SortDir,
  pub page:           Option<u32>,
  pub page_size:      Option<u32>,
}

impl From<StatusParams> for StatusQuery {
  fn from(p: StatusParams) -> Self {
    let defaults = Page::default();
    StatusQuery {
      service:    p.service.as_deref().and_then(canonical_name),
      source:     p.source.as_deref().and_then(canonical_name),
      status:     p.status.as_deref().and_then(canonical_name),
      status_msg: p.status_msg,
      date:       TimeRange { lt: p.date_lt, lte: p.date_lte, gt: p.date_gt, gte: p.date_gte },
      created_at: TimeRange {
        lt:  p.created_at_lt,
        lte: p.created_at_lte,
        gt:  p.created_at_gt,
        gte: p.created_at_gte,
      },
      sort_by:    p.sort_by,
      sort_dir:   p.sort_dir,
      page:       Page {
        page:      p.page.unwrap_or(defaults.page),
        page_size: p.page_size.unwrap_or(defaults.page_size),
      },
    }
  }
}

/// `GET /statuses[?service=..][&date_gte=..][&sort_by=..][&page=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<StatusParams>, QueryRejection>,
) -> Result<Json<Listing<TimelineEntry>>, ApiError>
where
  S: TrackerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let start = Instant::now();
  let Query(params) = params?;
  let query = StatusQuery::from(params);

  let db_start = Instant::now();
  let page = state.store.list_statuses(&query).await;
  state.metrics.observe_db(db_start.elapsed());
  let page = page.map_err(ApiError::store)?;
  Ok(Json(Listing::new(page, start)))
}
