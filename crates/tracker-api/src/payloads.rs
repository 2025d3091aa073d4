//! Handlers for `/payloads` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/payloads` | Identity filters, `created_at_*` bounds, sort and paging |
//! | `GET`  | `/payloads/{request_id}` | Timeline plus durations; 404 if no events |

use std::{collections::BTreeMap, time::Instant};

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracker_core::{
  payload::Payload,
  status::TimelineEntry,
  store::{Page, PayloadQuery, PayloadSort, SortDir, TimeRange, TimelineSort, TrackerStore},
  timeline::compute_durations,
};

use crate::{AppState, Listing, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub account:        Option<String>,
  pub org_id:         Option<String>,
  pub inventory_id:   Option<String>,
  pub system_id:      Option<String>,
  pub created_at_lt:  Option<DateTime<Utc>>,
  pub created_at_lte: Option<DateTime<Utc>>,
  pub created_at_gt:  Option<DateTime<Utc>>,
  pub created_at_gte: Option<DateTime<Utc>>,
  #[serde(default)]
  pub sort_by:        PayloadSort,
  #[serde(default)]
  pub sort_dir:       SortDir,
  pub page:           Option<u32>,
  pub page_size:      Option<u32>,
}

impl From<ListParams> for PayloadQuery {
  fn from(p: ListParams) -> Self {
    let defaults = Page::default();
    PayloadQuery {
      account:      p.account,
      org_id:       p.org_id,
      inventory_id: p.inventory_id,
      system_id:    p.system_id,
      created_at:   TimeRange {
        lt:  p.created_at_lt,
        lte: p.created_at_lte,
        gt:  p.created_at_gt,
        gte: p.created_at_gte,
      },
      sort_by:      p.sort_by,
      sort_dir:     p.sort_dir,
      page:         Page {
        page:      p.page.unwrap_or(defaults.page),
        page_size: p.page_size.unwrap_or(defaults.page_size),
      },
    }
  }
}

/// `GET /payloads[?account=..][&created_at_gte=..][&sort_by=..][&page=..]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Listing<Payload>>, ApiError>
where
  S: TrackerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let start = Instant::now();
  let Query(params) = params?;
  let query = PayloadQuery::from(params);

  let db_start = Instant::now();
  let page = state.store.list_payloads(&query).await;
  state.metrics.observe_db(db_start.elapsed());
  let page = page.map_err(ApiError::store)?;
  Ok(Json(Listing::new(page, start)))
}

// ─── Timeline ─────────────────────────────────────────────────────────────────

/// How much of each timeline row to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
  /// Every column.
  #[default]
  Full,
  /// service, status, inventory_id, date, status_msg.
  Summary,
  /// service, status, date.
  Brief,
}

impl TryFrom<u8> for Verbosity {
  type Error = ApiError;

  fn try_from(level: u8) -> Result<Self, ApiError> {
    match level {
      0 => Ok(Verbosity::Full),
      1 => Ok(Verbosity::Summary),
      2 => Ok(Verbosity::Brief),
      other => Err(ApiError::BadRequest(format!(
        "verbosity must be one of 0, 1, 2 (got {other})"
      ))),
    }
  }
}

/// One timeline row, projected according to [`Verbosity`].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TimelineRow<'a> {
  Full(&'a TimelineEntry),
  Summary {
    service:      &'a str,
    status:       &'a str,
    inventory_id: Option<&'a str>,
    date:         DateTime<Utc>,
    status_msg:   Option<&'a str>,
  },
  Brief {
    service: &'a str,
    status:  &'a str,
    date:    DateTime<Utc>,
  },
}

impl<'a> TimelineRow<'a> {
  pub fn project(entry: &'a TimelineEntry, verbosity: Verbosity) -> Self {
    match verbosity {
      Verbosity::Full => TimelineRow::Full(entry),
      Verbosity::Summary => TimelineRow::Summary {
        service:      &entry.service,
        status:       &entry.status,
        inventory_id: entry.inventory_id.as_deref(),
        date:         entry.date,
        status_msg:   entry.status_msg.as_deref(),
      },
      Verbosity::Brief => TimelineRow::Brief {
        service: &entry.service,
        status:  &entry.status,
        date:    entry.date,
      },
    }
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct TimelineParams {
  #[serde(default)]
  pub sort_by:   TimelineSort,
  #[serde(default)]
  pub sort_dir:  SortDir,
  pub verbosity: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct PayloadTimeline<'a> {
  pub data:      Vec<TimelineRow<'a>>,
  pub durations: BTreeMap<String, String>,
}

/// `GET /payloads/{request_id}[?sort_by=..][&sort_dir=..][&verbosity=0|1|2]`
///
/// Durations are always computed over the complete rows, so a reduced
/// verbosity never changes the bucket keys.
pub async fn timeline<S>(
  State(state): State<AppState<S>>,
  Path(request_id): Path<String>,
  params: Result<Query<TimelineParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: TrackerStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let Query(params) = params?;
  let verbosity = params.verbosity.map(Verbosity::try_from).transpose()?.unwrap_or_default();

  let db_start = Instant::now();
  let entries = state
    .store
    .get_timeline(&request_id, params.sort_by, params.sort_dir)
    .await;
  state.metrics.observe_db(db_start.elapsed());
  let entries = entries.map_err(ApiError::store)?;
  if entries.is_empty() {
    return Err(ApiError::NotFound(format!("payload with id: {request_id} not found")));
  }

  let body = PayloadTimeline {
    data:      entries.iter().map(|e| TimelineRow::project(e, verbosity)).collect(),
    durations: compute_durations(&entries),
  };
  let value = serde_json::to_value(&body).map_err(ApiError::store)?;
  Ok(Json(value))
}
