//! The `TrackerStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tracker-store-sqlite`).
//! The ingestion pipeline and the query API depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  dimension::{Dimension, DimensionId},
  payload::{NewPayload, Payload, PayloadId},
  status::{NewPayloadStatus, PayloadStatus, TimelineEntry},
};

// ─── Query types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
  Asc,
  #[default]
  Desc,
}

/// Half-open and closed bounds on a timestamp column; every bound is optional
/// and they combine with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
  pub lt:  Option<DateTime<Utc>>,
  pub lte: Option<DateTime<Utc>>,
  pub gt:  Option<DateTime<Utc>>,
  pub gte: Option<DateTime<Utc>>,
}

impl TimeRange {
  pub fn is_unbounded(&self) -> bool {
    self.lt.is_none() && self.lte.is_none() && self.gt.is_none() && self.gte.is_none()
  }
}

/// Zero-based page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub page:      u32,
  pub page_size: u32,
}

impl Default for Page {
  fn default() -> Self { Self { page: 0, page_size: 10 } }
}

impl Page {
  pub fn offset(&self) -> u64 { u64::from(self.page) * u64::from(self.page_size) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSort {
  Account,
  OrgId,
  InventoryId,
  SystemId,
  #[default]
  CreatedAt,
}

/// Parameters for [`TrackerStore::list_payloads`].
#[derive(Debug, Clone, Default)]
pub struct PayloadQuery {
  pub account:      Option<String>,
  pub org_id:       Option<String>,
  pub inventory_id: Option<String>,
  pub system_id:    Option<String>,
  pub created_at:   TimeRange,
  pub sort_by:      PayloadSort,
  pub sort_dir:     SortDir,
  pub page:         Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineSort {
  Service,
  Source,
  StatusMsg,
  #[default]
  Date,
  CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSort {
  Service,
  Source,
  RequestId,
  Status,
  StatusMsg,
  #[default]
  Date,
  CreatedAt,
}

/// Parameters for [`TrackerStore::list_statuses`].
#[derive(Debug, Clone, Default)]
pub struct StatusQuery {
  pub service:    Option<String>,
  pub source:     Option<String>,
  pub status:     Option<String>,
  pub status_msg: Option<String>,
  pub date:       TimeRange,
  pub created_at: TimeRange,
  pub sort_by:    StatusSort,
  pub sort_dir:   SortDir,
  pub page:       Page,
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
  pub count: u64,
  pub items: Vec<T>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a payload-tracker storage backend.
///
/// Writes are additive only: dimensions are get-or-create, payloads are
/// upserted without ever blanking an attribute, and status rows are
/// append-only. Every write must be a single atomic operation so that several
/// consumers may share one backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TrackerStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Return the id for `name` in `dimension`, creating the row if it does not
  /// exist. `name` is expected to be canonical already; implementations
  /// lower-case it again so the namespace stays case-insensitive.
  fn resolve_dimension<'a>(
    &'a self,
    dimension: Dimension,
    name: &'a str,
  ) -> impl Future<Output = Result<DimensionId, Self::Error>> + Send + 'a;

  /// Insert the payload, or on request-id conflict fill in only the identity
  /// fields that are present in `payload`. Returns the stable payload id.
  fn upsert_payload(
    &self,
    payload: NewPayload,
  ) -> impl Future<Output = Result<PayloadId, Self::Error>> + Send + '_;

  /// Append one status row. `created_at` is set by the store. Idempotent on
  /// `event_key`: a repeated insert returns the existing row unchanged.
  fn insert_status(
    &self,
    status: NewPayloadStatus,
  ) -> impl Future<Output = Result<PayloadStatus, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Cheap liveness check.
  fn ping(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_payload<'a>(
    &'a self,
    request_id: &'a str,
  ) -> impl Future<Output = Result<Option<Payload>, Self::Error>> + Send + 'a;

  fn list_payloads<'a>(
    &'a self,
    query: &'a PayloadQuery,
  ) -> impl Future<Output = Result<Paged<Payload>, Self::Error>> + Send + 'a;

  /// Every status event for `request_id`, joined with dimension names.
  fn get_timeline<'a>(
    &'a self,
    request_id: &'a str,
    sort_by: TimelineSort,
    sort_dir: SortDir,
  ) -> impl Future<Output = Result<Vec<TimelineEntry>, Self::Error>> + Send + 'a;

  fn list_statuses<'a>(
    &'a self,
    query: &'a StatusQuery,
  ) -> impl Future<Output = Result<Paged<TimelineEntry>, Self::Error>> + Send + 'a;
}
