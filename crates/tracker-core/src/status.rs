//! Status events: one append-only row per accepted inbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{dimension::DimensionId, payload::PayloadId};

/// A persisted status event. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadStatus {
  pub id:         i64,
  pub event_key:  String,
  pub payload_id: PayloadId,
  pub service_id: DimensionId,
  /// `None` when the event carried no source; no sentinel row is used.
  pub source_id:  Option<DimensionId>,
  pub status_id:  DimensionId,
  pub status_msg: Option<String>,
  /// Logical event time carried in the message.
  pub date:       DateTime<Utc>,
  /// Ingestion time; set by the store.
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::TrackerStore::insert_status`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayloadStatus {
  /// Unique per accepted message. Inserting the same key twice yields the
  /// row written first.
  pub event_key:  String,
  pub payload_id: PayloadId,
  pub service_id: DimensionId,
  pub source_id:  Option<DimensionId>,
  pub status_id:  DimensionId,
  pub status_msg: Option<String>,
  pub date:       DateTime<Utc>,
}

/// A status event joined with its payload and dimension names; the read
/// model behind timelines and status listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub id:           i64,
  pub payload_id:   i64,
  pub request_id:   String,
  pub account:      Option<String>,
  pub org_id:       Option<String>,
  pub inventory_id: Option<String>,
  pub system_id:    Option<String>,
  pub service:      String,
  pub source:       Option<String>,
  pub status:       String,
  pub status_msg:   Option<String>,
  pub date:         DateTime<Utc>,
  pub created_at:   DateTime<Utc>,
}
