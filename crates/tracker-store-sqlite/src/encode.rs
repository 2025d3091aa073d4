//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (nanosecond
//! precision, `Z` suffix) so that lexical order matches chronological order
//! and range filters can compare strings directly.

use chrono::{DateTime, SecondsFormat, Utc};
use tracker_core::{
  payload::Payload,
  status::TimelineEntry,
  store::SortDir,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── SortDir ─────────────────────────────────────────────────────────────────

pub fn encode_sort_dir(dir: SortDir) -> &'static str {
  match dir {
    SortDir::Asc => "ASC",
    SortDir::Desc => "DESC",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `payloads` row.
pub struct RawPayload {
  pub id:           i64,
  pub request_id:   String,
  pub account:      Option<String>,
  pub org_id:       Option<String>,
  pub inventory_id: Option<String>,
  pub system_id:    Option<String>,
  pub created_at:   String,
}

impl RawPayload {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      request_id:   row.get(1)?,
      account:      row.get(2)?,
      org_id:       row.get(3)?,
      inventory_id: row.get(4)?,
      system_id:    row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_payload(self) -> Result<Payload> {
    Ok(Payload {
      id:           self.id,
      request_id:   self.request_id,
      account:      self.account,
      org_id:       self.org_id,
      inventory_id: self.inventory_id,
      system_id:    self.system_id,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `payload_statuses` row joined with its payload and
/// dimension names. Column order matches [`crate::store`]'s timeline select.
pub struct RawTimelineEntry {
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
  pub date:         String,
  pub created_at:   String,
}

impl RawTimelineEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      payload_id:   row.get(1)?,
      request_id:   row.get(2)?,
      account:      row.get(3)?,
      org_id:       row.get(4)?,
      inventory_id: row.get(5)?,
      system_id:    row.get(6)?,
      service:      row.get(7)?,
      source:       row.get(8)?,
      status:       row.get(9)?,
      status_msg:   row.get(10)?,
      date:         row.get(11)?,
      created_at:   row.get(12)?,
    })
  }

  pub fn into_entry(self) -> Result<TimelineEntry> {
    Ok(TimelineEntry {
      id:           self.id,
      payload_id:   self.payload_id,
      request_id:   self.request_id,
      account:      self.account,
      org_id:       self.org_id,
      inventory_id: self.inventory_id,
      system_id:    self.system_id,
      service:      self.service,
      source:       self.source,
      status:       self.status,
      status_msg:   self.status_msg,
      date:         decode_dt(&self.date)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
