//! Ingestion counters. Every drop is counted here as well as logged.

use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use serde::Serialize;
use tracker_core::RejectKind;

#[derive(Debug, Default)]
pub struct IngestStats {
  consumed:            AtomicU64,
  processed:           AtomicU64,
  decode_errors:       AtomicU64,
  invalid_request_ids: AtomicU64,
  timestamp_errors:    AtomicU64,
  process_errors:      AtomicU64,
  process_micros:      AtomicU64,
}

/// A point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
  pub consumed:            u64,
  pub processed:           u64,
  pub decode_errors:       u64,
  pub invalid_request_ids: u64,
  pub timestamp_errors:    u64,
  pub process_errors:      u64,
  /// Cumulative time spent in successful ingests.
  pub process_micros:      u64,
}

impl IngestStats {
  pub fn record_consumed(&self) { self.consumed.fetch_add(1, Ordering::Relaxed); }

  pub fn record_processed(&self, elapsed: Duration) {
    self.processed.fetch_add(1, Ordering::Relaxed);
    let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
    self.process_micros.fetch_add(micros, Ordering::Relaxed);
  }

  pub fn record_rejection(&self, kind: RejectKind) {
    let counter = match kind {
      RejectKind::Decode => &self.decode_errors,
      RejectKind::InvalidIdentifier => &self.invalid_request_ids,
      RejectKind::Timestamp => &self.timestamp_errors,
    };
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub fn record_process_error(&self) { self.process_errors.fetch_add(1, Ordering::Relaxed); }

  pub fn snapshot(&self) -> StatsSnapshot {
    StatsSnapshot {
      consumed:            self.consumed.load(Ordering::Relaxed),
      processed:           self.processed.load(Ordering::Relaxed),
      decode_errors:       self.decode_errors.load(Ordering::Relaxed),
      invalid_request_ids: self.invalid_request_ids.load(Ordering::Relaxed),
      timestamp_errors:    self.timestamp_errors.load(Ordering::Relaxed),
      process_errors:      self.process_errors.load(Ordering::Relaxed),
      process_micros:      self.process_micros.load(Ordering::Relaxed),
    }
  }
}
