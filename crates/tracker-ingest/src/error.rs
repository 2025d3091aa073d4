//! Error type for `tracker-ingest`.

use std::{fmt, time::Duration};

use thiserror::Error;
use tracker_core::dimension::Dimension;

/// The storage step an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  UpsertPayload,
  ResolveDimension(Dimension),
  WriteStatus,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UpsertPayload => f.write_str("payload upsert"),
      Self::ResolveDimension(d) => write!(f, "{d} resolution"),
      Self::WriteStatus => f.write_str("status write"),
    }
  }
}

#[derive(Debug, Error)]
pub enum IngestError {
  /// The message failed validation; nothing was written.
  #[error("message rejected: {0}")]
  Rejected(#[from] tracker_core::Error),

  /// A store call failed or ran past its deadline. A timed-out status
  /// write may still commit in the background, at most once per event key.
  #[error("{stage} failed after {attempts} attempt(s): {source}")]
  Storage {
    stage:    Stage,
    attempts: u32,
    #[source]
    source:   Box<dyn std::error::Error + Send + Sync>,
  },
}

/// A single store call did not finish within the per-attempt deadline.
#[derive(Debug, Error)]
#[error("no response within {0:?}")]
pub struct DeadlineExceeded(pub Duration);

impl IngestError {
  pub fn is_rejection(&self) -> bool { matches!(self, Self::Rejected(_)) }

  /// Whether the last storage attempt timed out rather than failed.
  pub fn is_timeout(&self) -> bool {
    match self {
      Self::Storage { source, .. } => source.is::<DeadlineExceeded>(),
      Self::Rejected(_) => false,
    }
  }
}
