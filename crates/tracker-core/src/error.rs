//! Error types for `tracker-core`.

use thiserror::Error;

/// Why an inbound message was rejected before touching storage.
#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed message body: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("required field {0:?} is blank")]
  MissingField(&'static str),

  #[error("invalid request id {request_id:?}: {reason}")]
  InvalidIdentifier {
    request_id: Option<String>,
    reason:     String,
  },

  #[error("unparseable event date {value:?}: {reason}")]
  Timestamp { value: String, reason: String },
}

/// Coarse classification of a rejection, used for counting drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
  Decode,
  InvalidIdentifier,
  Timestamp,
}

impl Error {
  pub fn kind(&self) -> RejectKind {
    match self {
      Self::Decode(_) | Self::MissingField(_) => RejectKind::Decode,
      Self::InvalidIdentifier { .. } => RejectKind::InvalidIdentifier,
      Self::Timestamp { .. } => RejectKind::Timestamp,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
