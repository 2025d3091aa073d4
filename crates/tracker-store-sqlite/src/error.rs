//! Error type for `tracker-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A dimension name that is blank after trimming.
  #[error("blank {0} name")]
  BlankDimension(tracker_core::dimension::Dimension),

  #[error("request id is blank")]
  BlankRequestId,

  #[error("status event key is blank")]
  BlankEventKey,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
