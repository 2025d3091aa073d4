//! Ingestion side of the payload tracker.
//!
//! [`Pipeline`] turns one raw status message into at most one payload upsert,
//! up to three dimension get-or-creates and exactly one status row. The
//! [`EventWriter`] retries the final insert under a [`RetryPolicy`];
//! [`consume_lines`] drives the pipeline from a line-oriented source.

mod consumer;
mod error;
mod pipeline;
mod retry;
mod stats;
mod writer;

pub use consumer::consume_lines;
pub use error::{DeadlineExceeded, IngestError, Stage};
pub use pipeline::Pipeline;
pub use retry::{Attempt, Exhausted, RetryPolicy};
pub use stats::{IngestStats, StatsSnapshot};
pub use writer::EventWriter;
