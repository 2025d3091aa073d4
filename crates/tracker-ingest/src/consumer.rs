//! Line-oriented consumer loop.
//!
//! Reads one message per line from any async reader and runs the pipeline to
//! completion before reading the next. Lines are handed over as raw bytes, so
//! a body that is not UTF-8 is dropped as a decode error like any other bad
//! message. Per-message failures never stop the loop; only EOF, a shutdown
//! signal or a reader error do.

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};
use tracing::{debug, info};
use tracker_core::store::TrackerStore;

use crate::{Pipeline, StatsSnapshot};

pub async fn consume_lines<S, R, F>(
  pipeline: &Pipeline<S>,
  reader: R,
  shutdown: F,
) -> std::io::Result<StatsSnapshot>
where
  S: TrackerStore,
  R: AsyncBufRead + Unpin,
  F: Future<Output = ()>,
{
  let mut lines = reader.split(b'\n');
  tokio::pin!(shutdown);

  loop {
    tokio::select! {
      biased;
      _ = &mut shutdown => {
        info!("shutdown requested; stopping consumer");
        break;
      }
      line = lines.next_segment() => {
        let Some(line) = line? else {
          debug!("end of input");
          break;
        };
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        if line.trim_ascii().is_empty() {
          continue;
        }
        // Already logged and counted by the pipeline.
        if let Err(e) = pipeline.ingest(line).await {
          debug!(rejected = e.is_rejection(), "message not ingested");
        }
      }
    }
  }

  let snapshot = pipeline.stats().snapshot();
  info!(
    consumed = snapshot.consumed,
    processed = snapshot.processed,
    decode_errors = snapshot.decode_errors,
    invalid_request_ids = snapshot.invalid_request_ids,
    timestamp_errors = snapshot.timestamp_errors,
    process_errors = snapshot.process_errors,
    "consumer stopped"
  );
  Ok(snapshot)
}
