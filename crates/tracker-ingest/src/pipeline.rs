//! Ingestion Pipeline: validate, normalise, upsert, resolve, persist.
//!
//! Strictly sequential per message. A message that fails normalisation has no
//! side effects. A storage failure aborts only the current message; the
//! pipeline stays usable for the next one.

use std::{
  future::Future,
  sync::Arc,
  time::{Duration, Instant},
};

use tracing::{debug, error, warn};
use tracker_core::{
  dimension::{Dimension, DimensionId},
  normalize::{NormalizedEvent, Normalizer},
  payload::NewPayload,
  status::{NewPayloadStatus, PayloadStatus},
  store::TrackerStore,
};
use uuid::Uuid;

use crate::{DeadlineExceeded, EventWriter, IngestError, IngestStats, RetryPolicy, Stage};

pub struct Pipeline<S> {
  store:      Arc<S>,
  normalizer: Normalizer,
  writer:     EventWriter<S>,
  stats:      Arc<IngestStats>,
}

impl<S: TrackerStore> Pipeline<S> {
  pub fn new(store: Arc<S>, normalizer: Normalizer, policy: RetryPolicy) -> Self {
    Self {
      writer: EventWriter::new(Arc::clone(&store), policy),
      store,
      normalizer,
      stats: Arc::new(IngestStats::default()),
    }
  }

  pub fn stats(&self) -> &Arc<IngestStats> { &self.stats }

  pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

  /// Ingest one raw message. Every failure is logged and counted before it is
  /// returned, so callers may simply move on to the next message.
  pub async fn ingest(&self, raw: &[u8]) -> Result<PayloadStatus, IngestError> {
    let start = Instant::now();
    self.stats.record_consumed();

    let event = match self.normalizer.normalize(raw) {
      Ok(event) => event,
      Err(e) => {
        warn!(
          kind = ?e.kind(),
          error = %e,
          raw = %String::from_utf8_lossy(raw),
          "dropping status message"
        );
        self.stats.record_rejection(e.kind());
        return Err(e.into());
      }
    };

    match self.persist(&event).await {
      Ok(row) => {
        self.stats.record_processed(start.elapsed());
        debug!(
          request_id = %event.request_id,
          status_id = row.id,
          elapsed = ?start.elapsed(),
          "status recorded"
        );
        Ok(row)
      }
      Err(e) => {
        self.stats.record_process_error();
        error!(
          request_id = %event.request_id,
          error = %e,
          raw = %String::from_utf8_lossy(raw),
          "failed to process status message"
        );
        Err(e)
      }
    }
  }

  async fn persist(&self, event: &NormalizedEvent) -> Result<PayloadStatus, IngestError> {
    let payload_id = self
      .bounded(
        Stage::UpsertPayload,
        self.store.upsert_payload(NewPayload {
          request_id: event.request_id.clone(),
          identity:   event.identity.clone(),
          created_at: event.date,
        }),
      )
      .await?;

    let status_id = self.resolve(Dimension::Status, &event.status).await?;
    let service_id = self.resolve(Dimension::Service, &event.service).await?;
    let source_id = match event.source.as_deref() {
      Some(source) => Some(self.resolve(Dimension::Source, source).await?),
      None => None,
    };

    self
      .writer
      .write(NewPayloadStatus {
        event_key: Uuid::new_v4().simple().to_string(),
        payload_id,
        service_id,
        source_id,
        status_id,
        status_msg: event.status_msg.clone(),
        date: event.date,
      })
      .await
  }

  async fn resolve(&self, dimension: Dimension, name: &str) -> Result<DimensionId, IngestError> {
    self
      .bounded(
        Stage::ResolveDimension(dimension),
        self.store.resolve_dimension(dimension, name),
      )
      .await
  }

  /// Run a single store call under the per-attempt deadline, without retry.
  async fn bounded<T, Fut>(&self, stage: Stage, fut: Fut) -> Result<T, IngestError>
  where
    Fut: Future<Output = Result<T, S::Error>>,
  {
    let timeout: Option<Duration> = self.writer.policy().attempt_timeout;
    let result = match timeout {
      Some(limit) => tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| IngestError::Storage {
          stage,
          attempts: 1,
          source: Box::new(DeadlineExceeded(limit)),
        })?,
      None => fut.await,
    };
    result.map_err(|e| IngestError::Storage { stage, attempts: 1, source: Box::new(e) })
  }
}
