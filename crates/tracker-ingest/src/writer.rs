//! Event Writer: persists a status row under the retry policy.

use std::sync::Arc;

use tracing::error;
use tracker_core::{
  status::{NewPayloadStatus, PayloadStatus},
  store::TrackerStore,
};

use crate::{
  DeadlineExceeded, IngestError, Stage,
  retry::{Attempt, RetryPolicy},
};

pub struct EventWriter<S> {
  store:  Arc<S>,
  policy: RetryPolicy,
}

impl<S> Clone for EventWriter<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

impl<S: TrackerStore> EventWriter<S> {
  pub fn new(store: Arc<S>, policy: RetryPolicy) -> Self { Self { store, policy } }

  pub fn policy(&self) -> &RetryPolicy { &self.policy }

  /// Insert `status`, retrying the identical insert on failure. The store
  /// dedupes on `event_key`, so an attempt that commits after its deadline
  /// and the retry that follows it leave a single row. The message is not
  /// re-enqueued when every attempt fails; the error is returned.
  pub async fn write(&self, status: NewPayloadStatus) -> Result<PayloadStatus, IngestError> {
    let result = self
      .policy
      .run("status write", || self.store.insert_status(status.clone()))
      .await;

    result.map_err(|exhausted| {
      error!(
        payload_id = status.payload_id,
        attempts = exhausted.attempts,
        "giving up on status write"
      );
      let source: Box<dyn std::error::Error + Send + Sync> = match exhausted.last {
        Attempt::Failed(e) => Box::new(e),
        Attempt::TimedOut(limit) => Box::new(DeadlineExceeded(limit)),
      };
      IngestError::Storage { stage: Stage::WriteStatus, attempts: exhausted.attempts, source }
    })
  }
}
