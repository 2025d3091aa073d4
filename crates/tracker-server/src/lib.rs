//! Configuration for the `payload-tracker` binary.
//!
//! Every key has a default, so an empty config file (or none at all) yields
//! a working local setup.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use tracker_api::{ApiConfig, KibanaConfig};
use tracker_core::normalize::Normalizer;
use tracker_ingest::RetryPolicy;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `TRACKER_*`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Expected byte length of every request id; `0` accepts any length.
  pub request_id_length: usize,
  pub retry:             RetryConfig,
  pub kibana:            KibanaConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              8080,
      store_path:        PathBuf::from("payload-tracker.db"),
      request_id_length: 32,
      retry:             RetryConfig::default(),
      kibana:            KibanaConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn normalizer(&self) -> Normalizer { Normalizer::with_length(self.request_id_length) }

  pub fn api_config(&self) -> ApiConfig { ApiConfig { kibana: self.kibana.clone() } }
}

/// Status write retry settings, in milliseconds.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
  pub max_attempts:       u32,
  pub base_delay_ms:      u64,
  pub max_delay_ms:       u64,
  /// `0` disables the per-attempt deadline.
  pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self { max_attempts: 3, base_delay_ms: 25, max_delay_ms: 1000, attempt_timeout_ms: 5000 }
  }
}

impl From<RetryConfig> for RetryPolicy {
  fn from(c: RetryConfig) -> Self {
    RetryPolicy {
      max_attempts:    c.max_attempts.max(1),
      base_delay:      Duration::from_millis(c.base_delay_ms),
      max_delay:       Duration::from_millis(c.max_delay_ms.max(c.base_delay_ms)),
      attempt_timeout: (c.attempt_timeout_ms > 0)
        .then(|| Duration::from_millis(c.attempt_timeout_ms)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_retry_policy_defaults() {
    let policy = RetryPolicy::from(RetryConfig::default());
    let expected = RetryPolicy::default();
    assert_eq!(policy.max_attempts, expected.max_attempts);
    assert_eq!(policy.base_delay, expected.base_delay);
    assert_eq!(policy.max_delay, expected.max_delay);
    assert_eq!(policy.attempt_timeout, expected.attempt_timeout);
  }

  #[test]
  fn zero_timeout_disables_deadline() {
    let policy = RetryPolicy::from(RetryConfig { attempt_timeout_ms: 0, ..Default::default() });
    assert_eq!(policy.attempt_timeout, None);
  }

  #[test]
  fn zero_attempts_still_tries_once() {
    let policy = RetryPolicy::from(RetryConfig { max_attempts: 0, ..Default::default() });
    assert_eq!(policy.max_attempts, 1);
  }

  #[test]
  fn partial_config_keeps_defaults() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "port": 9000,
      "retry": { "max_attempts": 5 }
    }))
    .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.retry.max_attempts, 5);
    assert_eq!(cfg.retry.base_delay_ms, 25);
    assert_eq!(cfg.address(), "127.0.0.1:9000");
  }

  #[test]
  fn zero_length_disables_id_gate() {
    let cfg = ServerConfig { request_id_length: 0, ..Default::default() };
    assert_eq!(cfg.normalizer().expected_id_len(), None);
    assert_eq!(ServerConfig::default().normalizer().expected_id_len(), Some(32));
  }

  #[test]
  fn kibana_section_reaches_api_config() {
    let cfg: ServerConfig = serde_json::from_value(serde_json::json!({
      "kibana": { "dashboard_url": "https://kibana.example.test", "index": "logs" }
    }))
    .unwrap();
    let api = cfg.api_config();
    assert_eq!(api.kibana.dashboard_url.as_deref(), Some("https://kibana.example.test"));
    assert_eq!(api.kibana.index, "logs");
    assert_eq!(api.kibana.service_field, "app");
  }
}
