//! The inbound status message as it arrives on the wire (JSON).

use serde::{Deserialize, Serialize};

/// One status report from a service about a payload.
///
/// `service`, `status` and `date` are mandatory; a message lacking them fails
/// to decode. `request_id` is optional at this layer so that its absence is
/// reported as an identifier problem rather than a decode problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
  pub service:      String,
  #[serde(default)]
  pub source:       Option<String>,
  #[serde(default)]
  pub account:      Option<String>,
  #[serde(default)]
  pub org_id:       Option<String>,
  #[serde(default)]
  pub inventory_id: Option<String>,
  #[serde(default)]
  pub system_id:    Option<String>,
  #[serde(default)]
  pub request_id:   Option<String>,
  pub status:       String,
  #[serde(default)]
  pub status_msg:   Option<String>,
  pub date:         String,
}

impl StatusMessage {
  pub fn from_slice(raw: &[u8]) -> crate::Result<Self> {
    Ok(serde_json::from_slice(raw)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_full_message() {
    let raw = br#"{
      "service": "puptoo", "source": "inventory", "account": "0001",
      "org_id": "42", "inventory_id": "inv", "system_id": "sys",
      "request_id": "abc", "status": "received", "status_msg": "ok",
      "date": "2021-08-04T07:45:26.371Z"
    }"#;
    let msg = StatusMessage::from_slice(raw).unwrap();
    assert_eq!(msg.service, "puptoo");
    assert_eq!(msg.source.as_deref(), Some("inventory"));
    assert_eq!(msg.org_id.as_deref(), Some("42"));
    assert_eq!(msg.status_msg.as_deref(), Some("ok"));
  }

  #[test]
  fn optional_fields_default_to_none() {
    let raw = br#"{"service":"s","request_id":"r","status":"x","date":"2021-08-04T07:45:26Z"}"#;
    let msg = StatusMessage::from_slice(raw).unwrap();
    assert_eq!(msg.source, None);
    assert_eq!(msg.account, None);
    assert_eq!(msg.status_msg, None);
  }

  #[test]
  fn missing_service_fails_to_decode() {
    let raw = br#"{"request_id":"r","status":"x","date":"2021-08-04T07:45:26Z"}"#;
    let err = StatusMessage::from_slice(raw).unwrap_err();
    assert!(matches!(err, crate::Error::Decode(_)));
  }

  #[test]
  fn garbage_fails_to_decode() {
    assert!(StatusMessage::from_slice(b"not json").is_err());
  }
}
