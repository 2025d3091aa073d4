//! Event Normalizer: validates and canonicalises one inbound message.
//!
//! This is a pure function of the raw bytes plus the configured identifier
//! policy. Each step is a hard gate: the first failure rejects the message and
//! nothing downstream runs.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::{
  Error, Result, dimension::canonical_name, message::StatusMessage,
  payload::PayloadIdentity,
};

/// A message that passed every gate, ready for dimension resolution and
/// persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedEvent {
  pub request_id: String,
  pub service:    String,
  pub source:     Option<String>,
  pub status:     String,
  pub status_msg: Option<String>,
  pub date:       DateTime<Utc>,
  pub identity:   PayloadIdentity,
}

/// Validates request identifiers and canonicalises messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
  /// When set, request ids must be exactly this many bytes long.
  expected_id_len: Option<usize>,
}

impl Normalizer {
  pub fn new(expected_id_len: Option<usize>) -> Self { Self { expected_id_len } }

  /// Build from a configured length where `0` disables the check.
  pub fn with_length(len: usize) -> Self {
    Self::new((len != 0).then_some(len))
  }

  pub fn expected_id_len(&self) -> Option<usize> { self.expected_id_len }

  /// Decode and normalise a raw message body.
  pub fn normalize(&self, raw: &[u8]) -> Result<NormalizedEvent> {
    let msg = StatusMessage::from_slice(raw)?;
    self.normalize_message(msg)
  }

  /// Normalise an already-decoded message.
  pub fn normalize_message(&self, msg: StatusMessage) -> Result<NormalizedEvent> {
    let request_id = self.validate_request_id(msg.request_id)?;
    let date = parse_event_date(&msg.date)?;

    let service =
      canonical_name(&msg.service).ok_or(Error::MissingField("service"))?;
    let status =
      canonical_name(&msg.status).ok_or(Error::MissingField("status"))?;
    let source = msg.source.as_deref().and_then(canonical_name);
    let status_msg = msg.status_msg.filter(|m| !m.trim().is_empty());

    Ok(NormalizedEvent {
      request_id,
      service,
      source,
      status,
      status_msg,
      date,
      identity: PayloadIdentity::new(
        msg.account,
        msg.org_id,
        msg.inventory_id,
        msg.system_id,
      ),
    })
  }

  fn validate_request_id(&self, request_id: Option<String>) -> Result<String> {
    let id = match request_id {
      Some(id) if !id.is_empty() => id,
      other => {
        return Err(Error::InvalidIdentifier {
          request_id: other,
          reason:     "request id is missing".into(),
        });
      }
    };

    if let Some(expected) = self.expected_id_len
      && id.len() != expected
    {
      let reason = format!("expected length {expected}, got {}", id.len());
      return Err(Error::InvalidIdentifier { request_id: Some(id), reason });
    }

    Ok(id)
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// Parse an event date as RFC 3339, tolerating a space instead of `T` and a
/// missing timezone designator (taken as UTC). The UTC result must fall in
/// years 0000 through 9999.
pub fn parse_event_date(raw: &str) -> Result<DateTime<Utc>> {
  let canonical = raw.split_whitespace().collect::<Vec<_>>().join("T");

  let parsed = DateTime::parse_from_rfc3339(&canonical).or_else(|err| {
    if canonical.ends_with(['Z', 'z']) {
      Err(err)
    } else {
      DateTime::parse_from_rfc3339(&format!("{canonical}Z"))
    }
  });

  let dt = parsed
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp {
      value:  raw.to_owned(),
      reason: e.to_string(),
    })?;

  // An offset can carry a four-digit local year past the four-digit range in
  // UTC, which the store cannot write back as RFC 3339.
  if !(0..=9999).contains(&dt.year()) {
    return Err(Error::Timestamp {
      value:  raw.to_owned(),
      reason: format!("UTC year {} is outside 0000-9999", dt.year()),
    });
  }
  Ok(dt)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;
  use crate::RejectKind;

  fn message(request_id: &str) -> String {
    format!(
      r#"{{"service":" Puptoo ","source":"Inventory","request_id":"{request_id}",
          "status":"Received","status_msg":"hello","account":"0001","org_id":"",
          "date":"2021-08-04T07:45:26.371Z"}}"#
    )
  }

  const ID_32: &str = "0123456789abcdef0123456789abcdef";
  const ID_36: &str = "01234567-89ab-cdef-0123-456789abcdef";

  #[test]
  fn canonicalises_names_and_identity() {
    let n = Normalizer::with_length(32);
    let ev = n.normalize(message(ID_32).as_bytes()).unwrap();

    assert_eq!(ev.request_id, ID_32);
    assert_eq!(ev.service, "puptoo");
    assert_eq!(ev.source.as_deref(), Some("inventory"));
    assert_eq!(ev.status, "received");
    assert_eq!(ev.status_msg.as_deref(), Some("hello"));
    assert_eq!(ev.identity.account.as_deref(), Some("0001"));
    assert_eq!(ev.identity.org_id, None);
    assert_eq!(
      ev.date,
      Utc.with_ymd_and_hms(2021, 8, 4, 7, 45, 26).unwrap()
        + chrono::TimeDelta::milliseconds(371)
    );
  }

  #[test]
  fn length_gate_rejects_dashed_uuid() {
    let n = Normalizer::with_length(32);
    let err = n.normalize(message(ID_36).as_bytes()).unwrap_err();
    assert_eq!(err.kind(), RejectKind::InvalidIdentifier);
  }

  #[test]
  fn length_gate_disabled_accepts_any_length() {
    let n = Normalizer::with_length(0);
    assert!(n.normalize(message(ID_36).as_bytes()).is_ok());
  }

  #[test]
  fn missing_request_id_is_invalid_identifier() {
    let n = Normalizer::with_length(0);
    let raw = br#"{"service":"a","status":"b","date":"2021-08-04T07:45:26Z"}"#;
    let err = n.normalize(raw).unwrap_err();
    assert_eq!(err.kind(), RejectKind::InvalidIdentifier);

    let raw = br#"{"service":"a","status":"b","request_id":"","date":"2021-08-04T07:45:26Z"}"#;
    assert_eq!(n.normalize(raw).unwrap_err().kind(), RejectKind::InvalidIdentifier);
  }

  #[test]
  fn malformed_body_is_decode_error() {
    let n = Normalizer::default();
    let err = n.normalize(b"{\"service\": 12").unwrap_err();
    assert_eq!(err.kind(), RejectKind::Decode);
  }

  #[test]
  fn blank_service_is_decode_error() {
    let n = Normalizer::default();
    let raw = br#"{"service":"  ","status":"b","request_id":"r","date":"2021-08-04T07:45:26Z"}"#;
    let err = n.normalize(raw).unwrap_err();
    assert!(matches!(err, Error::MissingField("service")));
    assert_eq!(err.kind(), RejectKind::Decode);
  }

  #[test]
  fn blank_source_is_absent() {
    let n = Normalizer::default();
    let raw = br#"{"service":"a","source":"","status":"b","request_id":"r","date":"2021-08-04T07:45:26Z"}"#;
    assert_eq!(n.normalize(raw).unwrap().source, None);
  }

  #[test]
  fn bad_date_is_timestamp_error() {
    let n = Normalizer::default();
    let raw = br#"{"service":"a","status":"b","request_id":"r","date":"yesterday"}"#;
    assert_eq!(n.normalize(raw).unwrap_err().kind(), RejectKind::Timestamp);
  }

  #[test]
  fn date_without_designator_defaults_to_utc() {
    let expected = Utc.with_ymd_and_hms(2021, 8, 4, 7, 45, 26).unwrap();
    assert_eq!(parse_event_date("2021-08-04T07:45:26").unwrap(), expected);
    assert_eq!(parse_event_date("2021-08-04 07:45:26").unwrap(), expected);
    assert_eq!(parse_event_date("2021-08-04T07:45:26Z").unwrap(), expected);
  }

  #[test]
  fn explicit_offset_is_normalised_to_utc() {
    let expected = Utc.with_ymd_and_hms(2021, 8, 4, 5, 45, 26).unwrap();
    assert_eq!(parse_event_date("2021-08-04T07:45:26+02:00").unwrap(), expected);
  }

  #[test]
  fn fractional_seconds_without_designator() {
    let dt = parse_event_date("2021-08-04 07:45:26.371").unwrap();
    assert_eq!(dt.timestamp_subsec_millis(), 371);
  }

  #[test]
  fn dates_leaving_four_digit_utc_years_are_rejected() {
    let err = parse_event_date("9999-12-31T23:00:00-05:00").unwrap_err();
    assert!(matches!(err, Error::Timestamp { .. }));
    assert!(parse_event_date("0000-01-01T00:30:00+01:00").is_err());

    let edge = parse_event_date("9999-12-31T23:59:59Z").unwrap();
    assert_eq!(edge.year(), 9999);
  }
}
