//! Timeline Reconstructor: per-service and end-to-end durations.
//!
//! Input is every event recorded for one request id, in any order. Events are
//! bucketed by `"<service>:<source>"` (`undefined` when there is no source);
//! each bucket's duration is the span between its earliest and latest event.
//!
//! `total_time_in_services` is the *sum* of bucket spans, so two buckets that
//! overlap in wall-clock time are both counted in full. `total_time` is the
//! true end-to-end span across all events.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use crate::status::TimelineEntry;

pub const TOTAL_TIME: &str = "total_time";
pub const TOTAL_TIME_IN_SERVICES: &str = "total_time_in_services";
pub const UNDEFINED_SOURCE: &str = "undefined";

/// The fields the reconstructor needs from an event.
pub trait TimedEvent {
  fn service(&self) -> &str;
  fn source(&self) -> Option<&str>;
  fn date(&self) -> DateTime<Utc>;
}

impl TimedEvent for TimelineEntry {
  fn service(&self) -> &str { &self.service }

  fn source(&self) -> Option<&str> { self.source.as_deref() }

  fn date(&self) -> DateTime<Utc> { self.date }
}

#[derive(Debug, Clone, Copy)]
struct Span {
  min: DateTime<Utc>,
  max: DateTime<Utc>,
}

impl Span {
  fn new(at: DateTime<Utc>) -> Self { Self { min: at, max: at } }

  fn widen(&mut self, at: DateTime<Utc>) {
    self.min = self.min.min(at);
    self.max = self.max.max(at);
  }

  fn duration(&self) -> TimeDelta { self.max - self.min }
}

/// The bucket key for an event.
pub fn bucket_key(service: &str, source: Option<&str>) -> String {
  let source = source.filter(|s| !s.is_empty()).unwrap_or(UNDEFINED_SOURCE);
  format!("{service}:{source}")
}

/// Compute raw durations. Empty input yields an empty map; callers map that
/// to "not found".
pub fn span_durations<'a, E, I>(events: I) -> BTreeMap<String, TimeDelta>
where
  E: TimedEvent + 'a,
  I: IntoIterator<Item = &'a E>,
{
  let mut buckets: BTreeMap<String, Span> = BTreeMap::new();
  let mut overall: Option<Span> = None;

  for event in events {
    let at = event.date();
    buckets
      .entry(bucket_key(event.service(), event.source()))
      .and_modify(|span| span.widen(at))
      .or_insert_with(|| Span::new(at));
    match overall.as_mut() {
      Some(span) => span.widen(at),
      None => overall = Some(Span::new(at)),
    }
  }

  let Some(overall) = overall else {
    return BTreeMap::new();
  };

  let mut durations: BTreeMap<String, TimeDelta> = buckets
    .into_iter()
    .map(|(key, span)| (key, span.duration()))
    .collect();

  let in_services = durations
    .values()
    .fold(TimeDelta::zero(), |acc, d| acc.checked_add(d).unwrap_or(TimeDelta::MAX));
  durations.insert(TOTAL_TIME_IN_SERVICES.to_owned(), in_services);
  durations.insert(TOTAL_TIME.to_owned(), overall.duration());
  durations
}

/// Compute durations formatted as `HH:MM:SS.ffffff`.
pub fn compute_durations<'a, E, I>(events: I) -> BTreeMap<String, String>
where
  E: TimedEvent + 'a,
  I: IntoIterator<Item = &'a E>,
{
  span_durations(events)
    .into_iter()
    .map(|(key, d)| (key, format_duration(d)))
    .collect()
}

/// Format a duration as `HH:MM:SS.ffffff`, rounded to the microsecond. Hours
/// are not wrapped at 24.
pub fn format_duration(d: TimeDelta) -> String {
  // Spans between valid event dates can exceed the i64 nanosecond range.
  let nanos = i128::from(d.num_seconds()) * 1_000_000_000 + i128::from(d.subsec_nanos());
  let sign = if nanos < 0 { "-" } else { "" };
  let micros = (nanos.abs() + 500) / 1_000;

  let hours = micros / 3_600_000_000;
  let minutes = micros / 60_000_000 % 60;
  let seconds = micros / 1_000_000 % 60;
  let frac = micros % 1_000_000;
  format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{frac:06}")
}
