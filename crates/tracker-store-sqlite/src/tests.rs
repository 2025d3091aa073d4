//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone as _, Utc};
use tracker_core::{
  dimension::Dimension,
  payload::{NewPayload, PayloadIdentity},
  status::NewPayloadStatus,
  store::{
    Page, PayloadQuery, PayloadSort, SortDir, StatusQuery, TimeRange,
    TimelineSort, TrackerStore,
  },
  timeline::compute_durations,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn request_id() -> String { Uuid::new_v4().simple().to_string() }

fn event_key() -> String { Uuid::new_v4().to_string() }

fn at(secs: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2021, 8, 4, 7, 45, 0).unwrap() + TimeDelta::seconds(secs)
}

fn new_payload(request_id: &str, identity: PayloadIdentity, created_at: DateTime<Utc>) -> NewPayload {
  NewPayload { request_id: request_id.to_owned(), identity, created_at }
}

fn identity(account: &str, org_id: &str) -> PayloadIdentity {
  PayloadIdentity::new(Some(account.into()), Some(org_id.into()), None, None)
}

/// Record one status row through the store, resolving dimensions inline.
async fn record(
  s: &SqliteStore,
  request_id: &str,
  service: &str,
  source: Option<&str>,
  status: &str,
  date: DateTime<Utc>,
) {
  let payload_id = s
    .upsert_payload(new_payload(request_id, PayloadIdentity::default(), date))
    .await
    .unwrap();
  let service_id = s.resolve_dimension(Dimension::Service, service).await.unwrap();
  let status_id = s.resolve_dimension(Dimension::Status, status).await.unwrap();
  let source_id = match source {
    Some(src) => Some(s.resolve_dimension(Dimension::Source, src).await.unwrap()),
    None => None,
  };
  s.insert_status(NewPayloadStatus {
    event_key: event_key(),
    payload_id,
    service_id,
    source_id,
    status_id,
    status_msg: None,
    date,
  })
  .await
  .unwrap();
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn dimension_names_are_case_insensitive() {
  let s = store().await;

  let first = s.resolve_dimension(Dimension::Service, "Puptoo").await.unwrap();
  let second = s.resolve_dimension(Dimension::Service, "puptoo").await.unwrap();

  assert_eq!(first, second);
  assert_eq!(s.count_dimension(Dimension::Service).await.unwrap(), 1);
}

#[tokio::test]
async fn dimension_namespaces_are_independent() {
  let s = store().await;

  s.resolve_dimension(Dimension::Service, "inventory").await.unwrap();
  s.resolve_dimension(Dimension::Source, "inventory").await.unwrap();

  assert_eq!(s.count_dimension(Dimension::Service).await.unwrap(), 1);
  assert_eq!(s.count_dimension(Dimension::Source).await.unwrap(), 1);
  assert_eq!(s.count_dimension(Dimension::Status).await.unwrap(), 0);
}

#[tokio::test]
async fn distinct_names_get_distinct_ids() {
  let s = store().await;
  let a = s.resolve_dimension(Dimension::Status, "received").await.unwrap();
  let b = s.resolve_dimension(Dimension::Status, "success").await.unwrap();
  assert_ne!(a, b);
}

#[tokio::test]
async fn blank_dimension_name_is_rejected() {
  let s = store().await;
  let err = s.resolve_dimension(Dimension::Status, "  ").await.unwrap_err();
  assert!(matches!(err, crate::Error::BlankDimension(Dimension::Status)));
  assert_eq!(s.count_dimension(Dimension::Status).await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_resolution_creates_one_row() {
  let s = store().await;

  let tasks: Vec<_> = (0..8)
    .map(|i| {
      let s = s.clone();
      let name = if i % 2 == 0 { "Ingress" } else { "ingress" };
      tokio::spawn(async move { s.resolve_dimension(Dimension::Service, name).await.unwrap() })
    })
    .collect();

  let mut ids = Vec::new();
  for t in tasks {
    ids.push(t.await.unwrap());
  }
  ids.dedup();
  assert_eq!(ids.len(), 1);
  assert_eq!(s.count_dimension(Dimension::Service).await.unwrap(), 1);
}

// ─── Payload upsert ──────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_same_request_id_is_idempotent() {
  let s = store().await;
  let rid = request_id();

  let first = s.upsert_payload(new_payload(&rid, identity("A", "B"), at(0))).await.unwrap();
  let second = s.upsert_payload(new_payload(&rid, identity("A", "B"), at(30))).await.unwrap();
  assert_eq!(first, second);

  let page = s.list_payloads(&PayloadQuery::default()).await.unwrap();
  assert_eq!(page.count, 1);

  let payload = s.get_payload(&rid).await.unwrap().unwrap();
  assert_eq!(payload.id, first);
  assert_eq!(payload.created_at, at(0));
}

#[tokio::test]
async fn blank_fields_never_overwrite_set_fields() {
  let s = store().await;
  let rid = request_id();

  s.upsert_payload(new_payload(&rid, identity("A", "B"), at(0))).await.unwrap();
  s.upsert_payload(new_payload(&rid, identity("", ""), at(5))).await.unwrap();

  let payload = s.get_payload(&rid).await.unwrap().unwrap();
  assert_eq!(payload.account.as_deref(), Some("A"));
  assert_eq!(payload.org_id.as_deref(), Some("B"));
}

#[tokio::test]
async fn later_events_fill_in_blank_fields() {
  let s = store().await;
  let rid = request_id();

  s.upsert_payload(new_payload(&rid, identity("A", ""), at(0))).await.unwrap();
  s.upsert_payload(new_payload(
    &rid,
    PayloadIdentity::new(None, Some("B".into()), Some("inv".into()), None),
    at(5),
  ))
  .await
  .unwrap();

  let payload = s.get_payload(&rid).await.unwrap().unwrap();
  assert_eq!(payload.account.as_deref(), Some("A"));
  assert_eq!(payload.org_id.as_deref(), Some("B"));
  assert_eq!(payload.inventory_id.as_deref(), Some("inv"));
  assert_eq!(payload.system_id, None);
  assert_eq!(payload.created_at, at(0));
}

#[tokio::test]
async fn get_payload_missing_returns_none() {
  let s = store().await;
  assert!(s.get_payload(&request_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn blank_request_id_is_rejected() {
  let s = store().await;
  let err = s
    .upsert_payload(new_payload("", PayloadIdentity::default(), at(0)))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::BlankRequestId));
}

// ─── Status rows ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_without_source_has_null_source() {
  let s = store().await;
  let rid = request_id();
  record(&s, &rid, "ingress", None, "received", at(0)).await;

  let timeline = s.get_timeline(&rid, TimelineSort::Date, SortDir::Asc).await.unwrap();
  assert_eq!(timeline.len(), 1);
  assert_eq!(timeline[0].service, "ingress");
  assert_eq!(timeline[0].source, None);
  assert_eq!(timeline[0].status, "received");
  assert_eq!(s.count_dimension(Dimension::Source).await.unwrap(), 0);
}

#[tokio::test]
async fn insert_status_sets_ingestion_time() {
  let s = store().await;
  let rid = request_id();
  let payload_id = s
    .upsert_payload(new_payload(&rid, PayloadIdentity::default(), at(0)))
    .await
    .unwrap();
  let service_id = s.resolve_dimension(Dimension::Service, "puptoo").await.unwrap();
  let status_id = s.resolve_dimension(Dimension::Status, "processing").await.unwrap();

  let before = Utc::now();
  let row = s
    .insert_status(NewPayloadStatus {
      event_key: event_key(),
      payload_id,
      service_id,
      source_id: None,
      status_id,
      status_msg: Some("extracting".into()),
      date: at(0),
    })
    .await
    .unwrap();

  assert!(row.created_at >= before);
  assert_eq!(row.date, at(0));
  assert_eq!(row.status_msg.as_deref(), Some("extracting"));
  assert_eq!(s.count_statuses(&rid).await.unwrap(), 1);
}

#[tokio::test]
async fn insert_status_is_idempotent_on_event_key() {
  let s = store().await;
  let rid = request_id();
  let payload_id = s
    .upsert_payload(new_payload(&rid, PayloadIdentity::default(), at(0)))
    .await
    .unwrap();
  let service_id = s.resolve_dimension(Dimension::Service, "puptoo").await.unwrap();
  let status_id = s.resolve_dimension(Dimension::Status, "processing").await.unwrap();
  let status = NewPayloadStatus {
    event_key: event_key(),
    payload_id,
    service_id,
    source_id: None,
    status_id,
    status_msg: None,
    date: at(0),
  };

  let first = s.insert_status(status.clone()).await.unwrap();
  let second = s.insert_status(status).await.unwrap();

  assert_eq!(first.id, second.id);
  assert_eq!(first.created_at, second.created_at);
  assert_eq!(s.count_statuses(&rid).await.unwrap(), 1);
}

#[tokio::test]
async fn insert_status_rejects_blank_event_key() {
  let s = store().await;
  let rid = request_id();
  let payload_id = s
    .upsert_payload(new_payload(&rid, PayloadIdentity::default(), at(0)))
    .await
    .unwrap();
  let service_id = s.resolve_dimension(Dimension::Service, "puptoo").await.unwrap();
  let status_id = s.resolve_dimension(Dimension::Status, "processing").await.unwrap();

  let err = s
    .insert_status(NewPayloadStatus {
      event_key: "  ".into(),
      payload_id,
      service_id,
      source_id: None,
      status_id,
      status_msg: None,
      date: at(0),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::BlankEventKey));
  assert_eq!(s.count_statuses(&rid).await.unwrap(), 0);
}

#[tokio::test]
async fn insert_status_with_unknown_payload_fails() {
  let s = store().await;
  let service_id = s.resolve_dimension(Dimension::Service, "puptoo").await.unwrap();
  let status_id = s.resolve_dimension(Dimension::Status, "processing").await.unwrap();

  let err = s
    .insert_status(NewPayloadStatus {
      event_key: event_key(),
      payload_id: 9_999,
      service_id,
      source_id: None,
      status_id,
      status_msg: None,
      date: at(0),
    })
    .await;
  assert!(err.is_err());
}

#[tokio::test]
async fn timeline_feeds_duration_computation() {
  let s = store().await;
  let rid = request_id();
  let base = Utc.with_ymd_and_hms(2021, 8, 4, 7, 45, 26).unwrap();
  let ms = TimeDelta::milliseconds;

  // Inserted out of order on purpose.
  record(&s, &rid, "puptoo", Some("inventory"), "processing", base + ms(12_604)).await;
  record(&s, &rid, "puptoo", None, "received", base + ms(371)).await;
  record(&s, &rid, "puptoo", Some("inventory"), "received", base + ms(7_350)).await;
  record(&s, &rid, "puptoo", None, "success", base + ms(9_970)).await;

  let timeline = s.get_timeline(&rid, TimelineSort::Date, SortDir::Asc).await.unwrap();
  assert_eq!(timeline.len(), 4);
  assert!(timeline.windows(2).all(|w| w[0].date <= w[1].date));

  let durations = compute_durations(&timeline);
  assert_eq!(durations["puptoo:inventory"], "00:00:05.254000");
  assert_eq!(durations["puptoo:undefined"], "00:00:09.599000");
  assert_eq!(durations["total_time"], "00:00:12.233000");
}

#[tokio::test]
async fn timeline_for_unknown_request_is_empty() {
  let s = store().await;
  let timeline = s
    .get_timeline(&request_id(), TimelineSort::Date, SortDir::Desc)
    .await
    .unwrap();
  assert!(timeline.is_empty());
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_payloads_filters_sorts_and_pages() {
  let s = store().await;
  for i in 0..5 {
    let account = if i % 2 == 0 { "even" } else { "odd" };
    s.upsert_payload(new_payload(&request_id(), identity(account, "org"), at(i)))
      .await
      .unwrap();
  }

  let evens = s
    .list_payloads(&PayloadQuery {
      account: Some("even".into()),
      sort_dir: SortDir::Asc,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(evens.count, 3);
  assert_eq!(evens.items.len(), 3);
  assert!(evens.items.windows(2).all(|w| w[0].created_at <= w[1].created_at));

  let page = s
    .list_payloads(&PayloadQuery {
      sort_by: PayloadSort::CreatedAt,
      sort_dir: SortDir::Desc,
      page: Page { page: 1, page_size: 2 },
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.count, 5);
  assert_eq!(page.items.len(), 2);
  assert_eq!(page.items[0].created_at, at(2));
  assert_eq!(page.items[1].created_at, at(1));

  let recent = s
    .list_payloads(&PayloadQuery {
      created_at: TimeRange { gte: Some(at(3)), ..Default::default() },
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(recent.count, 2);
}

#[tokio::test]
async fn list_statuses_filters_by_dimension_names() {
  let s = store().await;
  let rid = request_id();
  record(&s, &rid, "ingress", None, "received", at(0)).await;
  record(&s, &rid, "puptoo", Some("inventory"), "received", at(1)).await;
  record(&s, &rid, "puptoo", None, "success", at(2)).await;

  let puptoo = s
    .list_statuses(&StatusQuery {
      service: Some("puptoo".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(puptoo.count, 2);
  assert!(puptoo.items.iter().all(|e| e.service == "puptoo"));

  let with_source = s
    .list_statuses(&StatusQuery {
      source: Some("inventory".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(with_source.count, 1);
  assert_eq!(with_source.items[0].request_id, rid);

  let late = s
    .list_statuses(&StatusQuery {
      date: TimeRange { gt: Some(at(0)), ..Default::default() },
      sort_dir: SortDir::Asc,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(late.count, 2);
  assert_eq!(late.items[0].date, at(1));
}

#[tokio::test]
async fn ping_succeeds() {
  store().await.ping().await.unwrap();
}
