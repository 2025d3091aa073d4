//! [`SqliteStore`]: the SQLite implementation of [`TrackerStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;

use tracker_core::{
  dimension::{Dimension, DimensionId, canonical_name},
  payload::{IdentityField, NewPayload, Payload, PayloadId},
  status::{NewPayloadStatus, PayloadStatus, TimelineEntry},
  store::{
    Paged, PayloadQuery, PayloadSort, SortDir, StatusQuery, StatusSort,
    TimelineSort, TrackerStore,
  },
};

use crate::{
  Error, Result,
  encode::{RawPayload, RawTimelineEntry, decode_dt, encode_dt, encode_sort_dir},
  filter::Filter,
  schema::SCHEMA,
};

// ─── SQL fragments ───────────────────────────────────────────────────────────

const PAYLOAD_COLUMNS: &str =
  "id, request_id, account, org_id, inventory_id, system_id, created_at";

/// Status rows joined with payload and dimension names. A status without a
/// source keeps a NULL `source_id`, hence the LEFT JOIN.
const TIMELINE_FROM: &str = "
  FROM payload_statuses ps
  JOIN payloads p       ON p.id  = ps.payload_id
  JOIN services sv      ON sv.id = ps.service_id
  LEFT JOIN sources so  ON so.id = ps.source_id
  JOIN statuses st      ON st.id = ps.status_id";

const TIMELINE_COLUMNS: &str = "
  ps.id, ps.payload_id, p.request_id, p.account, p.org_id, p.inventory_id,
  p.system_id, sv.name, so.name, st.name, ps.status_msg, ps.date, ps.created_at";

/// Get-or-create as one statement: the no-op update on conflict lets
/// `RETURNING` yield the id of the existing row.
fn resolve_dimension_sql(dimension: Dimension) -> String {
  format!(
    "INSERT INTO {} (name) VALUES (?1)
     ON CONFLICT(name) DO UPDATE SET name = excluded.name
     RETURNING id",
    dimension.table()
  )
}

/// Conditional upsert keyed by `request_id`. Only `fields` are assigned on
/// conflict, so a blank incoming value never replaces a stored one and
/// `created_at` is never touched after the first insert.
fn upsert_payload_sql(fields: &[IdentityField]) -> String {
  let assignments = if fields.is_empty() {
    "request_id = excluded.request_id".to_owned()
  } else {
    fields
      .iter()
      .map(|f| format!("{0} = excluded.{0}", f.column()))
      .collect::<Vec<_>>()
      .join(", ")
  };

  format!(
    "INSERT INTO payloads (request_id, account, org_id, inventory_id, system_id, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(request_id) DO UPDATE SET {assignments}
     RETURNING id"
  )
}

fn payload_sort_column(sort: PayloadSort) -> &'static str {
  match sort {
    PayloadSort::Account => "account",
    PayloadSort::OrgId => "org_id",
    PayloadSort::InventoryId => "inventory_id",
    PayloadSort::SystemId => "system_id",
    PayloadSort::CreatedAt => "created_at",
  }
}

fn timeline_sort_column(sort: TimelineSort) -> &'static str {
  match sort {
    TimelineSort::Service => "sv.name",
    TimelineSort::Source => "so.name",
    TimelineSort::StatusMsg => "ps.status_msg",
    TimelineSort::Date => "ps.date",
    TimelineSort::CreatedAt => "ps.created_at",
  }
}

fn status_sort_column(sort: StatusSort) -> &'static str {
  match sort {
    StatusSort::Service => "sv.name",
    StatusSort::Source => "so.name",
    StatusSort::RequestId => "p.request_id",
    StatusSort::Status => "st.name",
    StatusSort::StatusMsg => "ps.status_msg",
    StatusSort::Date => "ps.date",
    StatusSort::CreatedAt => "ps.created_at",
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A payload-tracker store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows in a dimension table.
  pub async fn count_dimension(&self, dimension: Dimension) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", dimension.table());
    let count: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  /// Number of status rows recorded for `request_id`.
  pub async fn count_statuses(&self, request_id: &str) -> Result<u64> {
    let request_id = request_id.to_owned();
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM payload_statuses ps
           JOIN payloads p ON p.id = ps.payload_id
           WHERE p.request_id = ?1",
          rusqlite::params![request_id],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }
}

// ─── TrackerStore impl ───────────────────────────────────────────────────────

impl TrackerStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn resolve_dimension(&self, dimension: Dimension, name: &str) -> Result<DimensionId> {
    let name = canonical_name(name).ok_or(Error::BlankDimension(dimension))?;
    let sql  = resolve_dimension_sql(dimension);

    let id: DimensionId = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![name], |r| r.get(0))?)
      })
      .await?;

    debug!(%dimension, id, "resolved dimension");
    Ok(id)
  }

  async fn upsert_payload(&self, payload: NewPayload) -> Result<PayloadId> {
    if payload.request_id.trim().is_empty() {
      return Err(Error::BlankRequestId);
    }

    let sql            = upsert_payload_sql(&payload.identity.present_fields());
    let created_at_str = encode_dt(payload.created_at);
    let NewPayload { request_id, identity, .. } = payload;

    let id: PayloadId = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            request_id,
            identity.account,
            identity.org_id,
            identity.inventory_id,
            identity.system_id,
            created_at_str,
          ],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(id)
  }

  async fn insert_status(&self, status: NewPayloadStatus) -> Result<PayloadStatus> {
    if status.event_key.trim().is_empty() {
      return Err(Error::BlankEventKey);
    }

    let date_str       = encode_dt(status.date);
    let created_at_str = encode_dt(Utc::now());
    let row            = status.clone();

    // The no-op update makes RETURNING yield the stored row on conflict.
    let (id, stored_created_at): (i64, String) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO payload_statuses (
             event_key, payload_id, service_id, source_id, status_id, status_msg, date, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(event_key) DO UPDATE SET event_key = excluded.event_key
           RETURNING id, created_at",
          rusqlite::params![
            row.event_key,
            row.payload_id,
            row.service_id,
            row.source_id,
            row.status_id,
            row.status_msg,
            date_str,
            created_at_str,
          ],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?)
      })
      .await?;

    Ok(PayloadStatus {
      id,
      event_key: status.event_key,
      payload_id: status.payload_id,
      service_id: status.service_id,
      source_id: status.source_id,
      status_id: status.status_id,
      status_msg: status.status_msg,
      date: status.date,
      created_at: decode_dt(&stored_created_at)?,
    })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn ping(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_payload(&self, request_id: &str) -> Result<Option<Payload>> {
    let request_id = request_id.to_owned();
    let sql = format!("SELECT {PAYLOAD_COLUMNS} FROM payloads WHERE request_id = ?1");

    let raw: Option<RawPayload> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![request_id], RawPayload::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPayload::into_payload).transpose()
  }

  async fn list_payloads(&self, query: &PayloadQuery) -> Result<Paged<Payload>> {
    let mut filter = Filter::default();
    filter
      .eq("account", query.account.as_deref())
      .eq("org_id", query.org_id.as_deref())
      .eq("inventory_id", query.inventory_id.as_deref())
      .eq("system_id", query.system_id.as_deref())
      .range("created_at", &query.created_at);

    let where_clause = filter.where_clause();
    let dir          = encode_sort_dir(query.sort_dir);
    let count_sql    = format!("SELECT COUNT(*) FROM payloads {where_clause}");
    let page_sql     = format!(
      "SELECT {PAYLOAD_COLUMNS} FROM payloads {where_clause}
       ORDER BY {} {dir}, id {dir}
       LIMIT ? OFFSET ?",
      payload_sort_column(query.sort_by),
    );
    let count_params = filter.params();
    let page_params  = filter.params_with_page(query.page.page_size, query.page.offset());

    let (count, raws): (i64, Vec<RawPayload>) = self
      .conn
      .call(move |conn| {
        let count = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(count_params),
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&page_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(page_params), RawPayload::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((count, rows))
      })
      .await?;

    Ok(Paged {
      count: count.max(0) as u64,
      items: raws
        .into_iter()
        .map(RawPayload::into_payload)
        .collect::<Result<_>>()?,
    })
  }

  async fn get_timeline(
    &self,
    request_id: &str,
    sort_by:    TimelineSort,
    sort_dir:   SortDir,
  ) -> Result<Vec<TimelineEntry>> {
    let request_id = request_id.to_owned();
    let dir        = encode_sort_dir(sort_dir);
    let sql        = format!(
      "SELECT {TIMELINE_COLUMNS} {TIMELINE_FROM}
       WHERE p.request_id = ?1
       ORDER BY {} {dir}, ps.id {dir}",
      timeline_sort_column(sort_by),
    );

    let raws: Vec<RawTimelineEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![request_id], RawTimelineEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTimelineEntry::into_entry).collect()
  }

  async fn list_statuses(&self, query: &StatusQuery) -> Result<Paged<TimelineEntry>> {
    let mut filter = Filter::default();
    filter
      .eq("sv.name", query.service.as_deref())
      .eq("so.name", query.source.as_deref())
      .eq("st.name", query.status.as_deref())
      .eq("ps.status_msg", query.status_msg.as_deref())
      .range("ps.date", &query.date)
      .range("ps.created_at", &query.created_at);

    let where_clause = filter.where_clause();
    let dir          = encode_sort_dir(query.sort_dir);
    let count_sql    = format!("SELECT COUNT(*) {TIMELINE_FROM} {where_clause}");
    let page_sql     = format!(
      "SELECT {TIMELINE_COLUMNS} {TIMELINE_FROM} {where_clause}
       ORDER BY {} {dir}, ps.id {dir}
       LIMIT ? OFFSET ?",
      status_sort_column(query.sort_by),
    );
    let count_params = filter.params();
    let page_params  = filter.params_with_page(query.page.page_size, query.page.offset());

    let (count, raws): (i64, Vec<RawTimelineEntry>) = self
      .conn
      .call(move |conn| {
        let count = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(count_params),
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&page_sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(page_params), RawTimelineEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((count, rows))
      })
      .await?;

    Ok(Paged {
      count: count.max(0) as u64,
      items: raws
        .into_iter()
        .map(RawTimelineEntry::into_entry)
        .collect::<Result<_>>()?,
    })
  }
}
