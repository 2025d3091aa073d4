//! SQL schema for the payload-tracker SQLite store.
//!
//! Executed once at connection startup. Every statement is idempotent, so
//! opening an existing database is also the migration path.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Dimensions: get-or-create only, never updated once written.
CREATE TABLE IF NOT EXISTS services (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS sources (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS statuses (
    id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name  TEXT NOT NULL UNIQUE
);

-- One row per request id. Identity columns are only ever filled in.
CREATE TABLE IF NOT EXISTS payloads (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id    TEXT NOT NULL UNIQUE,
    account       TEXT,
    org_id        TEXT,
    inventory_id  TEXT,
    system_id     TEXT,
    created_at    TEXT NOT NULL     -- RFC 3339 UTC; date of first event
);

-- Status events are strictly append-only.
-- No row is ever changed or deleted once written.
CREATE TABLE IF NOT EXISTS payload_statuses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    event_key   TEXT NOT NULL UNIQUE, -- writer-assigned; makes retries idempotent
    payload_id  INTEGER NOT NULL REFERENCES payloads(id),
    service_id  INTEGER NOT NULL REFERENCES services(id),
    source_id   INTEGER          REFERENCES sources(id),
    status_id   INTEGER NOT NULL REFERENCES statuses(id),
    status_msg  TEXT,
    date        TEXT NOT NULL,    -- event time carried in the message
    created_at  TEXT NOT NULL     -- ingestion time; store-assigned
);

CREATE INDEX IF NOT EXISTS payloads_created_idx        ON payloads(created_at);
CREATE INDEX IF NOT EXISTS payload_statuses_payload_idx ON payload_statuses(payload_id);
CREATE INDEX IF NOT EXISTS payload_statuses_date_idx    ON payload_statuses(date);

PRAGMA user_version = 1;
";
