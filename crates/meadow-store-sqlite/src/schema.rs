//! SQL schema for the Meadow SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Store order is rowid order. Upserts use ON CONFLICT DO UPDATE so a
-- replaced record keeps its rowid (and therefore its position).
CREATE TABLE IF NOT EXISTS contacts (
    contact_id  TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT,
    phone       TEXT NOT NULL,
    notes       TEXT,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    is_blocked  INTEGER NOT NULL DEFAULT 0
);

-- Ids of deleted contacts. Append-only; an id listed here is never written
-- to `contacts` again.
CREATE TABLE IF NOT EXISTS retired_contacts (
    contact_id TEXT PRIMARY KEY,
    retired_at TEXT NOT NULL   -- ISO 8601 UTC
);

PRAGMA user_version = 1;
";
