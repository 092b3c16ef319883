//! SQL schema for the pictier SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision; there is no migration path beyond it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS custom_tiers (
    tier_id                TEXT PRIMARY KEY,
    name                   TEXT NOT NULL UNIQUE,
    thumbnail_sizes        TEXT NOT NULL,    -- comma-separated, parsed on read
    original_file_link     INTEGER NOT NULL DEFAULT 0,
    expiring_links_enabled INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS accounts (
    account_id    TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    account_tier  TEXT,                      -- built-in or custom tier name
    custom_tier   TEXT REFERENCES custom_tiers(tier_id) ON DELETE SET NULL,
    created_at    TEXT NOT NULL
);

-- Asset records are never updated, only inserted and deleted.
CREATE TABLE IF NOT EXISTS assets (
    asset_id     TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE CASCADE,
    storage_path TEXT NOT NULL,
    content_type TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS assets_owner_idx   ON assets(owner_id);
CREATE INDEX IF NOT EXISTS accounts_tier_idx  ON accounts(account_tier);

PRAGMA user_version = 1;
";
