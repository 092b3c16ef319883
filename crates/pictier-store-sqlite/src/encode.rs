//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, and booleans as SQLite integers.

use chrono::{DateTime, Utc};
use pictier_core::{account::Account, asset::Asset, tier::CustomTierRecord};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str =
  "account_id, username, password_hash, account_tier, custom_tier, created_at";

pub const TIER_COLUMNS: &str =
  "tier_id, name, thumbnail_sizes, original_file_link, expiring_links_enabled";

pub const ASSET_COLUMNS: &str =
  "asset_id, owner_id, storage_path, content_type, content_hash, created_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub account_id:    String,
  pub username:      String,
  pub password_hash: String,
  pub account_tier:  Option<String>,
  pub custom_tier:   Option<String>,
  pub created_at:    String,
}

impl RawAccount {
  /// Column order must match [`ACCOUNT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:    row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      account_tier:  row.get(3)?,
      custom_tier:   row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:    decode_uuid(&self.account_id)?,
      username:      self.username,
      password_hash: self.password_hash,
      account_tier:  self.account_tier,
      custom_tier:   self.custom_tier.as_deref().map(decode_uuid).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `custom_tiers` row.
pub struct RawCustomTier {
  pub tier_id:                String,
  pub name:                   String,
  pub thumbnail_sizes:        String,
  pub original_file_link:     bool,
  pub expiring_links_enabled: bool,
}

impl RawCustomTier {
  /// Column order must match [`TIER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      tier_id:                row.get(0)?,
      name:                   row.get(1)?,
      thumbnail_sizes:        row.get(2)?,
      original_file_link:     row.get(3)?,
      expiring_links_enabled: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<CustomTierRecord> {
    Ok(CustomTierRecord {
      tier_id:                decode_uuid(&self.tier_id)?,
      name:                   self.name,
      thumbnail_sizes:        self.thumbnail_sizes,
      original_file_link:     self.original_file_link,
      expiring_links_enabled: self.expiring_links_enabled,
    })
  }
}

/// Raw values read directly from an `assets` row.
pub struct RawAsset {
  pub asset_id:     String,
  pub owner_id:     String,
  pub storage_path: String,
  pub content_type: String,
  pub content_hash: String,
  pub created_at:   String,
}

impl RawAsset {
  /// Column order must match [`ASSET_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      asset_id:     row.get(0)?,
      owner_id:     row.get(1)?,
      storage_path: row.get(2)?,
      content_type: row.get(3)?,
      content_hash: row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_asset(self) -> Result<Asset> {
    Ok(Asset {
      asset_id:     decode_uuid(&self.asset_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      storage_path: self.storage_path,
      content_type: self.content_type,
      content_hash: self.content_hash,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
