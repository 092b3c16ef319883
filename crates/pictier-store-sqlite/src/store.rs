//! [`SqliteStore`] — the SQLite implementation of [`RecordStore`].

use std::{path::Path, str::FromStr};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;

use pictier_core::{
  Error as CoreError,
  account::{Account, NewAccount},
  asset::{Asset, NewAsset},
  store::{RecordStore, TierProvider},
  tier::{BuiltinTier, CustomTierRecord, NewCustomTier},
};

use crate::{
  Error, Result,
  encode::{
    ACCOUNT_COLUMNS, ASSET_COLUMNS, RawAccount, RawAsset, RawCustomTier,
    TIER_COLUMNS, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

/// Outcome of a closure run on the database thread: the outer `Result` is a
/// database fault, the inner one a domain rule violation.
type Checked<T> = std::result::Result<T, CoreError>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A pictier record store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
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

  /// Open an in-memory store — useful for testing.
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

  async fn require_account(&self, account_id: Uuid) -> Result<Account> {
    self
      .get_account(account_id)
      .await?
      .ok_or(Error::Core(CoreError::AccountNotFound(account_id)))
  }

  async fn require_custom_tier(&self, tier_id: Uuid) -> Result<CustomTierRecord> {
    self
      .get_custom_tier(tier_id)
      .await?
      .ok_or(Error::Core(CoreError::CustomTierNotFound(tier_id)))
  }
}

// ─── Validation helpers (run on the database thread) ─────────────────────────

/// Treat blank tier names as "no tier".
fn normalize_tier_name(name: Option<String>) -> Option<String> {
  name.filter(|n| !n.trim().is_empty())
}

/// A tier name may be assigned if it is a built-in tier or names an existing
/// custom tier.
fn tier_name_assignable(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
  if BuiltinTier::from_str(name).is_ok() {
    return Ok(true);
  }
  custom_tier_id_by_name(conn, name).map(|id| id.is_some())
}

fn custom_tier_id_by_name(
  conn: &Connection,
  name: &str,
) -> rusqlite::Result<Option<String>> {
  conn
    .query_row(
      "SELECT tier_id FROM custom_tiers WHERE name = ?1",
      rusqlite::params![name],
      |r| r.get(0),
    )
    .optional()
}

/// Check a proposed custom tier name against both namespaces.
/// `current_id` is the tier being renamed, which may keep its own name.
fn check_custom_tier_name(
  conn: &Connection,
  name: &str,
  current_id: Option<&str>,
) -> rusqlite::Result<Checked<()>> {
  if name.is_empty() {
    return Ok(Err(CoreError::EmptyTierName));
  }
  if BuiltinTier::is_reserved(name) {
    return Ok(Err(CoreError::ReservedTierName(name.to_owned())));
  }
  match custom_tier_id_by_name(conn, name)? {
    Some(id) if Some(id.as_str()) != current_id => {
      Ok(Err(CoreError::DuplicateTierName(name.to_owned())))
    }
    _ => Ok(Ok(())),
  }
}

// ─── TierProvider impl ───────────────────────────────────────────────────────

impl TierProvider for SqliteStore {
  type Error = Error;

  async fn find_custom_tier(&self, name: &str) -> Result<Option<CustomTierRecord>> {
    let name = name.to_owned();

    let raw: Option<RawCustomTier> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TIER_COLUMNS} FROM custom_tiers WHERE name = ?1"),
            rusqlite::params![name],
            RawCustomTier::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCustomTier::into_record).transpose()
  }

  async fn get_custom_tier(&self, tier_id: Uuid) -> Result<Option<CustomTierRecord>> {
    let id_str = encode_uuid(tier_id);

    let raw: Option<RawCustomTier> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TIER_COLUMNS} FROM custom_tiers WHERE tier_id = ?1"),
            rusqlite::params![id_str],
            RawCustomTier::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCustomTier::into_record).transpose()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    let account = Account {
      account_id:    Uuid::new_v4(),
      username:      input.username,
      password_hash: input.password_hash,
      account_tier:  normalize_tier_name(input.account_tier),
      custom_tier:   None,
      created_at:    Utc::now(),
    };

    let id_str   = encode_uuid(account.account_id);
    let username = account.username.clone();
    let hash     = account.password_hash.clone();
    let tier     = account.account_tier.clone();
    let at_str   = encode_dt(account.created_at);

    self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Checked<()>> {
        let tx = conn.transaction()?;

        if let Some(name) = &tier
          && !tier_name_assignable(&tx, name)?
        {
          return Ok(Err(CoreError::UnknownTier(name.clone())));
        }

        let taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE username = ?1",
            rusqlite::params![username],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(Err(CoreError::DuplicateUsername(username)));
        }

        tx.execute(
          "INSERT INTO accounts (account_id, username, password_hash, account_tier, custom_tier, created_at)
           VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
          rusqlite::params![id_str, username, hash, tier, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(account)
  }

  async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(account_id);

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
            rusqlite::params![id_str],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
    let username = username.to_owned();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
            rusqlite::params![username],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  async fn set_account_tier(
    &self,
    account_id: Uuid,
    tier_name:  Option<String>,
  ) -> Result<Account> {
    let id_str = encode_uuid(account_id);
    let tier   = normalize_tier_name(tier_name);

    self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Checked<()>> {
        let tx = conn.transaction()?;

        if let Some(name) = &tier
          && !tier_name_assignable(&tx, name)?
        {
          return Ok(Err(CoreError::UnknownTier(name.clone())));
        }

        let changed = tx.execute(
          "UPDATE accounts SET account_tier = ?2 WHERE account_id = ?1",
          rusqlite::params![id_str, tier],
        )?;
        if changed == 0 {
          return Ok(Err(CoreError::AccountNotFound(account_id)));
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    self.require_account(account_id).await
  }

  async fn set_custom_tier(
    &self,
    account_id: Uuid,
    tier_id:    Option<Uuid>,
  ) -> Result<Account> {
    if let Some(tier_id) = tier_id {
      self.require_custom_tier(tier_id).await?;
    }

    let id_str   = encode_uuid(account_id);
    let tier_str = tier_id.map(encode_uuid);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts SET custom_tier = ?2 WHERE account_id = ?1",
          rusqlite::params![id_str, tier_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::AccountNotFound(account_id).into());
    }
    self.require_account(account_id).await
  }

  async fn delete_account(&self, account_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(account_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM accounts WHERE account_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(CoreError::AccountNotFound(account_id).into());
    }
    Ok(())
  }

  // ── Custom tiers ──────────────────────────────────────────────────────────

  async fn create_custom_tier(&self, input: NewCustomTier) -> Result<CustomTierRecord> {
    let record = CustomTierRecord {
      tier_id:                Uuid::new_v4(),
      name:                   input.name.trim().to_owned(),
      thumbnail_sizes:        input.thumbnail_sizes,
      original_file_link:     input.original_file_link,
      expiring_links_enabled: input.expiring_links_enabled,
    };

    let id_str   = encode_uuid(record.tier_id);
    let name     = record.name.clone();
    let sizes    = record.thumbnail_sizes.clone();
    let original = record.original_file_link;
    let expiring = record.expiring_links_enabled;

    self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Checked<()>> {
        let tx = conn.transaction()?;

        if let Err(e) = check_custom_tier_name(&tx, &name, None)? {
          return Ok(Err(e));
        }

        tx.execute(
          "INSERT INTO custom_tiers (tier_id, name, thumbnail_sizes, original_file_link, expiring_links_enabled)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, sizes, original, expiring],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(record)
  }

  async fn list_custom_tiers(&self) -> Result<Vec<CustomTierRecord>> {
    let raws: Vec<RawCustomTier> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {TIER_COLUMNS} FROM custom_tiers ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawCustomTier::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCustomTier::into_record).collect()
  }

  async fn update_custom_tier(
    &self,
    tier_id: Uuid,
    input:   NewCustomTier,
  ) -> Result<CustomTierRecord> {
    let record = CustomTierRecord {
      tier_id,
      name:                   input.name.trim().to_owned(),
      thumbnail_sizes:        input.thumbnail_sizes,
      original_file_link:     input.original_file_link,
      expiring_links_enabled: input.expiring_links_enabled,
    };

    let id_str   = encode_uuid(tier_id);
    let name     = record.name.clone();
    let sizes    = record.thumbnail_sizes.clone();
    let original = record.original_file_link;
    let expiring = record.expiring_links_enabled;

    self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Checked<()>> {
        let tx = conn.transaction()?;

        let old_name: Option<String> = tx
          .query_row(
            "SELECT name FROM custom_tiers WHERE tier_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(old_name) = old_name else {
          return Ok(Err(CoreError::CustomTierNotFound(tier_id)));
        };

        if let Err(e) = check_custom_tier_name(&tx, &name, Some(&id_str))? {
          return Ok(Err(e));
        }

        tx.execute(
          "UPDATE custom_tiers
             SET name = ?2, thumbnail_sizes = ?3,
                 original_file_link = ?4, expiring_links_enabled = ?5
           WHERE tier_id = ?1",
          rusqlite::params![id_str, name, sizes, original, expiring],
        )?;

        if old_name != name {
          // Keep `account_tier` references resolvable after a rename.
          tx.execute(
            "UPDATE accounts SET account_tier = ?2 WHERE account_tier = ?1",
            rusqlite::params![old_name, name],
          )?;
        }

        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(record)
  }

  async fn delete_custom_tier(&self, tier_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(tier_id);

    self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Checked<()>> {
        let tx = conn.transaction()?;

        let name: Option<String> = tx
          .query_row(
            "SELECT name FROM custom_tiers WHERE tier_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(name) = name else {
          return Ok(Err(CoreError::CustomTierNotFound(tier_id)));
        };

        let in_use: i64 = tx.query_row(
          "SELECT COUNT(*) FROM accounts WHERE account_tier = ?1",
          rusqlite::params![name],
          |r| r.get(0),
        )?;
        if in_use > 0 {
          return Ok(Err(CoreError::TierInUse(name)));
        }

        // `accounts.custom_tier` is cleared by ON DELETE SET NULL.
        tx.execute(
          "DELETE FROM custom_tiers WHERE tier_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await??;

    Ok(())
  }

  // ── Assets ────────────────────────────────────────────────────────────────

  async fn record_asset(&self, input: NewAsset) -> Result<Asset> {
    let asset = Asset {
      asset_id:     input.asset_id,
      owner_id:     input.owner_id,
      storage_path: input.storage_path,
      content_type: input.content_type,
      content_hash: input.content_hash,
      created_at:   Utc::now(),
    };

    let id_str    = encode_uuid(asset.asset_id);
    let owner_str = encode_uuid(asset.owner_id);
    let path      = asset.storage_path.clone();
    let ctype     = asset.content_type.clone();
    let hash      = asset.content_hash.clone();
    let at_str    = encode_dt(asset.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO assets (asset_id, owner_id, storage_path, content_type, content_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, owner_str, path, ctype, hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(asset)
  }

  async fn get_asset(&self, asset_id: Uuid) -> Result<Option<Asset>> {
    let id_str = encode_uuid(asset_id);

    let raw: Option<RawAsset> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ASSET_COLUMNS} FROM assets WHERE asset_id = ?1"),
            rusqlite::params![id_str],
            RawAsset::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAsset::into_asset).transpose()
  }

  async fn list_assets(&self, owner_id: Uuid) -> Result<Vec<Asset>> {
    let owner_str = encode_uuid(owner_id);

    let raws: Vec<RawAsset> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSET_COLUMNS} FROM assets WHERE owner_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawAsset::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAsset::into_asset).collect()
  }

  async fn delete_asset(&self, asset_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(asset_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM assets WHERE asset_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }
}
