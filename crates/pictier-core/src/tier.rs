//! Account tiers and the policies they resolve to.
//!
//! A tier is either one of the fixed built-in tiers or a custom tier record
//! created by an administrator. Either way it collapses into a [`TierPolicy`],
//! which is the only thing the derivation and verification layers look at.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Largest thumbnail edge a custom tier may request.
pub const MAX_THUMBNAIL_SIZE: u32 = 4096;

// ─── Built-in tiers ──────────────────────────────────────────────────────────

/// The fixed tiers every installation ships with.
///
/// Parsing is case-sensitive: `"Basic"` is a built-in tier, `"basic"` is not.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
pub enum BuiltinTier {
  Basic,
  Premium,
  Enterprise,
}

impl BuiltinTier {
  /// Whether `name` would shadow a built-in tier. Compared
  /// case-insensitively so that custom tiers cannot impersonate one.
  pub fn is_reserved(name: &str) -> bool {
    let name = name.trim();
    Self::iter().any(|t| t.as_ref().eq_ignore_ascii_case(name))
  }
}

// ─── Custom tiers ────────────────────────────────────────────────────────────

/// A persisted, administrator-defined tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTierRecord {
  pub tier_id:                Uuid,
  pub name:                   String,
  /// Comma-separated thumbnail edge lengths, e.g. `"100,500"`.
  pub thumbnail_sizes:        String,
  pub original_file_link:     bool,
  pub expiring_links_enabled: bool,
}

/// Input to [`crate::store::RecordStore::create_custom_tier`] and
/// [`crate::store::RecordStore::update_custom_tier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomTier {
  pub name:                   String,
  pub thumbnail_sizes:        String,
  #[serde(default)]
  pub original_file_link:     bool,
  #[serde(default)]
  pub expiring_links_enabled: bool,
}

// ─── TierKind ────────────────────────────────────────────────────────────────

/// A tier resolved once per request and then matched exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierKind {
  Basic,
  Premium,
  Enterprise,
  Custom(CustomTierRecord),
}

impl From<BuiltinTier> for TierKind {
  fn from(tier: BuiltinTier) -> Self {
    match tier {
      BuiltinTier::Basic => Self::Basic,
      BuiltinTier::Premium => Self::Premium,
      BuiltinTier::Enterprise => Self::Enterprise,
    }
  }
}

impl TierKind {
  pub fn name(&self) -> &str {
    match self {
      Self::Basic => BuiltinTier::Basic.as_ref(),
      Self::Premium => BuiltinTier::Premium.as_ref(),
      Self::Enterprise => BuiltinTier::Enterprise.as_ref(),
      Self::Custom(record) => &record.name,
    }
  }

  pub fn policy(&self) -> TierPolicy {
    match self {
      Self::Basic => TierPolicy {
        thumbnail_sizes:        BTreeSet::from([200]),
        grants_original_access: false,
        grants_expiring_links:  false,
      },
      Self::Premium => TierPolicy {
        thumbnail_sizes:        BTreeSet::from([200, 400]),
        grants_original_access: true,
        grants_expiring_links:  false,
      },
      Self::Enterprise => TierPolicy {
        thumbnail_sizes:        BTreeSet::from([200, 400]),
        grants_original_access: true,
        grants_expiring_links:  true,
      },
      Self::Custom(record) => TierPolicy {
        thumbnail_sizes:        parse_sizes(&record.thumbnail_sizes),
        grants_original_access: record.original_file_link,
        grants_expiring_links:  record.expiring_links_enabled,
      },
    }
  }
}

// ─── TierPolicy ──────────────────────────────────────────────────────────────

/// What a tier allows. Never persisted; always derived from a [`TierKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
  pub thumbnail_sizes:        BTreeSet<u32>,
  pub grants_original_access: bool,
  pub grants_expiring_links:  bool,
}

impl Default for TierPolicy {
  /// The policy of an account without a tier: `Basic`.
  fn default() -> Self { TierKind::Basic.policy() }
}

impl TierPolicy {
  /// Layer `other` on top of `self`: sizes are unioned, grants are OR-ed.
  pub fn merge(mut self, other: &TierPolicy) -> Self {
    self.thumbnail_sizes.extend(other.thumbnail_sizes.iter().copied());
    self.grants_original_access |= other.grants_original_access;
    self.grants_expiring_links |= other.grants_expiring_links;
    self
  }
}

/// Parse a comma-separated size list such as `"200, 400,800"`.
///
/// Blank entries are skipped. If any entry is not an integer in
/// `1..=MAX_THUMBNAIL_SIZE` the whole list is treated as malformed and the
/// result is empty.
pub fn parse_sizes(list: &str) -> BTreeSet<u32> {
  let mut sizes = BTreeSet::new();
  for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
    match entry.parse::<u32>() {
      Ok(size) if (1..=MAX_THUMBNAIL_SIZE).contains(&size) => {
        sizes.insert(size);
      }
      _ => {
        tracing::warn!(list, entry, "malformed thumbnail size list");
        return BTreeSet::new();
      }
    }
  }
  sizes
}
