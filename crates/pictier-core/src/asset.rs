//! Uploaded assets and the descriptors handed back for their variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded original image. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
  pub asset_id:     Uuid,
  pub owner_id:     Uuid,
  /// Path of the original, relative to the media root.
  pub storage_path: String,
  pub content_type: String,
  /// SHA-256 hex digest of the original bytes; served as the ETag.
  pub content_hash: String,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::record_asset`].
///
/// The asset id is chosen by the caller because the storage path embeds it
/// and the file is written before the record.
#[derive(Debug, Clone)]
pub struct NewAsset {
  pub asset_id:     Uuid,
  pub owner_id:     Uuid,
  pub storage_path: String,
  pub content_type: String,
  pub content_hash: String,
}

/// How a caller reaches one variant of an asset.
///
/// Serialises as a bare string so a variant map reads as
/// `{"200px": "/images/thumbnails/…", "expiring": "<token>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessDescriptor {
  /// A server-relative path, gated by tier or by file existence.
  Path(String),
  /// A self-contained signed token.
  Token(String),
}

impl AccessDescriptor {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Path(p) => p,
      Self::Token(t) => t,
    }
  }
}

/// Variant key for the original file.
pub const ORIGINAL_VARIANT: &str = "original";

/// Variant key for the signed, time-limited link.
pub const EXPIRING_VARIANT: &str = "expiring";

/// Variant key for a thumbnail of the given edge length, e.g. `"200px"`.
pub fn thumbnail_variant(size: u32) -> String { format!("{size}px") }
