//! Error types for `pictier-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The name matches neither a built-in tier nor a custom tier record.
  #[error("unknown tier: {0:?}")]
  UnknownTier(String),

  #[error("custom tier not found: {0}")]
  CustomTierNotFound(Uuid),

  #[error("tier name must not be empty")]
  EmptyTierName,

  #[error("tier name {0:?} is reserved for a built-in tier")]
  ReservedTierName(String),

  #[error("a custom tier named {0:?} already exists")]
  DuplicateTierName(String),

  #[error("tier {0:?} is still assigned to at least one account")]
  TierInUse(String),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("username {0:?} is already taken")]
  DuplicateUsername(String),

  #[error("asset not found: {0}")]
  AssetNotFound(Uuid),

  #[error("tier provider error: {0}")]
  Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
