//! Error types for the pictier-token codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
  /// Malformed, tampered with, or signed under a different key.
  #[error("token signature does not verify")]
  BadSignature,

  #[error("token has expired")]
  Expired,

  #[error("signing secret is {len} bytes; at least {min} are required")]
  WeakSecret { len: usize, min: usize },

  #[error("token lifetime of {0}s is out of range")]
  TtlOutOfRange(u64),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = TokenError> = std::result::Result<T, E>;
