//! Error types for `pictier-media`.

use pictier_token::TokenError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no such file: {0}")]
  NotFound(String),

  /// Absolute, parent-relative, or empty storage path.
  #[error("invalid storage path: {0:?}")]
  InvalidPath(String),

  #[error("i/o error on {path}: {source}")]
  Io {
    path:   String,
    #[source]
    source: std::io::Error,
  },

  #[error("image codec error: {0}")]
  Codec(#[from] image::ImageError),

  #[error("derivation pool is closed")]
  PoolClosed(#[from] tokio::sync::AcquireError),

  #[error("background task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  /// Wrap an I/O error, folding `NotFound` into [`Error::NotFound`].
  pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
    if source.kind() == std::io::ErrorKind::NotFound {
      Self::NotFound(path.to_owned())
    } else {
      Self::Io {
        path: path.to_owned(),
        source,
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why one variant is missing from a [`crate::DerivationReport`].
#[derive(Debug, Error)]
pub enum DerivationFailure {
  #[error("{size}px thumbnail: {source}")]
  Thumbnail {
    size:   u32,
    #[source]
    source: Error,
  },

  #[error("expiring link: {0}")]
  Token(#[from] TokenError),
}
