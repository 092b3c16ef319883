//! Signed, time-limited access tokens for pictier.
//!
//! A token names one asset and an expiry instant. It is stateless: nothing is
//! stored server-side, and expiry is the only way a token stops working.
//! Pure synchronous; no HTTP or database dependencies.
//!
//! # Format
//!
//! ```text
//! base64url(json{asset_id, expires_at}) "." base64url(hmac_sha256(payload))
//! ```
//!
//! Both segments use the URL-safe alphabet without padding, so a token can be
//! dropped into a path segment or query string unescaped.
//!
//! # Quick start
//!
//! ```no_run
//! use pictier_token::TokenCodec;
//! use uuid::Uuid;
//!
//! let codec = TokenCodec::new([7u8; 32]).unwrap();
//! let token = codec.encode(Uuid::new_v4(), 1800).unwrap();
//! let claims = codec.verify(&token, chrono::Utc::now()).unwrap();
//! println!("asset {} until {}", claims.asset_id, claims.expires_at);
//! ```

pub mod error;

use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

pub use error::{Result, TokenError};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a link when the caller does not pick one: 30 minutes.
pub const DEFAULT_TTL_SECS: u64 = 1800;

/// Shortest signing secret accepted, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The signed payload of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub asset_id:   Uuid,
  /// Whole seconds since the Unix epoch.
  #[serde(with = "chrono::serde::ts_seconds")]
  pub expires_at: DateTime<Utc>,
}

impl Claims {
  /// A token is live strictly before its expiry instant.
  pub fn check_expiry(&self, now: DateTime<Utc>) -> Result<()> {
    if now < self.expires_at {
      Ok(())
    } else {
      Err(TokenError::Expired)
    }
  }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

/// Mints and checks tokens under one process-wide secret.
///
/// The keyed MAC state is computed once in [`TokenCodec::new`] and cloned
/// per operation.
#[derive(Clone)]
pub struct TokenCodec {
  mac: HmacSha256,
}

impl fmt::Debug for TokenCodec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TokenCodec").finish_non_exhaustive()
  }
}

impl TokenCodec {
  /// Build a codec from the signing secret.
  pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
    let secret = secret.as_ref();
    if secret.len() < MIN_SECRET_LEN {
      return Err(TokenError::WeakSecret {
        len: secret.len(),
        min: MIN_SECRET_LEN,
      });
    }
    let mac = HmacSha256::new_from_slice(secret).map_err(|_| {
      TokenError::WeakSecret {
        len: secret.len(),
        min: MIN_SECRET_LEN,
      }
    })?;
    Ok(Self { mac })
  }

  /// Mint a token for `asset_id` that expires `ttl_secs` from now.
  pub fn encode(&self, asset_id: Uuid, ttl_secs: u64) -> Result<String> {
    self.encode_at(asset_id, ttl_secs, Utc::now())
  }

  /// Mint a token relative to an explicit clock reading.
  pub fn encode_at(
    &self,
    asset_id: Uuid,
    ttl_secs: u64,
    now: DateTime<Utc>,
  ) -> Result<String> {
    let expires_at = i64::try_from(ttl_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .and_then(|ttl| now.checked_add_signed(ttl))
      .ok_or(TokenError::TtlOutOfRange(ttl_secs))?;

    let claims = Claims {
      asset_id,
      expires_at,
    };
    let payload = B64.encode(serde_json::to_vec(&claims)?);
    let signature = B64.encode(self.sign(payload.as_bytes()));

    Ok(format!("{payload}.{signature}"))
  }

  /// Check the signature and return the claims. Expiry is *not* checked;
  /// see [`TokenCodec::verify`].
  ///
  /// Every malformed input collapses into [`TokenError::BadSignature`] so
  /// callers cannot tell which part of a forged token was wrong.
  pub fn decode(&self, token: &str) -> Result<Claims> {
    let (payload, signature) =
      token.split_once('.').ok_or(TokenError::BadSignature)?;
    let signature = B64
      .decode(signature)
      .map_err(|_| TokenError::BadSignature)?;

    let mut mac = self.mac.clone();
    mac.update(payload.as_bytes());
    mac
      .verify_slice(&signature)
      .map_err(|_| TokenError::BadSignature)?;

    let raw = B64.decode(payload).map_err(|_| TokenError::BadSignature)?;
    serde_json::from_slice(&raw).map_err(|_| TokenError::BadSignature)
  }

  /// Decode and reject tokens whose expiry is not after `now`.
  pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
    let claims = self.decode(token)?;
    claims.check_expiry(now)?;
    Ok(claims)
  }

  fn sign(&self, payload: &[u8]) -> Vec<u8> {
    let mut mac = self.mac.clone();
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
  }
}
