//! HTTP Basic-auth extractor resolving the caller's account and tier policy.

use std::sync::LazyLock;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use pictier_core::{account::Account, store::RecordStore, tier::TierPolicy};

use crate::{AppState, error::ApiError};

/// The authenticated caller and the policy its tier resolves to.
#[derive(Debug, Clone)]
pub struct Principal {
  pub account: Account,
  pub policy:  TierPolicy,
}

/// Hash checked when the username is unknown, so a miss costs the same
/// argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
  let salt = SaltString::from_b64("cGljdGllcmR1bW15c2FsdA").ok()?;
  Argon2::default()
    .hash_password(b"pictier-dummy-password", &salt)
    .ok()
    .map(|hash| hash.to_string())
});

/// Pull `(username, password)` out of an `Authorization: Basic` header.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), ApiError> {
  let parsed_hash = PasswordHash::new(password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for Principal
where
  S: RecordStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;

    let account = state
      .store
      .find_account_by_username(&username)
      .await
      .map_err(ApiError::store)?;

    let Some(account) = account else {
      if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(&password, hash);
      }
      return Err(ApiError::Unauthorized);
    };

    verify_password(&password, &account.password_hash)?;

    let policy = state.registry.resolve_account(&account).await?;
    Ok(Principal { account, policy })
  }
}
