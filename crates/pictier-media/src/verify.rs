//! Fetch-time access decisions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pictier_core::{asset::Asset, tier::TierPolicy};
use pictier_token::{TokenCodec, TokenError};
use uuid::Uuid;

use crate::{Result, layout, store::LocalAssetStore};

#[derive(Clone)]
pub struct AccessVerifier {
  store:  LocalAssetStore,
  tokens: Arc<TokenCodec>,
}

impl AccessVerifier {
  pub fn new(store: LocalAssetStore, tokens: Arc<TokenCodec>) -> Self { Self { store, tokens } }

  /// Original files are served to any requester whose own tier grants
  /// original access.
  pub fn authorize_original(&self, requester: &TierPolicy) -> bool {
    requester.grants_original_access
  }

  /// A thumbnail may be served iff it was derived. The requester's current
  /// tier plays no part.
  pub async fn authorize_thumbnail(&self, asset: &Asset, size: u32) -> Result<bool> {
    self
      .store
      .exists(&layout::thumbnail_path(&asset.storage_path, size))
      .await
  }

  /// Validate an expiring-link token and return the asset it names.
  pub fn authorize_expiring(&self, token: &str) -> Result<Uuid, TokenError> {
    self.authorize_expiring_at(token, Utc::now())
  }

  pub fn authorize_expiring_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
    Ok(self.tokens.verify(token, now)?.asset_id)
  }

  /// Mint a token for `asset_id` valid for `ttl_secs`.
  pub fn issue_link(&self, asset_id: Uuid, ttl_secs: u64) -> Result<String, TokenError> {
    self.tokens.encode(asset_id, ttl_secs)
  }
}
