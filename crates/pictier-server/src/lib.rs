//! HTTP surface for pictier.
//!
//! Exposes an axum [`Router`] for uploading images and fetching their
//! variants, backed by any [`RecordStore`] and a local media root.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{MethodRouter, delete, get},
};
use pictier_core::{registry::TierRegistry, store::RecordStore};
use pictier_media::{AccessVerifier, DerivationEngine, LocalAssetStore};
use pictier_token::{DEFAULT_TTL_SECS, TokenCodec, TokenError};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{expiring, images, original, thumbnail, upload};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PICTIER_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                       String,
  #[serde(default = "defaults::port")]
  pub port:                       u16,
  #[serde(default = "defaults::store_path")]
  pub store_path:                 PathBuf,
  #[serde(default = "defaults::media_root")]
  pub media_root:                 PathBuf,
  /// HMAC key for expiring links; at least 32 bytes.
  #[serde(default)]
  pub signing_secret:             String,
  #[serde(default = "defaults::default_link_ttl_secs")]
  pub default_link_ttl_secs:      u64,
  #[serde(default = "defaults::max_link_ttl_secs")]
  pub max_link_ttl_secs:          u64,
  #[serde(default = "defaults::derivation_workers")]
  pub derivation_workers:         usize,
  #[serde(default = "defaults::max_upload_bytes")]
  pub max_upload_bytes:           usize,
  /// Serve originals and expiring links to the asset owner only.
  #[serde(default)]
  pub restrict_original_to_owner: bool,
}

mod defaults {
  use std::path::PathBuf;

  pub fn host() -> String { "127.0.0.1".to_owned() }
  pub fn port() -> u16 { 8080 }
  pub fn store_path() -> PathBuf { PathBuf::from("pictier.db") }
  pub fn media_root() -> PathBuf { PathBuf::from("media") }
  pub fn default_link_ttl_secs() -> u64 { super::DEFAULT_TTL_SECS }
  pub fn max_link_ttl_secs() -> u64 { 86_400 }
  pub fn derivation_workers() -> usize { 4 }
  pub fn max_upload_bytes() -> usize { 20 * 1024 * 1024 }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S: RecordStore> {
  pub store:    Arc<S>,
  pub registry: TierRegistry<S>,
  pub engine:   DerivationEngine,
  pub verifier: AccessVerifier,
  pub media:    LocalAssetStore,
  pub config:   Arc<ServerConfig>,
}

impl<S: RecordStore> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      registry: self.registry.clone(),
      engine:   self.engine.clone(),
      verifier: self.verifier.clone(),
      media:    self.media.clone(),
      config:   Arc::clone(&self.config),
    }
  }
}

impl<S: RecordStore> AppState<S> {
  /// Wire up the registry, derivation engine and verifier. Fails if the
  /// signing secret is too short.
  pub fn new(store: Arc<S>, config: ServerConfig) -> Result<Self, TokenError> {
    let tokens = Arc::new(TokenCodec::new(config.signing_secret.as_bytes())?);
    let media = LocalAssetStore::new(&config.media_root);
    let engine = DerivationEngine::new(
      media.clone(),
      Arc::clone(&tokens),
      config.derivation_workers,
    )
    .with_expiring_ttl(config.default_link_ttl_secs);

    Ok(Self {
      registry: TierRegistry::new(Arc::clone(&store)),
      verifier: AccessVerifier::new(media.clone(), tokens),
      store,
      engine,
      media,
      config: Arc::new(config),
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the pictier [`Router`].
///
/// Fetch routes answer with and without a trailing slash, matching the
/// descriptor paths handed out at upload time.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: RecordStore + 'static,
{
  let body_limit = state.config.max_upload_bytes;

  let routes = Router::new();
  let routes = slashed(routes, "/images", get(images::list::<S>).post(upload::handler::<S>));
  let routes = slashed(routes, "/images/{asset_id}", delete(images::remove::<S>));
  let routes = slashed(routes, "/images/original/{asset_id}", get(original::handler::<S>));
  let routes = slashed(routes, "/images/thumbnails/{asset_id}/{size}", get(thumbnail::handler::<S>));
  let routes = slashed(routes, "/images/{asset_id}/expiring-link", get(expiring::issue::<S>));
  let routes = slashed(routes, "/images/expiring/{token}", get(expiring::fetch::<S>));

  routes
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Register `path` and `path/` with the same handlers.
fn slashed<S>(
  router: Router<AppState<S>>,
  path:   &str,
  method: MethodRouter<AppState<S>>,
) -> Router<AppState<S>>
where
  S: RecordStore + 'static,
{
  router
    .route(path, method.clone())
    .route(&format!("{path}/"), method)
}

#[cfg(test)]
mod tests;
