//! The derivation engine: one upload plus one policy in, every permitted
//! variant out.
//!
//! Thumbnail sizes are independent files, so they are produced concurrently.
//! A shared semaphore bounds how many decode/resize jobs run at once across
//! all uploads. A failing size is reported in its own slot and never aborts
//! the rest.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use bytes::Bytes;
use pictier_core::{
  asset::{AccessDescriptor, Asset, EXPIRING_VARIANT, ORIGINAL_VARIANT, thumbnail_variant},
  tier::TierPolicy,
};
use pictier_token::{DEFAULT_TTL_SECS, TokenCodec};
use tokio::{
  sync::Semaphore,
  task::{self, JoinSet},
};
use tracing::{debug, warn};

use crate::{DerivationFailure, Error, Result, codec, layout, store::LocalAssetStore};

// ─── Report ──────────────────────────────────────────────────────────────────

/// Outcome of one derivation run, keyed by variant (`"200px"`, `"original"`,
/// `"expiring"`).
#[derive(Debug, Default)]
pub struct DerivationReport {
  pub variants: BTreeMap<String, Result<AccessDescriptor, DerivationFailure>>,
}

impl DerivationReport {
  /// The variants that were produced.
  pub fn descriptors(&self) -> BTreeMap<String, AccessDescriptor> {
    self
      .variants
      .iter()
      .filter_map(|(k, v)| v.as_ref().ok().map(|d| (k.clone(), d.clone())))
      .collect()
  }

  pub fn into_descriptors(self) -> BTreeMap<String, AccessDescriptor> {
    self
      .variants
      .into_iter()
      .filter_map(|(k, v)| v.ok().map(|d| (k, d)))
      .collect()
  }

  pub fn failures(&self) -> impl Iterator<Item = (&str, &DerivationFailure)> {
    self
      .variants
      .iter()
      .filter_map(|(k, v)| v.as_ref().err().map(|e| (k.as_str(), e)))
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DerivationEngine {
  store:        LocalAssetStore,
  tokens:       Arc<TokenCodec>,
  permits:      Arc<Semaphore>,
  expiring_ttl: u64,
}

impl DerivationEngine {
  /// `workers` bounds concurrent thumbnail jobs; zero is treated as one.
  pub fn new(store: LocalAssetStore, tokens: Arc<TokenCodec>, workers: usize) -> Self {
    Self {
      store,
      tokens,
      permits: Arc::new(Semaphore::new(workers.max(1))),
      expiring_ttl: DEFAULT_TTL_SECS,
    }
  }

  #[cfg(test)]
  pub(crate) fn permits(&self) -> Arc<Semaphore> { Arc::clone(&self.permits) }

  /// Lifetime of the `"expiring"` token issued at upload time.
  pub fn with_expiring_ttl(mut self, secs: u64) -> Self {
    self.expiring_ttl = secs;
    self
  }

  /// Derive every variant `policy` allows, reading the original from the
  /// store. Fails only if the original cannot be read.
  pub async fn derive_all(&self, asset: &Asset, policy: &TierPolicy) -> Result<DerivationReport> {
    let original = Bytes::from(self.store.read(&asset.storage_path).await?);
    Ok(self.derive_from(asset, original, policy).await)
  }

  /// Derive every variant `policy` allows from original bytes already in
  /// hand.
  pub async fn derive_from(
    &self,
    asset: &Asset,
    original: Bytes,
    policy: &TierPolicy,
  ) -> DerivationReport {
    let mut report = DerivationReport::default();

    let mut jobs  = JoinSet::new();
    let mut sizes = HashMap::new();
    for &size in &policy.thumbnail_sizes {
      let engine       = self.clone();
      let original     = original.clone();
      let storage_path = asset.storage_path.clone();
      let handle = jobs.spawn(async move {
        engine.derive_thumbnail(&storage_path, original, size).await
      });
      sizes.insert(handle.id(), size);
    }

    for (size, outcome) in join_thumbnails(jobs, sizes).await {
      let entry = outcome
        .map(|()| AccessDescriptor::Path(layout::thumbnail_descriptor(asset.asset_id, size)))
        .map_err(|source| DerivationFailure::Thumbnail { size, source });
      report.variants.insert(thumbnail_variant(size), entry);
    }

    if policy.grants_original_access {
      report.variants.insert(
        ORIGINAL_VARIANT.to_owned(),
        Ok(AccessDescriptor::Path(layout::original_descriptor(asset.asset_id))),
      );
    }

    if policy.grants_expiring_links {
      let entry = self
        .tokens
        .encode(asset.asset_id, self.expiring_ttl)
        .map(AccessDescriptor::Token)
        .map_err(DerivationFailure::from);
      report.variants.insert(EXPIRING_VARIANT.to_owned(), entry);
    }

    for (variant, failure) in report.failures() {
      warn!(asset_id = %asset.asset_id, variant, error = %failure, "variant derivation failed");
    }
    debug!(
      asset_id = %asset.asset_id,
      produced = report.variants.len() - report.failures().count(),
      "derivation finished"
    );

    report
  }

  /// Resize and write one thumbnail. Holds a worker permit throughout.
  async fn derive_thumbnail(&self, storage_path: &str, original: Bytes, size: u32) -> Result<()> {
    let _permit = Arc::clone(&self.permits).acquire_owned().await?;

    let encoded = tokio::task::spawn_blocking(move || codec::thumbnail(&original, size)).await??;

    self
      .store
      .write(&layout::thumbnail_path(storage_path, size), &encoded)
      .await
  }
}

/// Wait for every thumbnail job. A job that panicked or was cancelled is
/// reported against its own size as [`Error::Join`].
pub(crate) async fn join_thumbnails(
  mut jobs:  JoinSet<Result<()>>,
  mut sizes: HashMap<task::Id, u32>,
) -> Vec<(u32, Result<()>)> {
  let mut done = Vec::with_capacity(sizes.len());
  while let Some(joined) = jobs.join_next_with_id().await {
    let (id, outcome) = match joined {
      Ok((id, outcome)) => (id, outcome),
      Err(e) => (e.id(), Err(Error::Join(e))),
    };
    if let Some(size) = sizes.remove(&id) {
      done.push((size, outcome));
    }
  }
  done
}
