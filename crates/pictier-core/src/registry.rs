//! The tier registry: tier name → [`TierKind`] → [`TierPolicy`].
//!
//! The registry is a thin, stateless layer over an injected
//! [`TierProvider`]. Built-in names are checked first and are reserved, so a
//! custom tier can never shadow one.

use std::{str::FromStr, sync::Arc};

use crate::{
  Error, Result,
  account::Account,
  store::TierProvider,
  tier::{BuiltinTier, TierKind, TierPolicy},
};

pub struct TierRegistry<P> {
  provider: Arc<P>,
}

impl<P> Clone for TierRegistry<P> {
  fn clone(&self) -> Self {
    Self {
      provider: Arc::clone(&self.provider),
    }
  }
}

impl<P: TierProvider> TierRegistry<P> {
  pub fn new(provider: Arc<P>) -> Self { Self { provider } }

  /// Resolve a tier name to its tagged kind.
  ///
  /// An absent or blank name resolves to [`TierKind::Basic`]. A name that is
  /// neither built-in nor a known custom tier fails with
  /// [`Error::UnknownTier`].
  pub async fn resolve_kind(&self, name: Option<&str>) -> Result<TierKind> {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
      return Ok(TierKind::Basic);
    };

    if let Ok(builtin) = BuiltinTier::from_str(name) {
      return Ok(builtin.into());
    }

    self
      .provider
      .find_custom_tier(name)
      .await
      .map_err(|e| Error::Provider(Box::new(e)))?
      .map(TierKind::Custom)
      .ok_or_else(|| Error::UnknownTier(name.to_owned()))
  }

  /// Resolve a tier name straight to its policy.
  pub async fn resolve(&self, name: Option<&str>) -> Result<TierPolicy> {
    Ok(self.resolve_kind(name).await?.policy())
  }

  /// Resolve the effective policy of an account: its named tier, with the
  /// directly referenced custom tier (if any) layered on top.
  pub async fn resolve_account(&self, account: &Account) -> Result<TierPolicy> {
    let policy = self.resolve(account.account_tier.as_deref()).await?;

    let Some(tier_id) = account.custom_tier else {
      return Ok(policy);
    };

    let record = self
      .provider
      .get_custom_tier(tier_id)
      .await
      .map_err(|e| Error::Provider(Box::new(e)))?;

    match record {
      Some(record) => Ok(policy.merge(&TierKind::Custom(record).policy())),
      None => {
        tracing::warn!(
          account_id = %account.account_id,
          %tier_id,
          "account references a missing custom tier; ignoring it"
        );
        Ok(policy)
      }
    }
  }
}
