//! The `TierProvider` and `RecordStore` traits.
//!
//! Both are implemented by storage backends (e.g. `pictier-store-sqlite`).
//! Higher layers (`pictier-media`, `pictier-server`) depend on these
//! abstractions, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  account::{Account, NewAccount},
  asset::{Asset, NewAsset},
  tier::{CustomTierRecord, NewCustomTier},
};

// ─── Tier lookup capability ──────────────────────────────────────────────────

/// Read-only access to custom tier records.
///
/// This is the only capability the [`TierRegistry`](crate::registry) needs.
/// Any caching belongs to the implementation, not to the registry.
pub trait TierProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up a custom tier by its exact name.
  fn find_custom_tier<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<CustomTierRecord>, Self::Error>> + Send + 'a;

  /// Look up a custom tier by id.
  fn get_custom_tier(
    &self,
    tier_id: Uuid,
  ) -> impl Future<Output = Result<Option<CustomTierRecord>, Self::Error>> + Send + '_;
}

// ─── Record store ────────────────────────────────────────────────────────────

/// Abstraction over the persistent record store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: TierProvider {
  // ── Accounts ──────────────────────────────────────────────────────────

  /// Create an account. The tier name, if any, is validated exactly as in
  /// [`RecordStore::set_account_tier`].
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn find_account_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Assign a tier by name, or clear it with `None`.
  ///
  /// Fails with an unknown-tier error unless the name is a built-in tier or
  /// an existing custom tier. This is the assignment-time validation point.
  fn set_account_tier(
    &self,
    account_id: Uuid,
    tier_name: Option<String>,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Point the account at a custom tier record whose policy is layered on
  /// top of `account_tier`, or clear the reference.
  fn set_custom_tier(
    &self,
    account_id: Uuid,
    tier_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Delete an account and, by cascade, its asset records.
  fn delete_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Custom tiers ──────────────────────────────────────────────────────

  /// Create a custom tier. Names colliding with a built-in tier
  /// (case-insensitively) or an existing custom tier are rejected.
  fn create_custom_tier(
    &self,
    input: NewCustomTier,
  ) -> impl Future<Output = Result<CustomTierRecord, Self::Error>> + Send + '_;

  fn list_custom_tiers(
    &self,
  ) -> impl Future<Output = Result<Vec<CustomTierRecord>, Self::Error>> + Send + '_;

  /// Replace a custom tier's fields. A rename is propagated to every
  /// account whose `account_tier` named the old tier.
  fn update_custom_tier(
    &self,
    tier_id: Uuid,
    input: NewCustomTier,
  ) -> impl Future<Output = Result<CustomTierRecord, Self::Error>> + Send + '_;

  /// Delete a custom tier. Rejected while any account names it in
  /// `account_tier`; `custom_tier` references are cleared.
  fn delete_custom_tier(
    &self,
    tier_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Assets ────────────────────────────────────────────────────────────

  /// Persist an asset record; `created_at` is set by the store.
  fn record_asset(
    &self,
    input: NewAsset,
  ) -> impl Future<Output = Result<Asset, Self::Error>> + Send + '_;

  fn get_asset(
    &self,
    asset_id: Uuid,
  ) -> impl Future<Output = Result<Option<Asset>, Self::Error>> + Send + '_;

  /// All assets owned by `owner_id`, newest first.
  fn list_assets(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Asset>, Self::Error>> + Send + '_;

  /// Delete an asset record. Returns `false` if it did not exist.
  fn delete_asset(
    &self,
    asset_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
