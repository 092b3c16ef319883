//! Accounts — the principals that own assets and carry a tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account.
///
/// `account_tier` is a tier *name* resolved against the built-in tiers first
/// and the custom tier records second. `custom_tier` is an optional direct
/// reference to a custom tier whose policy is layered on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:    Uuid,
  pub username:      String,
  /// PHC string produced by argon2; never serialised to clients.
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub account_tier:  Option<String>,
  pub custom_tier:   Option<Uuid>,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username:      String,
  pub password_hash: String,
  pub account_tier:  Option<String>,
}
