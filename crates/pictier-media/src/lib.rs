//! Filesystem-backed media handling for pictier.
//!
//! - [`layout`] maps assets and sizes to deterministic relative paths.
//! - [`store::LocalAssetStore`] reads, writes and streams files under a root.
//! - [`codec`] turns an original image into a thumbnail.
//! - [`derive::DerivationEngine`] produces every variant a policy allows.
//! - [`verify::AccessVerifier`] answers fetch-time allow/deny questions.

pub mod codec;
pub mod derive;
pub mod error;
pub mod layout;
pub mod store;
pub mod verify;

pub use derive::{DerivationEngine, DerivationReport};
pub use error::{DerivationFailure, Error, Result};
pub use store::LocalAssetStore;
pub use verify::AccessVerifier;
