//! Core types and trait definitions for pictier.
//!
//! This crate is deliberately free of HTTP, filesystem, and database
//! dependencies. It owns the tier model, the record-store abstraction, and
//! the tier registry that turns a tier name into a concrete policy.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod asset;
pub mod error;
pub mod registry;
pub mod store;
pub mod tier;

pub use error::{Error, Result};
