//! Persistence boundary for connection aggregates.
//!
//! This crate defines the store contract the service layer talks to:
//! - whole-aggregate load/insert/save, with the histories committed
//!   atomically alongside the fields they audit
//! - optimistic concurrency on save: the caller supplies the version it last
//!   observed, a mismatch is a conflict and persists nothing
//! - buyer-or-supplier listing ordered by most recent status change
//!
//! Design stance: the in-memory adapter is the deterministic reference
//! implementation for tests and composition; PostgreSQL (feature
//! `postgres`) is the transactional source of truth in deployments.

#![deny(unsafe_code)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{ConnectionStore, QueryWindow};
