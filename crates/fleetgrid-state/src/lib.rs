//! fleetgrid-state — embedded state store for FleetGrid.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for cluster groups, their feature states, and deployment records.
//!
//! # Architecture
//!
//! All records are JSON-serialized into redb's `&[u8]` value columns.
//! Feature and deployment records use composite keys
//! (`{group_id}/{feature}`, `{group_id}/{release}`) so a group's records can
//! be prefix-scanned and cascade-deleted.
//!
//! A dedicated member-claim table (`cluster_id -> group_id`) is written in
//! the same transaction as the owning group record; because redb serializes
//! write transactions, this makes the one-group-per-cluster invariant hold
//! even under concurrent saves.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
