//! fleetgrid-group — cluster group lifecycle.
//!
//! The [`GroupCoordinator`] owns group create/update/delete/get, enforces
//! the one-group-per-cluster and unique-name invariants, computes
//! membership deltas, and triggers feature reconciliation on every
//! membership change.
//!
//! Ordering rules the coordinator guarantees:
//!
//! - membership is persisted (and member claims settled) *before* feature
//!   handlers are reconciled, so handlers always observe committed state;
//! - at delete time every enabled feature is disabled *before* any record
//!   is removed, and a failed disable aborts the deletion with the group
//!   fully intact.

pub mod coordinator;
pub mod error;

pub use coordinator::GroupCoordinator;
pub use error::{GroupError, GroupResult};
