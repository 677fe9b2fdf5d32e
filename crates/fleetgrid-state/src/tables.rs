//! redb table definitions for the FleetGrid state store.
//!
//! Group-scoped tables use composite `&str` keys (`{group_id}/{name}`) so
//! one group's records form a contiguous, prefix-scannable range. The member
//! claim table keys directly on the cluster id.

use redb::TableDefinition;

/// Group records keyed by `{group_id}`.
pub const GROUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("groups");

/// Member claims: `cluster_id -> group_id`. One claim per cluster,
/// system-wide; written in the same transaction as the owning group.
pub const MEMBERS: TableDefinition<u64, &str> = TableDefinition::new("members");

/// Feature state keyed by `{group_id}/{feature_name}`.
pub const FEATURES: TableDefinition<&str, &[u8]> = TableDefinition::new("features");

/// Deployment records keyed by `{group_id}/{release_name}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");
