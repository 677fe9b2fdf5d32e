//! fleetgrid-dispatch — concurrent per-cluster invoke-and-collect.
//!
//! [`fan_out`] runs one operation per member cluster in parallel and blocks
//! the caller until every result has been collected. Contract:
//!
//! - every target is attempted exactly once; an operation's failure is data
//!   encoded into its result, never a dispatcher-level error and never a
//!   skipped target;
//! - the join is counted — the `JoinSet` is drained to completion, so the
//!   caller always receives one result per target, not a best-effort subset;
//! - results arrive in completion order; callers correlate by the
//!   cluster id/name tag, never by input order;
//! - no retry, no timeout, no cross-target cancellation — a slow or failing
//!   member never affects its siblings. Deadlines belong inside the
//!   operation closure.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use fleetgrid_core::{Cluster, ClusterId};
use tokio::task::JoinSet;
use tracing::error;

/// One per-cluster outcome, tagged with the originating cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult<R> {
    pub cluster_id: ClusterId,
    pub cluster_name: String,
    pub outcome: R,
}

/// Run `op` against every member cluster concurrently and collect all
/// results.
///
/// Spawns one task per cluster; the caller suspends until the last task has
/// been joined. The operation future must be `'static` — it is handed its
/// own cluster handle.
pub async fn fan_out<R, F, Fut>(
    member_clusters: &HashMap<String, Arc<dyn Cluster>>,
    op: F,
) -> Vec<DispatchResult<R>>
where
    F: Fn(Arc<dyn Cluster>) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let mut tasks = JoinSet::new();
    for cluster in member_clusters.values() {
        let cluster_id = cluster.id();
        let cluster_name = cluster.name().to_string();
        let fut = op(cluster.clone());
        tasks.spawn(async move {
            DispatchResult {
                cluster_id,
                cluster_name,
                outcome: fut.await,
            }
        });
    }

    let mut results = Vec::with_capacity(member_clusters.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            // An aborted/panicked task can't be attributed to a cluster
            // anymore; surface it loudly instead of hanging the join.
            Err(e) => error!(error = %e, "dispatch task aborted"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrid_core::StaticCluster;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn clusters(names: &[&str]) -> HashMap<String, Arc<dyn Cluster>> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let cluster: Arc<dyn Cluster> =
                    Arc::new(StaticCluster::new(i as u64 + 1, 1, name));
                (name.to_string(), cluster)
            })
            .collect()
    }

    #[tokio::test]
    async fn collects_one_result_per_target() {
        let targets = clusters(&["c1", "c2", "c3"]);

        let results = fan_out(&targets, |cluster| async move {
            if cluster.name() == "c2" {
                format!("FAILED: install refused on {}", cluster.name())
            } else {
                "SUCCEEDED".to_string()
            }
        })
        .await;

        assert_eq!(results.len(), 3);
        let status_of = |name: &str| {
            results
                .iter()
                .find(|r| r.cluster_name == name)
                .unwrap()
                .outcome
                .clone()
        };
        assert_eq!(status_of("c1"), "SUCCEEDED");
        assert_eq!(status_of("c3"), "SUCCEEDED");
        assert!(status_of("c2").starts_with("FAILED:"));
    }

    #[tokio::test]
    async fn targets_run_concurrently() {
        let targets = clusters(&["c1", "c2", "c3"]);
        // All three operations must be in flight at once to pass the
        // barrier; sequential execution would deadlock here.
        let barrier = Arc::new(Barrier::new(3));

        let results = fan_out(&targets, |cluster| {
            let barrier = barrier.clone();
            async move {
                barrier.wait().await;
                cluster.id()
            }
        })
        .await;

        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn slow_target_does_not_block_siblings_from_completing() {
        let targets = clusters(&["fast", "slow"]);

        let results = fan_out(&targets, |cluster| async move {
            if cluster.name() == "slow" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            cluster.name().to_string()
        })
        .await;

        // The caller still gets both results; the slow one is last.
        assert_eq!(results.len(), 2);
        assert_eq!(results.last().unwrap().outcome, "slow");
    }

    #[tokio::test]
    async fn results_are_tagged_with_cluster_identity() {
        let targets = clusters(&["c1"]);
        let results = fan_out(&targets, |_| async {}).await;

        assert_eq!(results[0].cluster_id, 1);
        assert_eq!(results[0].cluster_name, "c1");
    }

    #[tokio::test]
    async fn empty_target_set_yields_no_results() {
        let targets: HashMap<String, Arc<dyn Cluster>> = HashMap::new();
        let results = fan_out(&targets, |_| async { 0u32 }).await;
        assert!(results.is_empty());
    }
}
