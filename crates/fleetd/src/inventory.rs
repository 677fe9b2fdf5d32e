//! clusters.toml inventory parser.
//!
//! The daemon resolves member clusters through a static inventory file
//! until a live platform directory is wired in:
//!
//! ```toml
//! [[clusters]]
//! id = 1
//! organization_id = 10
//! name = "prod-eu-1"
//! kubeconfig = "/etc/fleetgrid/kubeconfigs/prod-eu-1.yaml"
//!
//! [[clusters]]
//! id = 2
//! organization_id = 10
//! name = "prod-us-1"
//! ready = false
//! status = "CREATING"
//! ```

use std::path::{Path, PathBuf};

use fleetgrid_core::{StaticCluster, StaticDirectory};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub clusters: Vec<ClusterEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ClusterEntry {
    pub id: u64,
    pub organization_id: u64,
    pub name: String,
    #[serde(default = "default_ready")]
    pub ready: bool,
    pub status: Option<String>,
    /// Path to the cluster's kubeconfig file.
    pub kubeconfig: Option<PathBuf>,
}

fn default_ready() -> bool {
    true
}

impl Inventory {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let inventory: Inventory = toml::from_str(&content)?;
        Ok(inventory)
    }

    /// Build a directory from the inventory, reading kubeconfig files.
    pub fn into_directory(self) -> anyhow::Result<StaticDirectory> {
        let mut directory = StaticDirectory::new();
        for entry in self.clusters {
            let mut cluster = StaticCluster::new(entry.id, entry.organization_id, &entry.name)
                .with_ready(entry.ready);
            if let Some(status) = &entry.status {
                cluster = cluster.with_status(status);
            }
            if let Some(path) = &entry.kubeconfig {
                cluster = cluster.with_kube_config(std::fs::read(path)?);
            }
            directory.register(cluster);
        }
        Ok(directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let toml_str = r#"
[[clusters]]
id = 1
organization_id = 10
name = "prod-eu-1"
"#;
        let inventory: Inventory = toml::from_str(toml_str).unwrap();
        assert_eq!(inventory.clusters.len(), 1);
        assert_eq!(inventory.clusters[0].name, "prod-eu-1");
        assert!(inventory.clusters[0].ready);
        assert!(inventory.clusters[0].kubeconfig.is_none());
    }

    #[test]
    fn parse_overrides() {
        let toml_str = r#"
[[clusters]]
id = 2
organization_id = 10
name = "prod-us-1"
ready = false
status = "CREATING"
"#;
        let inventory: Inventory = toml::from_str(toml_str).unwrap();
        assert!(!inventory.clusters[0].ready);
        assert_eq!(inventory.clusters[0].status.as_deref(), Some("CREATING"));
    }

    #[test]
    fn empty_inventory_is_valid() {
        let inventory: Inventory = toml::from_str("").unwrap();
        assert!(inventory.clusters.is_empty());
        let directory = inventory.into_directory().unwrap();
        assert!(directory.is_empty());
    }

    #[tokio::test]
    async fn directory_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.toml");
        std::fs::write(
            &path,
            r#"
[[clusters]]
id = 1
organization_id = 10
name = "prod-eu-1"
"#,
        )
        .unwrap();

        let directory = Inventory::from_file(&path).unwrap().into_directory().unwrap();
        assert_eq!(directory.len(), 1);

        use fleetgrid_core::ClusterDirectory;
        let cluster = directory.get_by_id_only(1).await.unwrap();
        assert_eq!(cluster.name(), "prod-eu-1");
        assert!(cluster.is_ready().await.unwrap());
    }
}
