//! fleetd — the FleetGrid daemon.
//!
//! Single binary that assembles the cluster-group control plane:
//! - State store (redb)
//! - Cluster directory (static inventory file)
//! - Feature handler registry + reconciler
//! - Group and deployment coordinators
//! - REST API
//!
//! # Usage
//!
//! ```text
//! fleetd serve --port 8080 --data-dir /var/lib/fleetgrid --inventory clusters.toml
//! ```

mod inventory;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use fleetgrid_api::ApiState;
use fleetgrid_core::StaticDirectory;
use fleetgrid_deploy::{DeploymentCoordinator, DryRunChartEngine};
use fleetgrid_feature::{
    FEDERATION_FEATURE, FeatureReconciler, FederationHandler, HandlerRegistry,
    SERVICE_MESH_FEATURE, ServiceMeshHandler,
};
use fleetgrid_group::GroupCoordinator;

use crate::inventory::Inventory;

#[derive(Parser)]
#[command(name = "fleetd", about = "FleetGrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control plane.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/fleetgrid")]
        data_dir: PathBuf,

        /// Cluster inventory file (clusters.toml).
        #[arg(long)]
        inventory: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetd=debug,fleetgrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            data_dir,
            inventory,
        } => run_serve(port, data_dir, inventory).await,
    }
}

async fn run_serve(
    port: u16,
    data_dir: PathBuf,
    inventory: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("FleetGrid daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("fleetgrid.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // State store.
    let store = fleetgrid_state::StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    // Cluster directory.
    let directory = match inventory {
        Some(path) => {
            let directory = Inventory::from_file(&path)?.into_directory()?;
            info!(path = ?path, clusters = directory.len(), "cluster inventory loaded");
            directory
        }
        None => {
            warn!("no cluster inventory given, starting with an empty directory");
            StaticDirectory::new()
        }
    };
    let directory = Arc::new(directory);

    // Feature handlers, registered once before the registry is shared.
    let mut registry = HandlerRegistry::new();
    registry.register(FEDERATION_FEATURE, Arc::new(FederationHandler::new()));
    registry.register(SERVICE_MESH_FEATURE, Arc::new(ServiceMeshHandler::new()));
    let features = Arc::new(FeatureReconciler::new(store.clone(), Arc::new(registry)));

    // Coordinators.
    let groups = Arc::new(GroupCoordinator::new(
        directory,
        store.clone(),
        features.clone(),
    ));
    // TODO: swap the dry-run engine for a helm-backed implementation.
    let deployments = Arc::new(DeploymentCoordinator::new(
        store,
        Arc::new(DryRunChartEngine::new()),
    ));

    // ── Serve ──────────────────────────────────────────────────

    let router = fleetgrid_api::build_router(ApiState {
        groups,
        features,
        deployments,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API listening");
    axum::serve(listener, router).await?;

    Ok(())
}
