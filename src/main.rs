//! Operator CLI for the load-balancer reconciler.
//!
//! ```text
//! blb-reconciler --config reconciler.toml ensure    --service web.toml
//! blb-reconciler --config reconciler.toml listeners --service web.toml
//! blb-reconciler --config reconciler.toml delete    --service web.toml
//! ```
//!
//! Ctrl-C cancels the running pass.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;

use blb_reconciler::config::load_config;
use blb_reconciler::lifecycle::signals::cancel_on_ctrl_c;
use blb_reconciler::lifecycle::{Cancellation, LifecycleManager, Released};
use blb_reconciler::listener::{reconcile_listeners, ListenerReconciler};
use blb_reconciler::manifest::{save_hints, ServiceManifest};
use blb_reconciler::observability::logging::init_logging;
use blb_reconciler::placement::StaticPlacement;
use blb_reconciler::transport::{HttpTransport, Transport};

#[derive(Parser)]
#[command(name = "blb-reconciler")]
#[command(about = "Reconcile a service's cloud load balancer and listeners", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "reconciler.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make sure the load balancer exists and its listeners match the manifest
    Ensure {
        #[arg(short, long)]
        service: PathBuf,
    },
    /// Show the listeners currently configured on the service's load balancer
    Listeners {
        #[arg(short, long)]
        service: PathBuf,
    },
    /// Delete the service's load balancer unless it is reserved
    Delete {
        #[arg(short, long)]
        service: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability);

    tracing::info!(
        region = %config.cloud.region,
        cluster_id = %config.cloud.cluster_id,
        "blb-reconciler v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.cloud)?);
    let placement = Arc::new(StaticPlacement::from(&config.placement));
    let manager = LifecycleManager::from_config(transport.clone(), placement, &config);
    let listeners = ListenerReconciler::new(transport);

    let cancellation = Arc::new(Cancellation::new());
    let signal_task = cancel_on_ctrl_c(cancellation.clone());
    let cancel = cancellation.signal();

    match cli.command {
        Commands::Ensure { service: path } => {
            let manifest = ServiceManifest::load(&path)?;
            let mut service = manifest.service();
            let before = service.hints.clone();

            let ensured = manager.ensure_exists(&mut service, &cancel).await?;
            if service.hints != before {
                save_hints(&path, &service.hints)?;
                tracing::info!(path = %path.display(), "Identity hints written to manifest");
            }

            let diff = reconcile_listeners(&listeners, &ensured.record.id, &manifest.listeners, &cancel).await?;

            let out = json!({
                "state": ensured.state.as_str(),
                "loadBalancer": ensured.record,
                "listeners": {
                    "created": diff.to_create.iter().map(|s| s.listener_port).collect::<Vec<_>>(),
                    "updated": diff.to_update.iter().map(|s| s.listener_port).collect::<Vec<_>>(),
                    "deleted": diff.to_delete,
                },
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Listeners { service: path } => {
            let service = ServiceManifest::load(&path)?.service();
            let resolved = cancel
                .guard("ResolveLoadBalancer", false, manager.resolver().resolve(&service))
                .await?;

            match resolved {
                Some(resolution) => {
                    let current = cancel
                        .guard("DescribeListeners", false, listeners.describe_all(&resolution.record.id))
                        .await?;
                    println!("{}", serde_json::to_string_pretty(&current)?);
                }
                None => eprintln!("No load balancer found for {}", service.key()),
            }
        }
        Commands::Delete { service: path } => {
            let mut service = ServiceManifest::load(&path)?.service();
            match manager.release(&mut service, &cancel).await? {
                Released::Absent => println!("No load balancer found for {}", service.key()),
                Released::Reserved(id) => println!("Load balancer {} is reserved, left in place", id),
                Released::Deleted(id) => println!("Deleted load balancer {}", id),
            }
        }
    }

    signal_task.abort();
    Ok(())
}
