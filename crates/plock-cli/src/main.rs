//! Plockchain service node - gossip and record submission endpoint

use anyhow::Context;
use clap::Parser;
use plock_node::{Node, NodeConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "plock-node")]
#[command(about = "Plockchain service node - accepts deployment records and gossips peers")]
struct Cli {
    /// Host address of the node
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port of the node
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Peer to dial at startup, as host:port
    #[arg(long)]
    bootstrap: Option<String>,

    /// Directory for the chain database
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    plock_cli::init_tracing();

    let mut config = NodeConfig::new()
        .with_host(cli.host)
        .with_port(cli.port)
        .with_data_dir(cli.data_dir);
    if let Some(bootstrap) = cli.bootstrap {
        config = config.with_bootstrap(bootstrap);
    }

    let node = Node::bind(config).await.context("failed to start node")?;

    tokio::select! {
        result = node.run() => result.context("node stopped")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
        }
    }

    Ok(())
}
