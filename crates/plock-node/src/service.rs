//! # Service Node
//!
//! The TCP server that ties gossip and the ledger together.
//!
//! ## Connection Lifecycle
//!
//! ```text
//!   accept ──▶ read one line (read_timeout)
//!                 │
//!        ┌────────┴─────────────────┐
//!        ▼                          ▼
//!      hello                 add_deployment_record
//!   reply peer_list            Ledger::submit
//!   spawn flood              reply success | failure
//!        │                          │
//!        └───────────┬──────────────┘
//!                    ▼
//!                  close
//! ```
//!
//! Each connection runs in its own task. A malformed, unexpected or
//! timed-out line drops that connection only; the accept loop keeps going.

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::gossip::GossipPeer;
use crate::ledger::Ledger;
use crate::protocol::{read_message, write_message, Message, Status};
use plock_chain::ChainStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// A bound service node.
///
/// # Example
///
/// ```rust,no_run
/// use plock_node::{Node, NodeConfig};
///
/// # async fn run() -> plock_node::Result<()> {
/// let config = NodeConfig::new().with_port(5001).with_bootstrap("127.0.0.1:5000");
/// let node = Node::bind(config).await?;
/// node.run().await
/// # }
/// ```
pub struct Node {
    config: Arc<NodeConfig>,
    listener: TcpListener,
    gossip: Arc<GossipPeer>,
    ledger: Arc<Ledger>,
}

impl Node {
    /// Opens the chain store under `config.data_dir` and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the chain store
    /// cannot be opened, or the address cannot be bound.
    pub async fn bind(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let store = ChainStore::open(config.chain_path())?;
        Self::bind_with_store(config, store).await
    }

    /// Binds the listener over an already opened store.
    pub async fn bind_with_store(config: NodeConfig, store: ChainStore) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_address()).await?;

        // Advertise the real port when an ephemeral one was requested.
        let port = listener.local_addr()?.port();
        let me = format!("{}:{}", config.host, port);

        let gossip = Arc::new(GossipPeer::new(me, &config));
        let ledger = Arc::new(Ledger::new(store, &config));

        info!(address = %gossip.me(), height = ledger.store().height(), "node bound");

        Ok(Self {
            config: Arc::new(config),
            listener,
            gossip,
            ledger,
        })
    }

    /// The socket address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// The `host:port` this node advertises to peers.
    pub fn address(&self) -> &str {
        self.gossip.me()
    }

    /// Handle to this node's gossip state.
    pub fn gossip(&self) -> Arc<GossipPeer> {
        Arc::clone(&self.gossip)
    }

    /// Handle to this node's ledger.
    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    /// Dials the configured bootstrap peer, then serves until the task is
    /// cancelled.
    pub async fn run(self) -> Result<()> {
        self.bootstrap().await;
        self.serve().await
    }

    /// Dials the bootstrap peer, if any, and floods to what it reports.
    ///
    /// Failures are logged; the node still serves without its bootstrap.
    pub async fn bootstrap(&self) {
        let Some(bootstrap) = self.config.bootstrap.clone() else {
            return;
        };

        info!(peer = %bootstrap, "bootstrapping");
        self.gossip.add_peer(&bootstrap);
        Arc::clone(&self.gossip).discover(vec![bootstrap]).await;
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve(self) -> Result<()> {
        info!(address = %self.gossip.me(), "listening");

        loop {
            let (stream, remote) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let gossip = Arc::clone(&self.gossip);
            let ledger = Arc::clone(&self.ledger);
            let read_timeout = self.config.read_timeout;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, gossip, ledger, read_timeout).await {
                    warn!(%remote, error = %e, "connection dropped");
                }
            });
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.gossip.me())
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

/// Reads one request, answers it and closes.
async fn handle_connection(
    stream: TcpStream,
    gossip: Arc<GossipPeer>,
    ledger: Arc<Ledger>,
    read_timeout: Duration,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    match read_message(&mut reader, read_timeout).await? {
        Message::Hello { peers, me } => {
            let (reply, flood) = gossip.handle_hello(peers, me);
            write_message(&mut write_half, &reply).await?;

            if !flood.is_empty() {
                tokio::spawn(gossip.discover(flood));
            }
        }
        Message::AddDeploymentRecord { record, signature } => {
            let status = accept_submission(&ledger, &record, &signature).await;
            write_message(&mut write_half, &Message::AddDeploymentRecordResponse { status })
                .await?;
        }
        other => {
            return Err(NodeError::UnexpectedMessage {
                expected: "hello or add_deployment_record",
                got: other.kind(),
            });
        }
    }

    Ok(())
}

/// Decodes and submits a record, mapping the outcome to a status.
async fn accept_submission(ledger: &Ledger, record: &str, signature: &str) -> Status {
    let (payload, signature) = match (hex::decode(record), hex::decode(signature)) {
        (Ok(p), Ok(s)) => (p, s),
        _ => {
            warn!("submission is not valid hex");
            return Status::Failure;
        }
    };

    match ledger.submit(payload, signature).await {
        Ok(height) => {
            debug!(height, "submission accepted");
            Status::Success
        }
        Err(NodeError::InvalidSignature(reason)) => {
            warn!(%reason, "submission rejected");
            Status::Failure
        }
        Err(e) => {
            error!(error = %e, "submission failed");
            Status::Failure
        }
    }
}
