//! # Plockchain Node - Gossip, Submission and Block Assembly
//!
//! A service node listens on TCP for two kinds of traffic: gossip from other
//! nodes and deployment record submissions from clients. Gossip spreads peer
//! addresses; submissions are verified, queued and appended to the chain.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌───────────────────────────────────────────┐
//!   hello ───────────▶│  Node (accept loop, one task per conn)    │
//!   add_deployment ──▶│                                           │
//!   _record           │   ┌──────────────┐     ┌───────────────┐  │
//!                     │   │  GossipPeer  │     │    Ledger     │  │
//!                     │   │ peers        │     │ Mempool       │  │
//!                     │   │ connected    │     │ ChainStore    │  │
//!                     │   └──────┬───────┘     └───────────────┘  │
//!                     └──────────┼────────────────────────────────┘
//!                                │ flood (bounded worklist)
//!                                ▼
//!                           other nodes
//! ```
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`protocol`] | Line-delimited JSON messages and timed I/O |
//! | [`gossip`] | Peer sets, hello handling and flood dialing |
//! | [`ledger`] | Verification, mempool and block assembly |
//! | [`service`] | TCP accept loop and connection dispatch |
//! | [`client`] | Record submission and the deploy flow |
//! | [`config`] | Node and client configuration |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plock_node::{Node, NodeConfig};
//!
//! #[tokio::main]
//! async fn main() -> plock_node::Result<()> {
//!     let node = Node::bind(NodeConfig::default()).await?;
//!     node.run().await
//! }
//! ```
//!
//! ## Security Notes
//!
//! - Signatures are checked against the address inside the record before
//!   mempool admission. Disabling `verify_signatures` accepts any payload.
//! - Peer addresses from gossip are not authenticated.

pub mod client;
pub mod config;
mod error;
pub mod gossip;
pub mod ledger;
pub mod protocol;
pub mod service;

pub use client::{deploy, DeployReceipt, SubmissionClient};
pub use config::{ClientConfig, NodeConfig};
pub use error::{DeployError, NodeError, Result};
pub use gossip::GossipPeer;
pub use ledger::Ledger;
pub use protocol::{Message, Status};
pub use service::Node;
