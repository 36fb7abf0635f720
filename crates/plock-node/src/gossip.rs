//! # Gossip Peer Discovery
//!
//! Nodes learn about each other by exchanging peer lists. Any node that
//! learns a new address dials it, so knowledge floods across the reachable
//! peer graph until every node has dialed every peer it knows once.
//!
//! ## Exchanges
//!
//! ```text
//!   dialer                                   receiver
//!     │  hello { peers: known − target, me }    │
//!     │────────────────────────────────────────▶│ merge me + peers (− self)
//!     │  peer_list { peers: known − dialer, me }│
//!     │◀────────────────────────────────────────│ flood: dial peers not yet dialed
//!   merge peers (− self)                        │
//!   dial new, not-yet-dialed peers              │
//! ```
//!
//! ## Flooding
//!
//! Dials run from a worklist rather than by recursion. A flood drains its
//! worklist with at most `max_in_flight_dials` concurrent dials; peers
//! returned by a finished dial are appended to the same worklist.
//!
//! Each address is *claimed* in `connected` before it is dialed, under the
//! same lock that guards `peers`. Two floods racing on one address cannot
//! both claim it, so no node dials a peer twice. A failed dial keeps its
//! claim and is not retried. This bounds `connected` by the number of
//! distinct addresses ever seen and ends every flood.
//!
//! ## Threat Model
//!
//! Peer lists are taken on trust. A peer can advertise addresses that do
//! not exist; those cost one bounded dial each and are then ignored.

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::protocol::{request, Message};
use parking_lot::Mutex;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Peer sets shared by every connection task.
#[derive(Debug, Default)]
struct PeerSets {
    /// Every address learned about, never including our own.
    peers: BTreeSet<String>,

    /// Addresses claimed for dialing, whether or not the dial succeeded.
    connected: BTreeSet<String>,
}

/// A node's view of the peer graph and its dialing logic.
#[derive(Debug)]
pub struct GossipPeer {
    /// Our advertised `host:port`.
    me: String,

    sets: Mutex<PeerSets>,

    dial_timeout: Duration,
    read_timeout: Duration,
    max_in_flight: usize,
}

impl GossipPeer {
    /// Creates a peer advertising `me`, with timeouts and dial limit from
    /// `config`.
    pub fn new(me: impl Into<String>, config: &NodeConfig) -> Self {
        Self {
            me: me.into(),
            sets: Mutex::new(PeerSets::default()),
            dial_timeout: config.dial_timeout,
            read_timeout: config.read_timeout,
            max_in_flight: config.max_in_flight_dials.max(1),
        }
    }

    /// Our advertised address.
    pub fn me(&self) -> &str {
        &self.me
    }

    /// Known peers, sorted.
    pub fn peers(&self) -> Vec<String> {
        self.sets.lock().peers.iter().cloned().collect()
    }

    /// Peers that have been dialed (or are being dialed), sorted.
    pub fn connected_peers(&self) -> Vec<String> {
        self.sets.lock().connected.iter().cloned().collect()
    }

    /// Records `addr` as known. Our own address is ignored.
    ///
    /// Returns true if the address was new.
    pub fn add_peer(&self, addr: &str) -> bool {
        if addr == self.me {
            return false;
        }
        self.sets.lock().peers.insert(addr.to_string())
    }

    /// Known peers except `excluded`.
    fn peers_except(&self, excluded: &str) -> Vec<String> {
        self.sets
            .lock()
            .peers
            .iter()
            .filter(|p| p.as_str() != excluded)
            .cloned()
            .collect()
    }

    /// Merges addresses into `peers`, skipping our own.
    ///
    /// Returns the addresses that were not known before.
    fn merge<I>(&self, addrs: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut sets = self.sets.lock();
        addrs
            .into_iter()
            .filter(|a| *a != self.me)
            .filter(|a| sets.peers.insert(a.clone()))
            .collect()
    }

    /// Claims `addr` for dialing. False if it was already claimed.
    fn claim(&self, addr: &str) -> bool {
        self.sets.lock().connected.insert(addr.to_string())
    }

    /// Handles an inbound `hello`.
    ///
    /// Merges the sender and its peers, then builds the `peer_list` reply.
    ///
    /// # Returns
    ///
    /// The reply, plus the known peers that are neither the sender nor
    /// already dialed. The caller floods to those with [`discover`].
    ///
    /// [`discover`]: GossipPeer::discover
    pub fn handle_hello(&self, peers: Vec<String>, sender: String) -> (Message, Vec<String>) {
        info!(peer = %sender, advertised = peers.len(), "hello received");

        let learned = self.merge(peers.into_iter().chain(std::iter::once(sender.clone())));
        if !learned.is_empty() {
            debug!(peer = %sender, ?learned, "peers merged from hello");
        }

        let reply = Message::PeerList {
            peers: self.peers_except(&sender),
            me: self.me.clone(),
        };

        let flood: Vec<String> = {
            let sets = self.sets.lock();
            sets.peers
                .iter()
                .filter(|p| **p != sender && !sets.connected.contains(*p))
                .cloned()
                .collect()
        };

        (reply, flood)
    }

    /// Performs one outbound exchange with `target`.
    ///
    /// Sends `hello` with our peers minus `target`, waits for `peer_list`
    /// and merges it.
    ///
    /// # Returns
    ///
    /// The newly learned peers that have not been dialed yet.
    ///
    /// # Errors
    ///
    /// Connect, timeout and I/O failures, a malformed reply, or a reply
    /// that is not `peer_list`.
    pub async fn dial(&self, target: &str) -> Result<Vec<String>> {
        self.add_peer(target);

        let hello = Message::Hello {
            peers: self.peers_except(target),
            me: self.me.clone(),
        };
        info!(peer = %target, "sending hello");

        let reply = request(target, &hello, self.dial_timeout, self.read_timeout).await?;
        let peers = match reply {
            Message::PeerList { peers, .. } => peers,
            other => {
                return Err(NodeError::UnexpectedMessage {
                    expected: "peer_list",
                    got: other.kind(),
                })
            }
        };

        let learned = self.merge(peers);
        debug!(peer = %target, ?learned, "peer list merged");

        let sets = self.sets.lock();
        Ok(learned
            .into_iter()
            .filter(|p| !sets.connected.contains(p))
            .collect())
    }

    /// Dials every address in `seeds` and everything discovered from them.
    ///
    /// Addresses already claimed are skipped. Completes once the worklist
    /// is empty and no dial is in flight. Dial failures are logged and
    /// otherwise ignored.
    pub async fn discover(self: Arc<Self>, seeds: Vec<String>) {
        let mut worklist: VecDeque<String> = seeds.into();
        let mut in_flight: JoinSet<(String, Result<Vec<String>>)> = JoinSet::new();

        loop {
            while in_flight.len() < self.max_in_flight {
                let Some(target) = worklist.pop_front() else {
                    break;
                };
                if target == self.me || !self.claim(&target) {
                    continue;
                }

                let peer = Arc::clone(&self);
                in_flight.spawn(async move {
                    let outcome = peer.dial(&target).await;
                    (target, outcome)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((_, Ok(learned))) => worklist.extend(learned),
                Ok((target, Err(e))) => warn!(peer = %target, error = %e, "dial failed"),
                Err(e) => warn!(error = %e, "dial task aborted"),
            }
        }

        let (known, dialed) = {
            let sets = self.sets.lock();
            (sets.peers.len(), sets.connected.len())
        };
        debug!(known, dialed, "flood finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(me: &str) -> GossipPeer {
        GossipPeer::new(me, &NodeConfig::default())
    }

    #[test]
    fn test_add_peer_ignores_self() {
        let gossip = peer("127.0.0.1:5000");
        assert!(!gossip.add_peer("127.0.0.1:5000"));
        assert!(gossip.add_peer("127.0.0.1:5001"));
        assert!(!gossip.add_peer("127.0.0.1:5001"));
        assert_eq!(gossip.peers(), vec!["127.0.0.1:5001"]);
    }

    #[test]
    fn test_hello_merges_sender_and_peers() {
        let gossip = peer("a:1");
        let (reply, flood) = gossip.handle_hello(
            vec!["c:3".to_string(), "a:1".to_string()],
            "b:2".to_string(),
        );

        assert_eq!(gossip.peers(), vec!["b:2", "c:3"]);
        assert_eq!(
            reply,
            Message::PeerList {
                peers: vec!["c:3".to_string()],
                me: "a:1".to_string()
            }
        );
        assert_eq!(flood, vec!["c:3"]);
    }

    #[test]
    fn test_hello_does_not_flood_to_dialed_peers() {
        let gossip = peer("a:1");
        gossip.add_peer("c:3");
        assert!(gossip.claim("c:3"));

        let (_, flood) = gossip.handle_hello(vec![], "b:2".to_string());
        assert!(flood.is_empty());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let gossip = peer("a:1");
        assert!(gossip.claim("b:2"));
        assert!(!gossip.claim("b:2"));
        assert_eq!(gossip.connected_peers(), vec!["b:2"]);
    }

    #[test]
    fn test_merge_reports_only_new() {
        let gossip = peer("a:1");
        gossip.add_peer("b:2");
        let learned = gossip.merge(vec!["b:2".to_string(), "c:3".to_string(), "a:1".to_string()]);
        assert_eq!(learned, vec!["c:3"]);
    }

    #[tokio::test]
    async fn test_failed_dial_keeps_claim() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap().to_string();
        drop(listener);

        let config = NodeConfig::default()
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
        let gossip = Arc::new(GossipPeer::new("127.0.0.1:1", &config));

        Arc::clone(&gossip).discover(vec![dead.clone()]).await;
        assert_eq!(gossip.connected_peers(), vec![dead.clone()]);
        assert_eq!(gossip.peers(), vec![dead.clone()]);

        // A second flood does not redial.
        Arc::clone(&gossip).discover(vec![dead.clone()]).await;
        assert_eq!(gossip.connected_peers().len(), 1);
    }

    #[tokio::test]
    async fn test_discover_skips_self() {
        let gossip = Arc::new(peer("a:1"));
        Arc::clone(&gossip).discover(vec!["a:1".to_string()]).await;
        assert!(gossip.connected_peers().is_empty());
    }
}
