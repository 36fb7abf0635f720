//! # Ledger
//!
//! Turns accepted submissions into blocks.
//!
//! ```text
//!   submit(payload, signature)
//!        │ verify against the record's address
//!        ▼
//!   Mempool.push ──▶ Mempool.take_head ──▶ Block(previous = H(latest))
//!                                               │
//!                                               ▼
//!                                      ChainStore.add_block ──▶ height
//! ```
//!
//! The head of the mempool is framed, which is not necessarily the entry
//! just pushed. Framing and persistence happen under one lock, so the
//! previous-hash read and the append never interleave with another
//! submission.
//!
//! If persistence fails the submission is rejected and the mempool is left
//! as it was before the call: the popped head goes back to the front and
//! the entry this call pushed is dropped. A rejected record is never
//! committed later. Gossip does not share this path and keeps running.

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use plock_chain::block::hash_block;
use plock_chain::{Block, ChainStore, Mempool, MempoolEntry};
use plock_record::record::verify_signed;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Mempool plus chain store for one node.
#[derive(Debug)]
pub struct Ledger {
    mempool: Mutex<Mempool>,
    store: ChainStore,
    verify_signatures: bool,
    block_version: u16,
}

impl Ledger {
    /// Creates a ledger over `store`, sized and configured by `config`.
    pub fn new(store: ChainStore, config: &NodeConfig) -> Self {
        Self {
            mempool: Mutex::new(Mempool::with_capacity(config.mempool_capacity)),
            store,
            verify_signatures: config.verify_signatures,
            block_version: config.block_version,
        }
    }

    /// Accepts a signed record and appends the mempool head as a block.
    ///
    /// # Arguments
    ///
    /// * `payload` - canonical record encoding
    /// * `signature` - Ed25519 signature over SHA-256(`payload`)
    ///
    /// # Returns
    ///
    /// The height of the block written by this call.
    ///
    /// # Errors
    ///
    /// - `NodeError::InvalidSignature` if verification is enabled and fails
    /// - `NodeError::Chain` if the mempool is full or the block cannot be
    ///   framed or persisted. The submission is not kept in either case.
    pub async fn submit(&self, payload: Vec<u8>, signature: Vec<u8>) -> Result<u64> {
        if self.verify_signatures {
            let record = verify_signed(&payload, &signature)
                .map_err(|e| NodeError::InvalidSignature(e.to_string()))?;
            debug!(address = %record.address, merkle_root = %record.merkle_root, "signature verified");
        }

        let mut mempool = self.mempool.lock().await;
        mempool.push(MempoolEntry::new(payload, signature))?;

        let entry = mempool.take_head()?;
        match self.append(&entry) {
            Ok(height) => {
                info!(height, pending = mempool.len(), "block committed");
                Ok(height)
            }
            Err(e) => {
                mempool.restore(entry);
                mempool.pop_back();
                warn!(error = %e, pending = mempool.len(), "block not committed, submission dropped");
                Err(e)
            }
        }
    }

    fn append(&self, entry: &MempoolEntry) -> Result<u64> {
        let previous = self.store.get_latest_block()?.map(|b| hash_block(&b));
        let block = Block::new(entry.payload.clone(), entry.signature.clone(), previous)?
            .with_version(self.block_version);
        Ok(self.store.add_block(&block.build())?)
    }

    /// Number of records waiting in the mempool.
    pub async fn mempool_len(&self) -> usize {
        self.mempool.lock().await.len()
    }

    /// The underlying chain store.
    pub fn store(&self) -> &ChainStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plock_chain::block::{ED25519_SIGNATURE_LEN, GENESIS_PREVIOUS_HASH};
    use plock_chain::store::{height_key, BLOCK_TREE};
    use plock_chain::ChainError;
    use plock_record::signer::Ed25519Signer;
    use plock_record::{DeploymentRecord, Metadata, SignedRecord};

    fn signed(commit: &str) -> SignedRecord {
        let signer = Ed25519Signer::from_secret(&[4u8; 32]);
        let metadata = Metadata {
            author: "Marcel".to_string(),
            contact_info: "dev@example.com".to_string(),
            software_name: "plockchain".to_string(),
            version: "1.0.0".to_string(),
            commit_hash: commit.to_string(),
            repository_url: format!("https://example.com/commit/{}", commit),
            timestamp: "2026-02-11T10:39:41Z".to_string(),
        };
        DeploymentRecord::new(1, &signer, "ab".repeat(32), metadata)
            .serialize(&signer)
            .unwrap()
    }

    fn ledger(config: &NodeConfig) -> Ledger {
        Ledger::new(ChainStore::temporary().unwrap(), config)
    }

    #[tokio::test]
    async fn test_submit_appends_genesis() {
        let ledger = ledger(&NodeConfig::default());
        let record = signed("7cff475");

        let height = ledger
            .submit(record.payload.clone(), record.signature.to_vec())
            .await
            .unwrap();

        assert_eq!(height, 0);
        assert_eq!(ledger.mempool_len().await, 0);

        let bytes = ledger.store().get_latest_block().unwrap().unwrap();
        let block = Block::decode(&bytes, ED25519_SIGNATURE_LEN).unwrap();
        assert_eq!(block.payload, record.payload);
        assert_eq!(block.signature, record.signature.to_vec());
        assert_eq!(block.header.previous_hash, GENESIS_PREVIOUS_HASH);
    }

    #[tokio::test]
    async fn test_submissions_are_linked() {
        let ledger = ledger(&NodeConfig::default());
        for commit in ["aaaaaaa", "bbbbbbb"] {
            let record = signed(commit);
            ledger.submit(record.payload, record.signature.to_vec()).await.unwrap();
        }

        let first = ledger.store().get_block(0).unwrap().unwrap();
        let second = Block::decode(&ledger.store().get_block(1).unwrap().unwrap(), ED25519_SIGNATURE_LEN)
            .unwrap();
        assert_eq!(second.header.previous_hash, hash_block(&first));
    }

    #[tokio::test]
    async fn test_bad_signature_never_reaches_mempool() {
        let ledger = ledger(&NodeConfig::default());
        let record = signed("7cff475");
        let mut signature = record.signature.to_vec();
        signature[0] ^= 0xff;

        let err = ledger.submit(record.payload, signature).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidSignature(_)));
        assert_eq!(ledger.mempool_len().await, 0);
        assert!(ledger.store().is_empty());
    }

    #[tokio::test]
    async fn test_garbage_payload_is_invalid() {
        let ledger = ledger(&NodeConfig::default());
        let err = ledger.submit(b"garbage".to_vec(), vec![0u8; 64]).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_verification_can_be_disabled() {
        let config = NodeConfig::default().with_signature_verification(false);
        let ledger = ledger(&config);

        let height = ledger.submit(b"opaque".to_vec(), vec![1u8; 64]).await.unwrap();
        assert_eq!(height, 0);
    }

    /// Ledger whose store finds height 0 already occupied.
    fn squatted_ledger(config: &NodeConfig) -> Ledger {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = ChainStore::from_db(db.clone()).unwrap();
        db.open_tree(BLOCK_TREE)
            .unwrap()
            .insert(height_key(0), &b"squatter"[..])
            .unwrap();
        Ledger::new(store, config)
    }

    #[tokio::test]
    async fn test_failed_append_drops_submission() {
        let config = NodeConfig::default().with_signature_verification(false);
        let ledger = squatted_ledger(&config);

        for _ in 0..3 {
            let err = ledger.submit(b"opaque".to_vec(), vec![1u8; 64]).await.unwrap_err();
            assert!(matches!(err, NodeError::Chain(ChainError::HeightTaken(0))));
            assert_eq!(ledger.mempool_len().await, 0);
        }
        assert_eq!(ledger.store().get_block(0).unwrap().unwrap(), b"squatter");
    }

    #[tokio::test]
    async fn test_failed_append_never_fills_mempool() {
        let config = NodeConfig::default()
            .with_signature_verification(false)
            .with_mempool_capacity(1);
        let ledger = squatted_ledger(&config);

        for _ in 0..3 {
            let err = ledger.submit(b"opaque".to_vec(), vec![1u8; 64]).await.unwrap_err();
            assert!(!matches!(err, NodeError::Chain(ChainError::MempoolFull { .. })));
        }
    }

    #[tokio::test]
    async fn test_block_version_from_config() {
        let mut config = NodeConfig::default().with_signature_verification(false);
        config.block_version = 2;
        let ledger = ledger(&config);

        ledger.submit(b"opaque".to_vec(), vec![1u8; 64]).await.unwrap();
        let bytes = ledger.store().get_latest_block().unwrap().unwrap();
        assert_eq!(&bytes[0..2], &2u16.to_le_bytes());
    }
}
