//! # Append-Only Chain Store
//!
//! This module persists blocks in Sled, an embedded database. Each block is
//! stored under its height; heights start at 0 and grow by one per block.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value |
//! |------|-----|-------|
//! | `blocks` | 8-byte little-endian height | full block bytes |
//!
//! ## Guarantees
//!
//! - **Append-only**: writes use compare-and-swap against an absent key, so
//!   an existing height is never overwritten. Nothing is ever deleted.
//! - **Monotonic heights**: the next height is allocated under a lock, so
//!   concurrent writers never receive the same height.
//!
//! ## Height Recovery
//!
//! Sled orders keys bytewise, and little-endian heights do not sort
//! numerically (height 256 is `00 01 ..`, height 1 is `01 00 ..`). The
//! highest height therefore cannot be read off the last key. On open the
//! store scans every key, decodes it, and keeps the maximum.
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use crate::error::{ChainError, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Tree name for storing blocks.
pub const BLOCK_TREE: &str = "blocks";

/// Size of a height key in bytes.
pub const HEIGHT_KEY_LEN: usize = 8;

/// Encodes a height as its storage key.
pub fn height_key(height: u64) -> [u8; HEIGHT_KEY_LEN] {
    height.to_le_bytes()
}

/// Decodes a storage key back into a height.
///
/// # Errors
///
/// Returns `ChainError::CorruptKey` if the key is not 8 bytes.
pub fn decode_height(key: &[u8]) -> Result<u64> {
    let bytes: [u8; HEIGHT_KEY_LEN] = key
        .try_into()
        .map_err(|_| ChainError::CorruptKey(key.len()))?;
    Ok(u64::from_le_bytes(bytes))
}

/// Height-indexed, append-only block storage.
///
/// # Thread Safety
///
/// Cloning is cheap and clones share the same database and height counter.
///
/// # Example
///
/// ```rust
/// use plock_chain::store::ChainStore;
///
/// let store = ChainStore::temporary().unwrap();
/// assert_eq!(store.add_block(b"genesis").unwrap(), 0);
/// assert_eq!(store.add_block(b"second").unwrap(), 1);
/// assert_eq!(store.get_latest_block().unwrap().as_deref(), Some(&b"second"[..]));
/// ```
#[derive(Clone)]
pub struct ChainStore {
    /// The underlying Sled database.
    db: sled::Db,

    /// Tree holding height → block bytes.
    blocks: sled::Tree,

    /// Height the next block will be written at.
    next_height: Arc<Mutex<u64>>,
}

impl ChainStore {
    /// Opens or creates a chain store at the given path.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::Persistence` if the database cannot be opened,
    /// or `ChainError::CorruptKey` if a stored key is not a height.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a temporary store that is discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    /// Wraps an already open database, recovering the height from its
    /// [`BLOCK_TREE`].
    pub fn from_db(db: sled::Db) -> Result<Self> {
        let blocks = db.open_tree(BLOCK_TREE)?;
        let next_height = recover_next_height(&blocks)?;

        tracing::debug!(next_height, "opened chain store");

        Ok(ChainStore {
            db,
            blocks,
            next_height: Arc::new(Mutex::new(next_height)),
        })
    }

    /// Appends a block and returns the height it was stored at.
    ///
    /// An empty store assigns height 0.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::Persistence` if the write fails and
    /// `ChainError::HeightTaken` if the height is unexpectedly occupied.
    /// The height counter only advances on success.
    pub fn add_block(&self, block_bytes: &[u8]) -> Result<u64> {
        let mut next = self.next_height.lock();
        let height = *next;

        self.blocks
            .compare_and_swap(height_key(height), None::<&[u8]>, Some(block_bytes))?
            .map_err(|_| ChainError::HeightTaken(height))?;

        *next = height + 1;
        tracing::info!(height, bytes = block_bytes.len(), "block appended");
        Ok(height)
    }

    /// Returns the block at the highest height, or `None` if empty.
    pub fn get_latest_block(&self) -> Result<Option<Vec<u8>>> {
        let next = *self.next_height.lock();
        match next.checked_sub(1) {
            Some(height) => self.get_block(height),
            None => Ok(None),
        }
    }

    /// Returns the block stored at `height`, if any.
    pub fn get_block(&self, height: u64) -> Result<Option<Vec<u8>>> {
        Ok(self.blocks.get(height_key(height))?.map(|v| v.to_vec()))
    }

    /// Number of stored blocks (equivalently, the next height).
    pub fn height(&self) -> u64 {
        *self.next_height.lock()
    }

    /// Returns true if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    /// Flushes all pending writes to disk.
    ///
    /// # Returns
    ///
    /// The number of bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

/// Scans every key and returns one past the highest height found.
fn recover_next_height(blocks: &sled::Tree) -> Result<u64> {
    let mut highest: Option<u64> = None;
    for key in blocks.iter().keys() {
        let height = decode_height(&key?)?;
        highest = Some(highest.map_or(height, |h| h.max(height)));
    }
    Ok(highest.map_or(0, |h| h + 1))
}

impl std::fmt::Debug for ChainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainStore")
            .field("height", &self.height())
            .finish()
    }
}
