//! Error types for block framing, chain storage and the mempool.

use thiserror::Error;

/// Result type alias for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors that can occur while framing, storing or queueing blocks.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The underlying store could not be opened, read or written.
    #[error("persistence error: {0}")]
    Persistence(#[from] sled::Error),

    /// A block already exists at the height being written.
    ///
    /// The store is append-only, so this is never resolved by overwriting.
    #[error("block height {0} is already taken")]
    HeightTaken(u64),

    /// A stored key is not an 8-byte height.
    #[error("corrupt height key of {0} bytes")]
    CorruptKey(usize),

    /// Bytes do not form a valid block frame.
    #[error("malformed block: {0}")]
    MalformedBlock(String),

    /// The payload does not fit the 32-bit length field.
    #[error("payload of {0} bytes exceeds the block size limit")]
    PayloadTooLarge(usize),

    /// The mempool is at capacity.
    #[error("mempool full: capacity {capacity}")]
    MempoolFull {
        /// Maximum number of pending entries.
        capacity: usize,
    },

    /// A block was requested from an empty mempool.
    #[error("mempool is empty")]
    MempoolEmpty,
}
