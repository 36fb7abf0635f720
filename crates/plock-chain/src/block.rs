//! # Block Frame
//!
//! A block wraps one signed deployment record in a fixed binary header and
//! links it to its predecessor by hash.
//!
//! ## Layout
//!
//! All integers are little-endian with no padding.
//!
//! | Offset | Size | Field | Notes |
//! |--------|------|-------|-------|
//! | 0 | 2 | `version` | block format version |
//! | 2 | 8 | `timestamp` | wall-clock seconds at build time |
//! | 10 | 4 | `flags` | reserved, always 0 |
//! | 14 | 4 | `payload_length` | exact payload byte count |
//! | 18 | 32 | `previous_hash` | SHA-256 of the previous block, zeros for genesis |
//! | 50 | n | payload | canonical record encoding |
//! | 50+n | 64 | signature | not length-prefixed |
//!
//! The signature length is not stored; readers supply it from the
//! signature scheme (64 bytes for Ed25519).

use crate::error::{ChainError, Result};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 50;

/// Current block format version.
pub const BLOCK_VERSION: u16 = 1;

/// Previous-hash value used by the first block of a chain.
pub const GENESIS_PREVIOUS_HASH: [u8; 32] = [0u8; 32];

/// Ed25519 signature length, the scheme used for deployment records.
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// The fixed 50-byte block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u16,
    pub timestamp: u64,
    pub flags: u32,
    pub payload_length: u32,
    pub previous_hash: [u8; 32],
}

impl BlockHeader {
    /// Serializes the header into its wire layout.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.version.to_le_bytes());
        out[2..10].copy_from_slice(&self.timestamp.to_le_bytes());
        out[10..14].copy_from_slice(&self.flags.to_le_bytes());
        out[14..18].copy_from_slice(&self.payload_length.to_le_bytes());
        out[18..50].copy_from_slice(&self.previous_hash);
        out
    }

    /// Parses a header from the first 50 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::MalformedBlock` if fewer than 50 bytes are given.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or_else(|| {
                ChainError::MalformedBlock(format!(
                    "{} bytes is shorter than the {} byte header",
                    bytes.len(),
                    HEADER_LEN
                ))
            })?;

        let mut previous_hash = [0u8; 32];
        previous_hash.copy_from_slice(&header[18..50]);

        Ok(BlockHeader {
            version: u16::from_le_bytes([header[0], header[1]]),
            timestamp: u64::from_le_bytes(le_array(&header[2..10])),
            flags: u32::from_le_bytes(le_array(&header[10..14])),
            payload_length: u32::from_le_bytes(le_array(&header[14..18])),
            previous_hash,
        })
    }

    /// True when this header starts a chain.
    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

fn le_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}

/// A block: header, record payload and record signature.
///
/// # Example
///
/// ```rust
/// use plock_chain::block::{Block, HEADER_LEN, GENESIS_PREVIOUS_HASH};
///
/// let block = Block::new(b"record".to_vec(), vec![0u8; 64], None).unwrap();
/// let bytes = block.build();
///
/// assert_eq!(bytes.len(), HEADER_LEN + 6 + 64);
/// assert_eq!(block.header.previous_hash, GENESIS_PREVIOUS_HASH);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Block {
    /// Frames `payload` and `signature`, stamped with the current time.
    ///
    /// `previous_hash` defaults to [`GENESIS_PREVIOUS_HASH`].
    ///
    /// # Errors
    ///
    /// Returns `ChainError::PayloadTooLarge` if the payload length does not
    /// fit in 32 bits.
    pub fn new(
        payload: Vec<u8>,
        signature: Vec<u8>,
        previous_hash: Option<[u8; 32]>,
    ) -> Result<Self> {
        let payload_length =
            u32::try_from(payload.len()).map_err(|_| ChainError::PayloadTooLarge(payload.len()))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Ok(Block {
            header: BlockHeader {
                version: BLOCK_VERSION,
                timestamp,
                flags: 0,
                payload_length,
                previous_hash: previous_hash.unwrap_or(GENESIS_PREVIOUS_HASH),
            },
            payload,
            signature,
        })
    }

    /// Overrides the format version.
    #[must_use]
    pub fn with_version(mut self, version: u16) -> Self {
        self.header.version = version;
        self
    }

    /// `header ‖ payload ‖ signature`.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len() + self.signature.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parses a built block whose signature is `signature_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::MalformedBlock` if the total length does not
    /// equal `50 + payload_length + signature_len`.
    pub fn decode(bytes: &[u8], signature_len: usize) -> Result<Self> {
        let header = BlockHeader::decode(bytes)?;
        let payload_end = HEADER_LEN + header.payload_length as usize;
        let expected = payload_end + signature_len;

        if bytes.len() != expected {
            return Err(ChainError::MalformedBlock(format!(
                "expected {} bytes for payload length {}, got {}",
                expected,
                header.payload_length,
                bytes.len()
            )));
        }

        Ok(Block {
            header,
            payload: bytes[HEADER_LEN..payload_end].to_vec(),
            signature: bytes[payload_end..].to_vec(),
        })
    }

    /// SHA-256 over the built block, used as the next block's `previous_hash`.
    pub fn hash(&self) -> [u8; 32] {
        hash_block(&self.build())
    }
}

/// SHA-256 over raw block bytes.
pub fn hash_block(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Frames and builds in one step.
///
/// # Errors
///
/// See [`Block::new`].
pub fn build(payload: &[u8], signature: &[u8], previous_hash: Option<[u8; 32]>) -> Result<Vec<u8>> {
    Ok(Block::new(payload.to_vec(), signature.to_vec(), previous_hash)?.build())
}
