//! # Core Data Models for Deployment Records
//!
//! This module defines the types shared by the Merkle engine, the record
//! codec and the signer. A deployment record binds three things together:
//! the identity that deployed (its address), the exact project tree that was
//! deployed (a Merkle root) and human-supplied metadata about the release.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Type Confusion**: `Hash` and `Signature` are fixed-size arrays, so a
//!   digest can never be passed where a signature is expected.
//! - **Silent Metadata Mutation**: serialization works on a copy; the
//!   record a caller holds is never rewritten by encoding.
//! - **Incomplete Records**: `Metadata::validate` rejects blank fields and
//!   unparseable timestamps before anything is signed.
//!
//! ## References
//!
//! - NIST FIPS 180-4 for hash size (SHA-256 = 32 bytes)
//! - RFC 8032 for Ed25519 signature size (64 bytes)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SHA-256 hash output size in bytes.
pub const HASH_SIZE: usize = 32;

/// Ed25519 signature size in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; HASH_SIZE];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; SIGNATURE_SIZE];

/// Metadata describing a single deployment.
///
/// The field set is fixed. `timestamp` is kept as the ISO-8601 string the
/// author entered; it is only converted to POSIX seconds inside the
/// encoding, never in place.
///
/// # Example
///
/// ```rust
/// use plock_record::Metadata;
///
/// let metadata = Metadata {
///     author: "Marcel".to_string(),
///     contact_info: "dev@example.com".to_string(),
///     software_name: "plockchain".to_string(),
///     version: "1.0.0".to_string(),
///     commit_hash: "7cff475efd3f13e2b637f20d8187a3ccddb24efc".to_string(),
///     repository_url: "https://example.com/plockchain/commit/7cff475".to_string(),
///     timestamp: "2026-02-11T10:39:41".to_string(),
/// };
///
/// assert!(metadata.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Who performed the deployment.
    pub author: String,

    /// How to reach the author.
    pub contact_info: String,

    /// Name of the deployed software.
    pub software_name: String,

    /// Released version of the software.
    pub version: String,

    /// Commit the deployed tree was built from.
    pub commit_hash: String,

    /// Link to that commit in the repository.
    pub repository_url: String,

    /// Local deployment time as ISO-8601 (`YYYY-MM-DDTHH:MM:SS`).
    pub timestamp: String,
}

impl Metadata {
    /// Checks that every field is filled in and the timestamp parses.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidMetadata` naming the first blank field,
    /// or `RecordError::Timestamp` if `timestamp` is not ISO-8601.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("author", &self.author),
            ("contact_info", &self.contact_info),
            ("software_name", &self.software_name),
            ("version", &self.version),
            ("commit_hash", &self.commit_hash),
            ("repository_url", &self.repository_url),
            ("timestamp", &self.timestamp),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(RecordError::InvalidMetadata(format!("{} must not be empty", name)));
            }
        }

        crate::record::parse_timestamp(&self.timestamp)?;
        Ok(())
    }
}

/// An unsigned deployment record.
///
/// `version` is the record format version supplied by configuration,
/// `address` is the signer's public-key-derived identifier and
/// `merkle_root` is the lowercase hex root over the deployed files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Record format version.
    pub version: u32,

    /// Base58 address of the deploying identity.
    pub address: String,

    /// Hex Merkle root of the deployed project tree.
    pub merkle_root: String,

    /// Deployment metadata.
    pub metadata: Metadata,
}

/// A canonically encoded record together with its signature.
///
/// The signature covers `SHA-256(payload)`, not the payload itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRecord {
    /// Canonical encoding of the record.
    pub payload: Vec<u8>,

    /// Ed25519 signature over the payload digest.
    pub signature: Signature,
}

impl SignedRecord {
    /// Hex form of the payload, as carried on the wire.
    pub fn payload_hex(&self) -> String {
        hex::encode(&self.payload)
    }

    /// Hex form of the signature, as carried on the wire.
    pub fn signature_hex(&self) -> String {
        hex::encode(self.signature)
    }
}

/// Errors that can occur while building or signing deployment records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// No Merkle root is defined for an empty file list.
    #[error("cannot compute a Merkle root over zero files")]
    EmptyInput,

    /// The metadata timestamp is not a valid ISO-8601 date-time.
    #[error("invalid ISO-8601 timestamp '{0}'")]
    Timestamp(String),

    /// A metadata field failed validation.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The canonical encoding could not be produced or parsed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Key material could not be derived or parsed.
    #[error("key error: {0}")]
    Key(String),

    /// The signature does not match the record digest and address.
    #[error("signature verification failed for address {0}")]
    InvalidSignature(String),

    /// Reading project files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rmp_serde::encode::Error> for RecordError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RecordError::Encoding(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RecordError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RecordError::Encoding(e.to_string())
    }
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;
