//! # Canonical Record Encoding
//!
//! This module turns a [`DeploymentRecord`] into the exact bytes that get
//! signed, framed into blocks and gossiped. The encoding must be
//! byte-for-byte reproducible: the same record always yields the same
//! bytes, and therefore the same digest and signature.
//!
//! ## Layout
//!
//! The record is a MessagePack map with string keys, written by
//! `rmp_serde::to_vec_named` from a mirror struct whose field order is the
//! canonical key order. Integers take their smallest MessagePack form and
//! the timestamp is always a 64-bit float.
//!
//! | # | Key | Type |
//! |---|-----|------|
//! | 1 | `version` | `u32` |
//! | 2 | `address` | string |
//! | 3 | `merkle_root` | string |
//! | 4 | `metadata` | nested: `author`, `contact_info`, `software_name`, `version`, `commit_hash`, `repository_url` (strings), `timestamp` (`f64` POSIX seconds) |
//!
//! ## Timestamps
//!
//! The metadata timestamp is entered as naive ISO-8601 local time. During
//! encoding it is converted to POSIX seconds on a copy; the caller's
//! record keeps its string.
//!
//! ## Signing
//!
//! The signer is handed `SHA-256(encoded_bytes)`, never the encoding itself.
//!
//! ## Example
//!
//! ```rust
//! use plock_record::{DeploymentRecord, Metadata};
//! use plock_record::signer::{Ed25519Signer, KeyDerivation, Signer};
//!
//! let signer = Ed25519Signer::derive(KeyDerivation::Generated).unwrap();
//! let record = DeploymentRecord {
//!     version: 1,
//!     address: signer.address(),
//!     merkle_root: plock_record::merkle::compute_root(["fn main() {}"]).unwrap(),
//!     metadata: Metadata {
//!         author: "Marcel".into(),
//!         contact_info: "dev@example.com".into(),
//!         software_name: "plockchain".into(),
//!         version: "1.0.0".into(),
//!         commit_hash: "7cff475".into(),
//!         repository_url: "https://example.com/commit/7cff475".into(),
//!         timestamp: "2026-02-11T10:39:41".into(),
//!     },
//! };
//!
//! let first = record.serialize(&signer).unwrap();
//! let second = record.serialize(&signer).unwrap();
//! assert_eq!(first, second);
//! ```

use crate::models::{DeploymentRecord, Hash, Metadata, RecordError, Result, SignedRecord};
use crate::signer::{verify_digest, Signer};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Accepted naive date-time layouts, most specific first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Encoding-ready view of [`Metadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedMetadata {
    pub author: String,
    pub contact_info: String,
    pub software_name: String,
    pub version: String,
    pub commit_hash: String,
    pub repository_url: String,
    /// POSIX seconds.
    pub timestamp: f64,
}

/// Encoding-ready view of [`DeploymentRecord`], in canonical key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub version: u32,
    pub address: String,
    pub merkle_root: String,
    pub metadata: EncodedMetadata,
}

impl EncodedRecord {
    fn from_record(record: &DeploymentRecord) -> Result<Self> {
        let metadata = record.metadata.clone();
        let timestamp = parse_timestamp(&metadata.timestamp)?;

        Ok(EncodedRecord {
            version: record.version,
            address: record.address.clone(),
            merkle_root: record.merkle_root.clone(),
            metadata: EncodedMetadata {
                author: metadata.author,
                contact_info: metadata.contact_info,
                software_name: metadata.software_name,
                version: metadata.version,
                commit_hash: metadata.commit_hash,
                repository_url: metadata.repository_url,
                timestamp,
            },
        })
    }
}

/// Converts an ISO-8601 string to POSIX seconds.
///
/// Strings with an explicit offset (`...Z`, `...+02:00`) are honoured.
/// Naive strings are interpreted in the host's local time zone.
///
/// # Errors
///
/// Returns `RecordError::Timestamp` if no accepted layout matches, or the
/// local time does not exist (daylight-saving gap).
pub fn parse_timestamp(value: &str) -> Result<f64> {
    let value = value.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(value) {
        return Ok(micros_to_seconds(with_offset.timestamp_micros()));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| RecordError::Timestamp(value.to_string()))?;

    let local = naive
        .and_local_timezone(Local)
        .earliest()
        .ok_or_else(|| RecordError::Timestamp(value.to_string()))?;

    Ok(micros_to_seconds(local.timestamp_micros()))
}

fn micros_to_seconds(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}

/// Produces the canonical encoding of `record`.
///
/// # Errors
///
/// Returns `RecordError::Timestamp` for an unparseable timestamp and
/// `RecordError::Encoding` if encoding fails.
pub fn encode_record(record: &DeploymentRecord) -> Result<Vec<u8>> {
    let encoded = EncodedRecord::from_record(record)?;
    Ok(rmp_serde::to_vec_named(&encoded)?)
}

/// Parses bytes produced by [`encode_record`].
///
/// The payload must re-encode to exactly the same bytes, so reordered
/// keys, positional arrays, wider integers and trailing bytes are all
/// rejected. A payload has exactly one valid reading.
pub fn decode_record(bytes: &[u8]) -> Result<EncodedRecord> {
    let record: EncodedRecord = rmp_serde::from_slice(bytes)?;
    if rmp_serde::to_vec_named(&record)? != bytes {
        return Err(RecordError::Encoding(
            "payload is not in canonical form".to_string(),
        ));
    }
    Ok(record)
}

/// SHA-256 of an encoded record; this is what gets signed.
pub fn record_digest(encoded: &[u8]) -> Hash {
    Sha256::digest(encoded).into()
}

/// Encodes `record` and signs its digest with `signer`.
///
/// # Errors
///
/// See [`encode_record`].
pub fn serialize(record: &DeploymentRecord, signer: &dyn Signer) -> Result<SignedRecord> {
    let payload = encode_record(record)?;
    let digest = record_digest(&payload);
    let signature = signer.sign(&digest);

    tracing::debug!(
        address = %record.address,
        merkle_root = %record.merkle_root,
        bytes = payload.len(),
        "serialized deployment record"
    );

    Ok(SignedRecord { payload, signature })
}

/// Verifies a payload/signature pair against the address inside the payload.
///
/// # Errors
///
/// Returns `RecordError::Encoding` if the payload is not a record,
/// `RecordError::Key` if its address is unusable, and
/// `RecordError::InvalidSignature` if the signature does not verify.
pub fn verify_signed(payload: &[u8], signature: &[u8]) -> Result<EncodedRecord> {
    let record = decode_record(payload)?;
    verify_digest(&record.address, &record_digest(payload), signature)?;
    Ok(record)
}

impl DeploymentRecord {
    /// Builds a record for `signer`, committing to `merkle_root`.
    pub fn new(version: u32, signer: &dyn Signer, merkle_root: String, metadata: Metadata) -> Self {
        DeploymentRecord {
            version,
            address: signer.address(),
            merkle_root,
            metadata,
        }
    }

    /// Canonical encoding plus signature. See [`serialize`].
    pub fn serialize(&self, signer: &dyn Signer) -> Result<SignedRecord> {
        serialize(self, signer)
    }
}
