//! # Plockchain Records - Signed Deployment Attestations
//!
//! A deployment record states that a specific version of a project tree was
//! deployed by a specific cryptographic identity. This crate builds those
//! records: it commits to the project's files with a Merkle root, encodes
//! the record canonically and signs the encoding's digest.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`merkle`] | Merkle root over ordered file contents |
//! | [`record`] | Canonical encoding, digest signing and verification |
//! | [`signer`] | Ed25519 signing identities and key derivation |
//! | [`project`] | Deterministic project file enumeration |
//! | [`models`] | Shared types and errors |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   contents   ┌──────────────┐  merkle_root  ┌──────────────┐
//! │  FileLister  │─────────────▶│  MerkleTree  │──────────────▶│  Deployment  │
//! │ (sorted walk)│              │ (hex pairs)  │               │    Record    │
//! └──────────────┘              └──────────────┘               └──────┬───────┘
//!                                                                     │ encode
//!                                                                     ▼
//!                               ┌──────────────┐  SHA-256      ┌──────────────┐
//!                               │    Signer    │◀──────────────│  canonical   │
//!                               │  (Ed25519)   │               │    bytes     │
//!                               └──────┬───────┘               └──────────────┘
//!                                      │
//!                                      ▼
//!                            SignedRecord { payload, signature }
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plock_record::project::{project_root, DirectoryLister};
//! use plock_record::signer::{Ed25519Signer, KeyDerivation};
//! use plock_record::{DeploymentRecord, Metadata};
//! use std::path::Path;
//!
//! let signer = Ed25519Signer::derive(KeyDerivation::Generated).unwrap();
//! let (root, _files) = project_root(&DirectoryLister, Path::new(".")).unwrap();
//!
//! let metadata = Metadata {
//!     author: "Marcel".into(),
//!     contact_info: "dev@example.com".into(),
//!     software_name: "plockchain".into(),
//!     version: "1.0.0".into(),
//!     commit_hash: "7cff475".into(),
//!     repository_url: "https://example.com/commit/7cff475".into(),
//!     timestamp: "2026-02-11T10:39:41".into(),
//! };
//!
//! let record = DeploymentRecord::new(1, &signer, root, metadata);
//! let signed = record.serialize(&signer).unwrap();
//! println!("payload: {}", signed.payload_hex());
//! ```
//!
//! ## Security Notes
//!
//! - Leaf order is part of the commitment; always enumerate files through
//!   a deterministic lister.
//! - The signature covers the SHA-256 digest of the payload. Verifiers must
//!   hash the exact payload bytes, never a re-encoding.

pub mod merkle;
pub mod models;
pub mod project;
pub mod record;
pub mod signer;

pub use models::{
    DeploymentRecord, Hash, Metadata, RecordError, Result, Signature, SignedRecord, HASH_SIZE,
    SIGNATURE_SIZE,
};

#[cfg(test)]
mod tests;
