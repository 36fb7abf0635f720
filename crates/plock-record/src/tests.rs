//! # Cross-Module Tests for Deployment Records
//!
//! These tests run the whole record pipeline: enumerate a project, compute
//! its Merkle root, build and sign a record, then verify it from the bytes
//! alone.

use crate::merkle::sha256_hex;
use crate::project::{project_root, DirectoryLister};
use crate::record::{decode_record, verify_signed};
use crate::signer::{Ed25519Signer, KeyDerivation, Signer};
use crate::{DeploymentRecord, Metadata, RecordError};
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn metadata() -> Metadata {
    Metadata {
        author: "Marcel".to_string(),
        contact_info: "developer666@gmail.com".to_string(),
        software_name: "Plockchain".to_string(),
        version: "1.0.0".to_string(),
        commit_hash: "7cff475efd3f13e2b637f20d8187a3ccddb24efc".to_string(),
        repository_url: "https://github.com/iBrotNano/blockchain_workshop_project".to_string(),
        timestamp: "2026-02-11T10:39:41".to_string(),
    }
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("Cargo.toml"), b"[package]").unwrap();
    fs::write(dir.path().join("src/main.rs"), b"fn main() {}").unwrap();
    dir
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[test]
fn test_project_to_verified_record() {
    let dir = project();
    let signer = Ed25519Signer::derive(KeyDerivation::Generated).unwrap();

    let (root, files) = project_root(&DirectoryLister, dir.path()).unwrap();
    assert_eq!(files.len(), 2);

    let record = DeploymentRecord::new(1, &signer, root.clone(), metadata());
    let signed = record.serialize(&signer).unwrap();

    let decoded = verify_signed(&signed.payload, &signed.signature).unwrap();
    assert_eq!(decoded.address, signer.address());
    assert_eq!(decoded.merkle_root, root);
}

#[test]
fn test_editing_a_file_changes_the_record() {
    let dir = project();
    let signer = Ed25519Signer::from_secret(&[1u8; 32]);

    let (before_root, _) = project_root(&DirectoryLister, dir.path()).unwrap();
    fs::write(dir.path().join("src/main.rs"), b"fn main() { evil() }").unwrap();
    let (after_root, _) = project_root(&DirectoryLister, dir.path()).unwrap();
    assert_ne!(before_root, after_root);

    let before = DeploymentRecord::new(1, &signer, before_root, metadata())
        .serialize(&signer)
        .unwrap();
    let after = DeploymentRecord::new(1, &signer, after_root, metadata())
        .serialize(&signer)
        .unwrap();

    assert_ne!(before.payload, after.payload);
    assert_ne!(before.signature, after.signature);
}

#[test]
fn test_single_file_project_root_is_file_hash() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("only.txt"), b"one").unwrap();

    let (root, _) = project_root(&DirectoryLister, dir.path()).unwrap();
    assert_eq!(root, sha256_hex("one"));
}

#[test]
fn test_version_is_taken_from_caller() {
    let signer = Ed25519Signer::from_secret(&[2u8; 32]);
    let record = DeploymentRecord::new(7, &signer, sha256_hex("x"), metadata());
    let signed = record.serialize(&signer).unwrap();

    assert_eq!(decode_record(&signed.payload).unwrap().version, 7);
}

#[test]
fn test_tampered_payload_fails_verification() {
    let signer = Ed25519Signer::from_secret(&[3u8; 32]);
    let record = DeploymentRecord::new(1, &signer, sha256_hex("x"), metadata());
    let signed = record.serialize(&signer).unwrap();

    let mut forged = record.clone();
    forged.metadata.author = "Mallory".to_string();
    let forged_payload = crate::record::encode_record(&forged).unwrap();

    let result = verify_signed(&forged_payload, &signed.signature);
    assert!(matches!(result, Err(RecordError::InvalidSignature(_))));
}
