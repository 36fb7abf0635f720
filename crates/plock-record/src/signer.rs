//! # Signing Identities
//!
//! A [`Signer`] is the capability that holds a private key. The rest of the
//! system only ever asks it for its address and for a signature over a
//! 32-byte digest; where the key came from is decided once, at
//! construction, by a [`KeyDerivation`] strategy.
//!
//! ## Addresses
//!
//! An address is the Base58 encoding of the 32-byte Ed25519 public key.
//! Because the address *is* the public key, anyone holding a record can
//! recover the verifying key from it and check the signature without a
//! directory lookup.
//!
//! ## Key Derivation
//!
//! | Strategy | Secret key |
//! |----------|------------|
//! | `Generated` | 32 random bytes from the OS RNG |
//! | `MnemonicCustom` | first 32 bytes of the BIP-39 seed |
//! | `MnemonicPlatform` | first 32 bytes of the BIP-39 seed, wallet-compatible keypair layout |
//!
//! ## References
//!
//! - RFC 8032 - Edwards-Curve Digital Signature Algorithm (EdDSA)
//! - BIP-39 - Mnemonic code for generating deterministic keys

use crate::models::{Hash, RecordError, Result, Signature, HASH_SIZE};
use bip39::Mnemonic;
use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

/// Something that can sign record digests on behalf of an address.
pub trait Signer: Send + Sync {
    /// The address records signed by this signer are attributed to.
    fn address(&self) -> String;

    /// Signs a 32-byte digest.
    fn sign(&self, digest: &Hash) -> Signature;
}

/// How the secret key of an [`Ed25519Signer`] is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDerivation {
    /// Fresh random key.
    Generated,

    /// Key derived from a BIP-39 phrase.
    MnemonicCustom(String),

    /// Key derived from a BIP-39 phrase the way wallet keypairs are
    /// restored from a seed.
    MnemonicPlatform(String),
}

/// An Ed25519 keypair with its Base58 address.
pub struct Ed25519Signer {
    key: SigningKey,
    address: String,
}

impl Ed25519Signer {
    /// Builds a signer using the given derivation strategy.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Key` if a mnemonic phrase is not a valid
    /// BIP-39 English phrase.
    ///
    /// # Example
    ///
    /// ```rust
    /// use plock_record::signer::{Ed25519Signer, KeyDerivation, Signer};
    ///
    /// let phrase = Ed25519Signer::generate_mnemonic().unwrap();
    /// let a = Ed25519Signer::derive(KeyDerivation::MnemonicCustom(phrase.clone())).unwrap();
    /// let b = Ed25519Signer::derive(KeyDerivation::MnemonicCustom(phrase)).unwrap();
    ///
    /// assert_eq!(a.address(), b.address());
    /// ```
    pub fn derive(derivation: KeyDerivation) -> Result<Self> {
        match derivation {
            KeyDerivation::Generated => {
                let mut secret = [0u8; 32];
                OsRng.fill_bytes(&mut secret);
                Ok(Self::from_secret(&secret))
            }
            KeyDerivation::MnemonicCustom(phrase) => {
                let seed = mnemonic_seed(&phrase)?;
                Ok(Self::from_secret(&seed))
            }
            KeyDerivation::MnemonicPlatform(phrase) => {
                let seed = mnemonic_seed(&phrase)?;
                let keypair = SigningKey::from_bytes(&seed).to_keypair_bytes();
                Self::from_keypair_bytes(&keypair)
            }
        }
    }

    /// Builds a signer from a raw 32-byte secret key.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let key = SigningKey::from_bytes(secret);
        let address = address_from_public_key(key.verifying_key().as_bytes());
        Ed25519Signer { key, address }
    }

    /// Builds a signer from 64 bytes of `secret ‖ public`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Key` if the public half does not belong to
    /// the secret half.
    pub fn from_keypair_bytes(bytes: &[u8; 64]) -> Result<Self> {
        let key = SigningKey::from_keypair_bytes(bytes)
            .map_err(|e| RecordError::Key(e.to_string()))?;
        let address = address_from_public_key(key.verifying_key().as_bytes());
        Ok(Ed25519Signer { key, address })
    }

    /// Generates a new 12-word English BIP-39 phrase.
    pub fn generate_mnemonic() -> Result<String> {
        let mut entropy = [0u8; 16];
        OsRng.fill_bytes(&mut entropy);
        let mnemonic =
            Mnemonic::from_entropy(&entropy).map_err(|e| RecordError::Key(e.to_string()))?;
        Ok(mnemonic.to_string())
    }

    /// Raw 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// `secret ‖ public`, 64 bytes.
    pub fn keypair_bytes(&self) -> [u8; 64] {
        self.key.to_keypair_bytes()
    }
}

impl Signer for Ed25519Signer {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn sign(&self, digest: &Hash) -> Signature {
        self.key.sign(digest).to_bytes()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn mnemonic_seed(phrase: &str) -> Result<[u8; 32]> {
    let mnemonic =
        Mnemonic::parse_normalized(phrase).map_err(|e| RecordError::Key(e.to_string()))?;
    let seed = mnemonic.to_seed("");
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&seed[..32]);
    Ok(secret)
}

/// Base58 address of a 32-byte Ed25519 public key.
pub fn address_from_public_key(public_key: &[u8; 32]) -> String {
    bs58::encode(public_key).into_string()
}

/// Recovers the verifying key encoded in an address.
///
/// # Errors
///
/// Returns `RecordError::Key` if the address is not Base58, does not decode
/// to 32 bytes, or is not a valid curve point.
pub fn public_key_from_address(address: &str) -> Result<VerifyingKey> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| RecordError::Key(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| RecordError::Key(format!("address decodes to {} bytes", bytes.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| RecordError::Key(e.to_string()))
}

/// Checks `signature` over `digest` against the key behind `address`.
///
/// # Errors
///
/// Returns `RecordError::Key` for an unusable address and
/// `RecordError::InvalidSignature` when verification fails.
pub fn verify_digest(address: &str, digest: &[u8; HASH_SIZE], signature: &[u8]) -> Result<()> {
    let key = public_key_from_address(address)?;
    let signature = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| RecordError::InvalidSignature(address.to_string()))?;
    key.verify(digest, &signature)
        .map_err(|_| RecordError::InvalidSignature(address.to_string()))
}
