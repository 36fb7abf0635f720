//! # Merkle Root over Project Files
//!
//! This module commits to an ordered list of file contents with a single
//! hash. Any change to any file, and any change to the order of files,
//! changes the root.
//!
//! ## Construction
//!
//! ```text
//!                    Root = H(H12 ‖ H33)
//!                   /                   \
//!           H12 = H(H1 ‖ H2)     H33 = H(H3 ‖ H3)
//!            /      \              /      \
//!          H1        H2          H3       (H3)   ← odd level: last duplicated
//!          |         |           |
//!        file1     file2       file3
//! ```
//!
//! - A leaf is the lowercase hex SHA-256 of a file's bytes.
//! - A parent is the SHA-256 of the two child **hex strings** concatenated
//!   as UTF-8 text, again rendered as hex.
//! - When a level has an odd number of nodes, the last value is copied (not
//!   re-hashed) before pairing.
//!
//! ## References
//!
//! - **Merkle, R. C. (1979)** - "Secrecy, Authentication, and Public Key Systems"
//!   <https://www.ralphmerkle.com/papers/Thesis1979.pdf>
//! - **Bitcoin** - odd-level duplication of the last node

use crate::models::{RecordError, Result};
use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Computes the Merkle root over file contents in the given order.
///
/// # Errors
///
/// Returns `RecordError::EmptyInput` when no contents are supplied.
///
/// # Example
///
/// ```rust
/// use plock_record::merkle::{compute_root, sha256_hex};
///
/// let root = compute_root(["one"]).unwrap();
/// assert_eq!(root, sha256_hex("one"));
/// ```
pub fn compute_root<I, B>(contents: I) -> Result<String>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut tree = MerkleTree::new();
    for content in contents {
        tree.push_content(content);
    }
    tree.root()
}

/// An ordered set of leaf hashes.
///
/// The root is recomputed from the leaves on every call to [`root`], so
/// it always reflects the current contents.
///
/// [`root`]: MerkleTree::root
///
/// # Example
///
/// ```rust
/// use plock_record::merkle::MerkleTree;
///
/// let mut tree = MerkleTree::new();
/// tree.push_content(b"a");
/// tree.push_content(b"b");
///
/// let root = tree.root().unwrap();
/// assert_eq!(root.len(), 64);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    /// Hex leaf hashes in insertion order.
    leaves: Vec<String>,
}

impl MerkleTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        MerkleTree { leaves: Vec::new() }
    }

    /// Hashes `content` and appends it as the next leaf.
    pub fn push_content(&mut self, content: impl AsRef<[u8]>) {
        self.leaves.push(sha256_hex(content));
    }

    /// Appends an already computed hex leaf hash.
    pub fn push_leaf(&mut self, leaf_hex: String) {
        self.leaves.push(leaf_hex);
    }

    /// Leaf hashes in order.
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    /// Returns the number of leaves in the tree.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Computes the root hash, bottom-up.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::EmptyInput` for a tree without leaves.
    pub fn root(&self) -> Result<String> {
        if self.leaves.is_empty() {
            return Err(RecordError::EmptyInput);
        }

        let mut level = self.leaves.clone();

        while level.len() > 1 {
            if level.len() % 2 != 0 {
                if let Some(last) = level.last().cloned() {
                    level.push(last);
                }
            }

            level = level
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
        }

        Ok(level.swap_remove(0))
    }
}

/// Hashes two hex nodes together as text.
fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(data: &str) -> String {
        sha256_hex(data)
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::new();
        assert!(tree.is_empty());
        assert!(matches!(tree.root(), Err(RecordError::EmptyInput)));
    }

    #[test]
    fn test_empty_input_rejected() {
        let files: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(compute_root(files), Err(RecordError::EmptyInput)));
    }

    #[test]
    fn test_single_leaf() {
        // Single leaf: root is the leaf itself
        assert_eq!(compute_root(["one"]).unwrap(), h("one"));
    }

    #[test]
    fn test_two_leaves() {
        let expected = h(&(h("a") + &h("b")));
        assert_eq!(compute_root(["a", "b"]).unwrap(), expected);
    }

    #[test]
    fn test_three_leaves_duplicates_last() {
        let left = h(&(h("a") + &h("b")));
        let right = h(&(h("c") + &h("c")));
        let expected = h(&(left + &right));

        assert_eq!(compute_root(["a", "b", "c"]).unwrap(), expected);
    }

    #[test]
    fn test_five_leaves() {
        let ab = h(&(h("a") + &h("b")));
        let cd = h(&(h("c") + &h("d")));
        let ee = h(&(h("e") + &h("e")));
        let abcd = h(&(ab + &cd));
        let eeee = h(&(ee.clone() + &ee));
        let expected = h(&(abcd + &eeee));

        assert_eq!(compute_root(["a", "b", "c", "d", "e"]).unwrap(), expected);
    }

    #[test]
    fn test_root_deterministic() {
        let files = ["fn main() {}", "[package]", "README"];
        assert_eq!(compute_root(files).unwrap(), compute_root(files).unwrap());
    }

    #[test]
    fn test_order_is_part_of_commitment() {
        assert_ne!(
            compute_root(["a", "b"]).unwrap(),
            compute_root(["b", "a"]).unwrap()
        );
    }

    #[test]
    fn test_root_changes_with_content() {
        let before = compute_root(["a", "b"]).unwrap();
        let after = compute_root(["a", "B"]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_push_leaf_matches_push_content() {
        let mut by_content = MerkleTree::new();
        by_content.push_content("x");
        by_content.push_content("y");

        let mut by_leaf = MerkleTree::new();
        by_leaf.push_leaf(h("x"));
        by_leaf.push_leaf(h("y"));

        assert_eq!(by_content, by_leaf);
        assert_eq!(by_content.root().unwrap(), by_leaf.root().unwrap());
    }
}
