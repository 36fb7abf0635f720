//! # Plockchain Chain - Blocks, Storage and Mempool
//!
//! Service nodes turn accepted deployment records into an append-only,
//! hash-linked block log. This crate holds the three pieces involved.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Mempool`] | Bounded FIFO of accepted-but-unframed records |
//! | [`Block`] | 50-byte header + payload + signature frame |
//! | [`ChainStore`] | Height-keyed append-only persistence (Sled) |
//!
//! ## Flow
//!
//! ```text
//!   submission ──▶ Mempool (tail)
//!                     │ pop head
//!                     ▼
//!                   Block::new(payload, signature, H(latest))
//!                     │ build
//!                     ▼
//!                   ChainStore::add_block ──▶ height n
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use plock_chain::{Block, ChainStore, Mempool, MempoolEntry};
//! use plock_chain::block::hash_block;
//!
//! let store = ChainStore::temporary()?;
//! let mut pool = Mempool::new();
//!
//! pool.push(MempoolEntry::new(b"record".to_vec(), vec![0u8; 64]))?;
//! let entry = pool.pop().expect("just pushed");
//!
//! let previous = store.get_latest_block()?.map(|b| hash_block(&b));
//! let block = Block::new(entry.payload, entry.signature, previous)?;
//! assert_eq!(store.add_block(&block.build())?, 0);
//! # Ok::<(), plock_chain::ChainError>(())
//! ```
//!
//! ## Non-goals
//!
//! There is no fork choice and no chain validation: the store records what
//! it is given, in order.

pub mod block;
mod error;
pub mod mempool;
pub mod store;

pub use block::{Block, BlockHeader};
pub use error::{ChainError, Result};
pub use mempool::{Mempool, MempoolEntry};
pub use store::ChainStore;
