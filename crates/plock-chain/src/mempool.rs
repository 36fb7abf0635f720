//! # Mempool
//!
//! FIFO holding area for records that have been accepted but not yet
//! framed into a block. Entries leave in exactly the order they arrived.
//!
//! The pool is bounded: once `capacity` entries are pending, further pushes
//! are refused instead of growing without limit.
//!
//! # Thread Safety
//!
//! `Mempool` is a plain owned value. The service that receives submissions
//! owns it and wraps it in a lock.

use crate::error::{ChainError, Result};
use std::collections::VecDeque;

/// Default number of pending entries.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A pending record: canonical payload plus its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolEntry {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl MempoolEntry {
    pub fn new(payload: Vec<u8>, signature: Vec<u8>) -> Self {
        MempoolEntry { payload, signature }
    }
}

/// Bounded FIFO queue of pending records.
///
/// # Example
///
/// ```rust
/// use plock_chain::mempool::{Mempool, MempoolEntry};
///
/// let mut pool = Mempool::with_capacity(2);
/// pool.push(MempoolEntry::new(b"first".to_vec(), vec![])).unwrap();
/// pool.push(MempoolEntry::new(b"second".to_vec(), vec![])).unwrap();
/// assert!(pool.push(MempoolEntry::new(b"third".to_vec(), vec![])).is_err());
///
/// assert_eq!(pool.pop().unwrap().payload, b"first");
/// ```
#[derive(Debug, Clone)]
pub struct Mempool {
    queue: VecDeque<MempoolEntry>,
    capacity: usize,
}

impl Mempool {
    /// Creates a pool holding at most [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a pool holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Mempool {
            queue: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an entry at the tail.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::MempoolFull` when the pool is at capacity.
    pub fn push(&mut self, entry: MempoolEntry) -> Result<()> {
        if self.queue.len() >= self.capacity {
            tracing::warn!(capacity = self.capacity, "mempool full, rejecting entry");
            return Err(ChainError::MempoolFull {
                capacity: self.capacity,
            });
        }
        self.queue.push_back(entry);
        Ok(())
    }

    /// Removes and returns the oldest entry.
    pub fn pop(&mut self) -> Option<MempoolEntry> {
        self.queue.pop_front()
    }

    /// Removes the oldest entry, failing when there is none.
    ///
    /// # Errors
    ///
    /// Returns `ChainError::MempoolEmpty` when nothing is pending.
    pub fn take_head(&mut self) -> Result<MempoolEntry> {
        self.pop().ok_or(ChainError::MempoolEmpty)
    }

    /// Returns the oldest entry without removing it.
    pub fn peek(&self) -> Option<&MempoolEntry> {
        self.queue.front()
    }

    /// Puts an entry back at the head, ahead of everything else.
    ///
    /// Used when a popped entry could not be committed. Capacity is not
    /// checked; the caller restores only what it popped.
    pub fn restore(&mut self, entry: MempoolEntry) {
        self.queue.push_front(entry);
    }

    /// Removes and returns the newest entry.
    pub fn pop_back(&mut self) -> Option<MempoolEntry> {
        self.queue.pop_back()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}
