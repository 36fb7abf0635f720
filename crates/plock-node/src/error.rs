//! Error types for the service node and the submission client.

use plock_chain::ChainError;
use plock_record::RecordError;
use std::time::Duration;
use thiserror::Error;

/// Node error type for networking, gossip and submission handling.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A TCP connection to a peer or service could not be opened.
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        /// The `host:port` that was dialed.
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing an open connection failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A connect or read did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being waited on.
        operation: &'static str,
        after: Duration,
    },

    /// A line is not valid JSON or lacks required keys.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A submitted signature does not verify against its record.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A well-formed message arrived where another type was expected.
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// The service answered a submission with `failure`.
    #[error("submission rejected by service")]
    Rejected,

    /// A configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Record error passthrough.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Chain error passthrough.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}

/// Result type alias for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

/// Failure kinds of the client deploy flow, each surfaced separately.
#[derive(Debug, Error)]
pub enum DeployError {
    /// No signing identity could be loaded.
    #[error("keystore unavailable: {0}")]
    Keystore(String),

    /// The project or record could not be hashed, encoded or signed.
    #[error("cannot encode deployment record: {0}")]
    Encode(#[source] RecordError),

    /// The record could not be delivered to the service.
    #[error("network failure: {0}")]
    Network(#[source] NodeError),

    /// The service received the record and answered `failure`.
    #[error("deployment record rejected by {0}")]
    Rejected(String),
}
