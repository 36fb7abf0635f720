//! # Wire Protocol
//!
//! Every exchange is one TCP connection carrying one request line and at
//! most one reply line. A line is a single JSON object terminated by `\n`,
//! discriminated by its `type` key.
//!
//! ## Messages
//!
//! | `type` | Fields | Direction |
//! |--------|--------|-----------|
//! | `hello` | `peers`, `me` | dialer → node |
//! | `peer_list` | `peers`, `me` | node → dialer |
//! | `add_deployment_record` | `record`, `signature` (hex) | client → node |
//! | `add_deployment_record_response` | `status` | node → client |
//!
//! ```text
//! {"type":"add_deployment_record","record":"a1b2..","signature":"c3d4.."}\n
//! {"type":"add_deployment_record_response","status":"success"}\n
//! ```
//!
//! Connections are never reused.

use crate::error::{NodeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Longest line accepted from a peer.
pub const MAX_LINE_BYTES: u64 = 4 * 1024 * 1024;

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Opens a gossip exchange, carrying the dialer's known peers.
    Hello { peers: Vec<String>, me: String },

    /// Reply to `hello` with the receiver's known peers.
    PeerList { peers: Vec<String>, me: String },

    /// A hex-encoded record payload and signature.
    AddDeploymentRecord { record: String, signature: String },

    /// Reply to a submission.
    AddDeploymentRecordResponse { status: Status },
}

impl Message {
    /// Wire name of this message's type, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Hello { .. } => "hello",
            Message::PeerList { .. } => "peer_list",
            Message::AddDeploymentRecord { .. } => "add_deployment_record",
            Message::AddDeploymentRecordResponse { .. } => "add_deployment_record_response",
        }
    }

    /// Serializes to a single `\n`-terminated line.
    pub fn to_line(&self) -> Result<String> {
        let mut line =
            serde_json::to_string(self).map_err(|e| NodeError::MalformedMessage(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one line, with or without its trailing newline.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::MalformedMessage` for invalid JSON, an unknown
    /// `type`, or missing keys.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
            .map_err(|e| NodeError::MalformedMessage(e.to_string()))
    }
}

/// Reads one message line, giving up after `limit`.
///
/// # Errors
///
/// - `NodeError::Timeout` if no full line arrives in time
/// - `NodeError::MalformedMessage` if the peer closes without sending a
///   line, the line is too long, or it does not parse
pub async fn read_message<R>(reader: &mut R, limit: Duration) -> Result<Message>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut bounded = reader.take(MAX_LINE_BYTES);

    let read = timeout(limit, bounded.read_line(&mut line))
        .await
        .map_err(|_| NodeError::Timeout {
            operation: "read",
            after: limit,
        })??;

    if read == 0 {
        return Err(NodeError::MalformedMessage(
            "connection closed before a message arrived".to_string(),
        ));
    }
    if !line.ends_with('\n') {
        return Err(NodeError::MalformedMessage(format!(
            "line not terminated within {} bytes",
            read
        )));
    }

    Message::from_line(&line)
}

/// Writes one message line and flushes.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(message.to_line()?.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Opens a connection to `addr`, giving up after `limit`.
pub async fn connect(addr: &str, limit: Duration) -> Result<TcpStream> {
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(NodeError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(NodeError::Timeout {
            operation: "connect",
            after: limit,
        }),
    }
}

/// One request/reply exchange on a fresh connection.
///
/// # Arguments
///
/// * `addr` - `host:port` to dial
/// * `request` - message to send
/// * `dial_timeout` - connect limit
/// * `read_timeout` - limit for the reply line
pub async fn request(
    addr: &str,
    request: &Message,
    dial_timeout: Duration,
    read_timeout: Duration,
) -> Result<Message> {
    let stream = connect(addr, dial_timeout).await?;
    let (read_half, mut write_half) = stream.into_split();

    write_message(&mut write_half, request).await?;
    let mut reader = BufReader::new(read_half);
    read_message(&mut reader, read_timeout).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_wire_format() {
        let msg = Message::AddDeploymentRecord {
            record: "a1b2".to_string(),
            signature: "c3d4".to_string(),
        };
        assert_eq!(
            msg.to_line().unwrap(),
            "{\"type\":\"add_deployment_record\",\"record\":\"a1b2\",\"signature\":\"c3d4\"}\n"
        );
    }

    #[test]
    fn test_response_wire_format() {
        let ok = Message::AddDeploymentRecordResponse {
            status: Status::Success,
        };
        let failed = Message::AddDeploymentRecordResponse {
            status: Status::Failure,
        };
        assert_eq!(
            ok.to_line().unwrap(),
            "{\"type\":\"add_deployment_record_response\",\"status\":\"success\"}\n"
        );
        assert!(failed.to_line().unwrap().contains("\"status\":\"failure\""));
    }

    #[test]
    fn test_gossip_wire_format() {
        let hello = Message::Hello {
            peers: vec!["127.0.0.1:5001".to_string()],
            me: "127.0.0.1:5000".to_string(),
        };
        assert_eq!(
            hello.to_line().unwrap(),
            "{\"type\":\"hello\",\"peers\":[\"127.0.0.1:5001\"],\"me\":\"127.0.0.1:5000\"}\n"
        );

        let parsed =
            Message::from_line("{\"type\":\"peer_list\",\"peers\":[],\"me\":\"h:1\"}\n").unwrap();
        assert_eq!(
            parsed,
            Message::PeerList {
                peers: vec![],
                me: "h:1".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            "not json",
            "{\"type\":\"hello\",\"peers\":[]}",
            "{\"type\":\"shutdown\"}",
            "{\"record\":\"aa\",\"signature\":\"bb\"}",
            "{\"type\":\"add_deployment_record_response\",\"status\":\"maybe\"}",
        ] {
            assert!(
                matches!(Message::from_line(line), Err(NodeError::MalformedMessage(_))),
                "accepted: {}",
                line
            );
        }
    }

    #[tokio::test]
    async fn test_read_message_from_stream() {
        let data = b"{\"type\":\"hello\",\"peers\":[],\"me\":\"a:1\"}\nleftover";
        let mut reader = BufReader::new(&data[..]);

        let msg = read_message(&mut reader, Duration::from_secs(1)).await.unwrap();
        assert_eq!(msg.kind(), "hello");
    }

    #[tokio::test]
    async fn test_read_message_eof() {
        let mut reader = BufReader::new(&b""[..]);
        let err = read_message(&mut reader, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NodeError::MalformedMessage(_)));
    }

    #[tokio::test]
    async fn test_read_message_unterminated() {
        let mut reader = BufReader::new(&b"{\"type\":\"hello\""[..]);
        let err = read_message(&mut reader, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NodeError::MalformedMessage(_)));
    }

    #[tokio::test]
    async fn test_read_message_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(client);

        let err = read_message(&mut reader, Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, NodeError::Timeout { operation: "read", .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = connect(&addr, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NodeError::Connect { .. }));
    }
}
