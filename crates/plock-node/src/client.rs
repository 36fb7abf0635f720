//! Client side of record submission.
//!
//! [`SubmissionClient`] sends one signed record per connection and reports
//! the service's answer. [`deploy`] runs the whole client flow: derive the
//! signer, hash the project, sign the record and submit it. Each stage
//! fails with its own [`DeployError`] kind. Nothing is retried.

use crate::config::{ClientConfig, DEFAULT_DIAL_TIMEOUT, DEFAULT_READ_TIMEOUT};
use crate::error::{DeployError, NodeError, Result};
use crate::protocol::{request, Message, Status};
use plock_record::project::{project_root, FileLister};
use plock_record::signer::{Ed25519Signer, KeyDerivation};
use plock_record::{DeploymentRecord, Metadata, SignedRecord};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Sends signed records to a service node.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    address: String,
    dial_timeout: Duration,
    read_timeout: Duration,
}

impl SubmissionClient {
    /// Creates a client for the service at `address` (`host:port`).
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Creates a client for the configured service address.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.service_address.clone())
    }

    /// Overrides the connect and reply timeouts.
    pub fn with_timeouts(mut self, dial: Duration, read: Duration) -> Self {
        self.dial_timeout = dial;
        self.read_timeout = read;
        self
    }

    /// The service address this client talks to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Submits one signed record.
    ///
    /// # Returns
    ///
    /// The status the service answered with. `Status::Failure` is a valid
    /// answer, not an error.
    ///
    /// # Errors
    ///
    /// Connect, timeout and I/O failures, a malformed reply, or a reply of
    /// the wrong type.
    pub async fn submit(&self, record: &SignedRecord) -> Result<Status> {
        let message = Message::AddDeploymentRecord {
            record: record.payload_hex(),
            signature: record.signature_hex(),
        };

        match request(&self.address, &message, self.dial_timeout, self.read_timeout).await? {
            Message::AddDeploymentRecordResponse { status } => {
                info!(service = %self.address, ?status, "submission answered");
                Ok(status)
            }
            other => Err(NodeError::UnexpectedMessage {
                expected: "add_deployment_record_response",
                got: other.kind(),
            }),
        }
    }
}

/// What a successful deploy produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReceipt {
    /// Address of the signing identity.
    pub address: String,

    /// Merkle root of the project files.
    pub merkle_root: String,

    /// Number of files committed to.
    pub files: usize,

    /// The submitted record.
    pub record: SignedRecord,
}

/// Builds, signs and submits a deployment record for the project at `root`.
///
/// # Arguments
///
/// * `config` - record version and service address
/// * `derivation` - how to obtain the signing key
/// * `lister` - project file enumeration
/// * `root` - project root directory
/// * `metadata` - deployment metadata, validated before signing
///
/// # Errors
///
/// - `DeployError::Keystore` if the signer cannot be derived
/// - `DeployError::Encode` if metadata is invalid, the project has no
///   files, or encoding fails
/// - `DeployError::Network` if the service cannot be reached
/// - `DeployError::Rejected` if the service answers `failure`
pub async fn deploy(
    config: &ClientConfig,
    derivation: KeyDerivation,
    lister: &dyn FileLister,
    root: &Path,
    metadata: Metadata,
) -> std::result::Result<DeployReceipt, DeployError> {
    let signer =
        Ed25519Signer::derive(derivation).map_err(|e| DeployError::Keystore(e.to_string()))?;

    metadata.validate().map_err(DeployError::Encode)?;
    let (merkle_root, files) = project_root(lister, root).map_err(DeployError::Encode)?;

    let record = DeploymentRecord::new(
        config.deployment_record_version,
        &signer,
        merkle_root.clone(),
        metadata,
    );
    let signed = record.serialize(&signer).map_err(DeployError::Encode)?;

    let client = SubmissionClient::from_config(config);
    match client.submit(&signed).await.map_err(DeployError::Network)? {
        Status::Success => Ok(DeployReceipt {
            address: record.address,
            merkle_root,
            files: files.len(),
            record: signed,
        }),
        Status::Failure => Err(DeployError::Rejected(config.service_address.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plock_record::project::ProjectFile;
    use plock_record::{RecordError, Result as RecordResult};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    struct FixedLister(Vec<&'static str>);

    impl FileLister for FixedLister {
        fn list_project_files(&self, _root: &Path) -> RecordResult<Vec<ProjectFile>> {
            Ok(self
                .0
                .iter()
                .map(|name| ProjectFile {
                    relative_path: name.to_string(),
                    contents: name.as_bytes().to_vec(),
                })
                .collect())
        }
    }

    fn metadata() -> Metadata {
        Metadata {
            author: "Marcel".to_string(),
            contact_info: "dev@example.com".to_string(),
            software_name: "plockchain".to_string(),
            version: "1.0.0".to_string(),
            commit_hash: "7cff475".to_string(),
            repository_url: "https://example.com/commit/7cff475".to_string(),
            timestamp: "2026-02-11T10:39:41".to_string(),
        }
    }

    /// Serves a single canned reply line and returns the request it saw.
    async fn one_shot_service(reply: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut line = String::new();
            BufReader::new(read_half).read_line(&mut line).await.unwrap();
            write_half.write_all(reply.as_bytes()).await.unwrap();
            line
        });

        (addr, handle)
    }

    #[tokio::test]
    async fn test_submit_sends_hex_line() {
        let (addr, seen) = one_shot_service(
            "{\"type\":\"add_deployment_record_response\",\"status\":\"success\"}\n",
        )
        .await;

        let record = SignedRecord {
            payload: vec![0xa1, 0xb2],
            signature: [0xc3; 64],
        };
        let status = SubmissionClient::new(addr).submit(&record).await.unwrap();
        assert_eq!(status, Status::Success);

        let line = seen.await.unwrap();
        let expected = format!(
            "{{\"type\":\"add_deployment_record\",\"record\":\"a1b2\",\"signature\":\"{}\"}}\n",
            "c3".repeat(64)
        );
        assert_eq!(line, expected);
    }

    #[tokio::test]
    async fn test_submit_rejects_wrong_reply() {
        let (addr, _seen) =
            one_shot_service("{\"type\":\"peer_list\",\"peers\":[],\"me\":\"x:1\"}\n").await;

        let record = SignedRecord {
            payload: vec![1],
            signature: [0; 64],
        };
        let err = SubmissionClient::new(addr).submit(&record).await.unwrap_err();
        assert!(matches!(err, NodeError::UnexpectedMessage { .. }));
    }

    #[tokio::test]
    async fn test_deploy_keystore_error() {
        let err = deploy(
            &ClientConfig::default(),
            KeyDerivation::MnemonicCustom("not a valid phrase".to_string()),
            &FixedLister(vec!["a"]),
            Path::new("."),
            metadata(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Keystore(_)));
    }

    #[tokio::test]
    async fn test_deploy_encode_error_on_empty_project() {
        let err = deploy(
            &ClientConfig::default(),
            KeyDerivation::Generated,
            &FixedLister(vec![]),
            Path::new("."),
            metadata(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Encode(RecordError::EmptyInput)));
    }

    #[tokio::test]
    async fn test_deploy_encode_error_on_bad_metadata() {
        let mut bad = metadata();
        bad.author = "  ".to_string();

        let err = deploy(
            &ClientConfig::default(),
            KeyDerivation::Generated,
            &FixedLister(vec!["a"]),
            Path::new("."),
            bad,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Encode(RecordError::InvalidMetadata(_))));
    }

    #[tokio::test]
    async fn test_deploy_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let config = ClientConfig {
            service_address: addr,
            ..ClientConfig::default()
        };
        let err = deploy(
            &config,
            KeyDerivation::Generated,
            &FixedLister(vec!["a"]),
            Path::new("."),
            metadata(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Network(NodeError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_deploy_rejected() {
        let (addr, _seen) = one_shot_service(
            "{\"type\":\"add_deployment_record_response\",\"status\":\"failure\"}\n",
        )
        .await;

        let config = ClientConfig {
            service_address: addr,
            ..ClientConfig::default()
        };
        let err = deploy(
            &config,
            KeyDerivation::Generated,
            &FixedLister(vec!["a", "b"]),
            Path::new("."),
            metadata(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DeployError::Rejected(_)));
    }
}
