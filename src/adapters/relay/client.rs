//! Relayer HTTP Client - Signed Batch Submission and Status Polling
//!
//! Implements the `Relay` port against the relayer REST API:
//! - `POST /submit` with the batch, signed by the local signer
//! - `GET /transaction?id=` polled until a terminal state
//!
//! The client never retries a submission itself. Retry and backoff
//! decisions belong to the execution engine, which sees every
//! rejection as a [`RelayError`].

use std::time::Duration;

use alloy::hex;
use alloy::primitives::{keccak256, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info, instrument, warn};

use crate::config::{RelayConfig, RelayTxType};
use crate::domain::batch::TransactionBatch;
use crate::ports::relay::{Relay, RelayError, RelayHandle, RelayOutcome};

use super::auth::{BuilderAuth, RequestNonce};
use super::types::{
    classify_state, StateClass, StatusResponse, SubmitPayload, SubmitRequest, SubmitResponse,
};

const SUBMIT_PATH: &str = "/submit";
const STATUS_PATH: &str = "/transaction";

/// Configuration for the relayer client.
#[derive(Debug, Clone)]
pub struct RelayClientConfig {
    /// Base URL, without trailing slash.
    pub base_url: String,
    pub tx_type: RelayTxType,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Polls before giving up on a submitted transaction.
    pub max_polls: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl From<&RelayConfig> for RelayClientConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            tx_type: config.tx_type,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

/// HTTP client for the relayer.
pub struct RelayClient {
    http: Client,
    config: RelayClientConfig,
    signer: PrivateKeySigner,
    proxy_wallet: Address,
    auth: Option<BuilderAuth>,
    nonce: RequestNonce,
}

impl RelayClient {
    /// Create a new relayer client.
    pub fn new(
        config: RelayClientConfig,
        signer: PrivateKeySigner,
        proxy_wallet: Address,
        auth: Option<BuilderAuth>,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        info!(
            relayer = %config.base_url,
            tx_type = config.tx_type.as_str(),
            signer = %signer.address(),
            proxy_wallet = %proxy_wallet,
            builder_auth = auth.is_some(),
            "Relay client ready"
        );

        Ok(Self {
            http,
            config,
            signer,
            proxy_wallet,
            auth,
            nonce: RequestNonce::new(),
        })
    }

    /// Serialize and sign a batch submission.
    pub fn signed_body(&self, batch: &TransactionBatch) -> Result<String, RelayError> {
        let payload = SubmitPayload {
            from: self.signer.address(),
            proxy_wallet: self.proxy_wallet,
            tx_type: self.config.tx_type.as_str(),
            nonce: self.nonce.next().to_string(),
            metadata: &batch.label,
            transactions: &batch.transactions,
        };

        let digest = payload_digest(&payload)?;
        let signature = self
            .signer
            .sign_message_sync(digest.as_slice())
            .map_err(|e| RelayError::Request(format!("signing failed: {e}")))?;

        let request = SubmitRequest {
            payload,
            signature: hex::encode_prefixed(signature.as_bytes()),
        };
        serde_json::to_string(&request).map_err(|e| RelayError::Request(e.to_string()))
    }

    fn authorize(&self, request: RequestBuilder, method: &str, path: &str, body: &str) -> RequestBuilder {
        match &self.auth {
            Some(auth) => auth
                .headers(method, path, body)
                .pairs()
                .into_iter()
                .fold(request, |req, (name, value)| req.header(name, value)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RelayError> {
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(RelayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn poll_status(&self, handle: &RelayHandle) -> Result<StatusResponse, RelayError> {
        let url = format!("{}{}", self.config.base_url, STATUS_PATH);
        let request = self
            .http
            .get(&url)
            .query(&[("id", handle.transaction_id.as_str())]);
        let path = format!("{STATUS_PATH}?id={}", handle.transaction_id);
        let request = self.authorize(request, "GET", &path, "");

        self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| RelayError::Decode(e.to_string()))
    }
}

/// Keccak digest of the canonical payload JSON.
pub fn payload_digest(payload: &SubmitPayload<'_>) -> Result<B256, RelayError> {
    let bytes = serde_json::to_vec(payload).map_err(|e| RelayError::Request(e.to_string()))?;
    Ok(keccak256(bytes))
}

#[async_trait]
impl Relay for RelayClient {
    #[instrument(skip_all, fields(batch = batch.index, size = batch.len()))]
    async fn execute(&self, batch: &TransactionBatch) -> Result<RelayHandle, RelayError> {
        let body = self.signed_body(batch)?;
        let url = format!("{}{}", self.config.base_url, SUBMIT_PATH);

        let request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.clone());
        let request = self.authorize(request, "POST", SUBMIT_PATH, &body);

        let submitted: SubmitResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| RelayError::Decode(e.to_string()))?;

        debug!(
            transaction_id = %submitted.transaction_id,
            state = submitted.state.as_deref().unwrap_or("-"),
            "Relay accepted batch"
        );

        Ok(RelayHandle {
            transaction_id: submitted.transaction_id,
        })
    }

    #[instrument(skip_all, fields(transaction_id = %handle.transaction_id))]
    async fn wait(&self, handle: &RelayHandle) -> Result<Option<RelayOutcome>, RelayError> {
        for poll in 1..=self.config.max_polls {
            match self.poll_status(handle).await {
                Ok(response) => {
                    if let Some(status) = response.into_status() {
                        match classify_state(&status.state) {
                            StateClass::Succeeded => {
                                return Ok(Some(RelayOutcome {
                                    state: status.state,
                                    transaction_hash: status.transaction_hash,
                                    proxy_address: status.proxy_address,
                                }));
                            }
                            StateClass::Failed => {
                                warn!(state = %status.state, "Relay transaction ended without result");
                                return Ok(None);
                            }
                            StateClass::Pending => debug!(poll, state = %status.state, "Relay transaction pending"),
                        }
                    }
                }
                // One lost poll does not lose the transaction.
                Err(RelayError::Transport(e)) | Err(RelayError::Decode(e)) => {
                    warn!(poll, error = %e, "Relay status poll failed");
                }
                Err(e) => return Err(e),
            }

            if poll < self.config.max_polls {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        warn!(
            max_polls = self.config.max_polls,
            "Relay transaction did not settle in time"
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, U256};

    use super::*;
    use crate::domain::merge::RelayTransaction;

    fn client() -> RelayClient {
        let config = RelayClientConfig::from(&RelayConfig::default());
        RelayClient::new(
            config,
            PrivateKeySigner::random(),
            Address::repeat_byte(0x11),
            None,
        )
        .unwrap()
    }

    fn batch() -> TransactionBatch {
        TransactionBatch {
            index: 0,
            label: "Merge BTC batch 1/1: btc-updown".into(),
            transactions: vec![RelayTransaction {
                to: Address::repeat_byte(0x22),
                data: Bytes::from_static(&[0xde, 0xad]),
                value: U256::ZERO,
            }],
            members: vec![B256::repeat_byte(1)],
        }
    }

    #[test]
    fn test_config_trims_trailing_slash() {
        let mut relay = RelayConfig::default();
        relay.url = "https://relay.example/".into();
        assert_eq!(RelayClientConfig::from(&relay).base_url, "https://relay.example");
    }

    #[test]
    fn test_signed_body_recovers_to_signer() {
        let client = client();
        let body: serde_json::Value = serde_json::from_str(&client.signed_body(&batch()).unwrap()).unwrap();

        assert_eq!(body["type"], "SAFE");
        assert_eq!(body["metadata"], "Merge BTC batch 1/1: btc-updown");
        assert_eq!(body["transactions"].as_array().unwrap().len(), 1);

        let batch = batch();
        let payload = SubmitPayload {
            from: client.signer.address(),
            proxy_wallet: client.proxy_wallet,
            tx_type: "SAFE",
            nonce: body["nonce"].as_str().unwrap().to_string(),
            metadata: &batch.label,
            transactions: &batch.transactions,
        };
        let digest = payload_digest(&payload).unwrap();

        let expected = client.signer.sign_message_sync(digest.as_slice()).unwrap();
        let raw = hex::decode(body["signature"].as_str().unwrap()).unwrap();
        assert_eq!(raw.as_slice(), expected.as_bytes().as_slice());
        let recovered = expected.recover_address_from_msg(digest.as_slice()).unwrap();
        assert_eq!(recovered, client.signer.address());
    }

    #[test]
    fn test_nonce_changes_between_submissions() {
        let client = client();
        let a: serde_json::Value = serde_json::from_str(&client.signed_body(&batch()).unwrap()).unwrap();
        let b: serde_json::Value = serde_json::from_str(&client.signed_body(&batch()).unwrap()).unwrap();
        assert_ne!(a["nonce"], b["nonce"]);
        assert_ne!(a["signature"], b["signature"]);
    }
}
