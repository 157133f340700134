//! Relayer API Request/Response Types
//!
//! Serialization types for the relayer REST API. Addresses and
//! calldata use alloy's serde representations (0x-prefixed hex).

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::domain::merge::RelayTransaction;

/// Relay states that carry a usable on-chain result.
pub const SUCCESS_STATES: [&str; 2] = ["STATE_MINED", "STATE_CONFIRMED"];

/// Relay states that will never produce a result.
pub const FAILURE_STATES: [&str; 2] = ["STATE_FAILED", "STATE_INVALID"];

/// The part of a submission covered by the signer's signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload<'a> {
    /// Signer address.
    pub from: Address,
    /// Wallet the calls are executed from.
    pub proxy_wallet: Address,
    /// `SAFE` or `PROXY`.
    #[serde(rename = "type")]
    pub tx_type: &'static str,
    /// Replay protection.
    pub nonce: String,
    /// Human-readable batch label.
    pub metadata: &'a str,
    pub transactions: &'a [RelayTransaction],
}

/// Full `POST /submit` body.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    #[serde(flatten)]
    pub payload: SubmitPayload<'a>,
    /// EIP-191 signature over the keccak digest of the payload JSON.
    pub signature: String,
}

/// Response from `POST /submit`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(alias = "transactionID", alias = "transactionId", alias = "id")]
    pub transaction_id: String,
    pub state: Option<String>,
}

/// One transaction as reported by `GET /transaction`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionStatus {
    pub state: String,
    #[serde(default, alias = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(default, alias = "proxyAddress")]
    pub proxy_address: Option<Address>,
}

/// `GET /transaction` answers with either one record or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusResponse {
    One(TransactionStatus),
    Many(Vec<TransactionStatus>),
}

impl StatusResponse {
    /// The record describing the transaction, if any.
    pub fn into_status(self) -> Option<TransactionStatus> {
        match self {
            Self::One(status) => Some(status),
            Self::Many(list) => list.into_iter().next(),
        }
    }
}

/// Where a polled transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Succeeded,
    Failed,
    Pending,
}

/// Classify a relay state string.
pub fn classify_state(state: &str) -> StateClass {
    if SUCCESS_STATES.contains(&state) {
        StateClass::Succeeded
    } else if FAILURE_STATES.contains(&state) {
        StateClass::Failed
    } else {
        StateClass::Pending
    }
}
