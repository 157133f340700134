//! Dry-run relay: logs each batch and reports it as mined without
//! sending anything.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::Address;
use async_trait::async_trait;
use tracing::info;

use crate::domain::batch::TransactionBatch;
use crate::ports::relay::{Relay, RelayError, RelayHandle, RelayOutcome};

pub struct DryRunRelay {
    proxy_wallet: Address,
    submitted: AtomicU64,
}

impl DryRunRelay {
    pub const fn new(proxy_wallet: Address) -> Self {
        Self {
            proxy_wallet,
            submitted: AtomicU64::new(0),
        }
    }

    /// Batches seen so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Relay for DryRunRelay {
    async fn execute(&self, batch: &TransactionBatch) -> Result<RelayHandle, RelayError> {
        let n = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        for (tx, condition_id) in batch.transactions.iter().zip(&batch.members) {
            info!(
                to = %tx.to,
                condition_id = %condition_id,
                calldata_len = tx.data.len(),
                "DRY RUN: would merge"
            );
        }
        info!(label = %batch.label, size = batch.len(), "DRY RUN: batch not relayed");

        Ok(RelayHandle {
            transaction_id: format!("dry-run-{n}"),
        })
    }

    async fn wait(&self, _handle: &RelayHandle) -> Result<Option<RelayOutcome>, RelayError> {
        Ok(Some(RelayOutcome {
            state: "STATE_MINED".to_string(),
            transaction_hash: None,
            proxy_address: Some(self.proxy_wallet),
        }))
    }
}
