//! Batch building - group merge candidates into relay submissions.

use super::market::{ConditionId, MergeCandidate};
use super::merge::{MergeTarget, RelayTransaction};

/// Longest prefix of a market name shown in a batch label.
pub const LABEL_NAME_CHARS: usize = 20;

/// An immutable group of merge transactions submitted in one relay call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBatch {
    /// Zero-based position of the batch within the cycle.
    pub index: usize,
    /// Human-readable relay label.
    pub label: String,
    /// Encoded merges, in candidate order.
    pub transactions: Vec<RelayTransaction>,
    /// Condition IDs of the merged markets, parallel to `transactions`.
    pub members: Vec<ConditionId>,
}

impl TransactionBatch {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Splits candidates into bounded batches and encodes them.
#[derive(Debug, Clone)]
pub struct BatchBuilder {
    target: MergeTarget,
    max_batch_size: usize,
}

impl BatchBuilder {
    /// `max_batch_size` is clamped to at least one.
    pub fn new(target: MergeTarget, max_batch_size: usize) -> Self {
        Self {
            target,
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Build `ceil(n / max_batch_size)` batches preserving candidate order.
    pub fn build(&self, asset: &str, candidates: &[MergeCandidate]) -> Vec<TransactionBatch> {
        let total = candidates.len().div_ceil(self.max_batch_size);

        candidates
            .chunks(self.max_batch_size)
            .enumerate()
            .map(|(index, chunk)| TransactionBatch {
                index,
                label: batch_label(asset, index, total, chunk),
                transactions: chunk.iter().map(|c| self.target.encode(c)).collect(),
                members: chunk.iter().map(|c| c.market.condition_id).collect(),
            })
            .collect()
    }
}

fn batch_label(asset: &str, index: usize, total: usize, chunk: &[MergeCandidate]) -> String {
    let names: Vec<String> = chunk
        .iter()
        .map(|c| c.market.display_name(LABEL_NAME_CHARS))
        .collect();
    format!(
        "Merge {} batch {}/{}: {}",
        asset.to_uppercase(),
        index + 1,
        total,
        names.join(", ")
    )
}
