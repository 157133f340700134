//! Candidate Scanner Use Case - Find Mergeable Markets
//!
//! Reads both outcome balances of every market, one market at a time,
//! and keeps those whose mergeable amount clears the minimum. A failed
//! read drops only that market; the scan always completes.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::domain::market::{self, Balances, Eligibility, MarketDescriptor, MergeCandidate};
use crate::ports::balances::BalanceReader;

/// Result of scanning one asset's markets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
  /// Eligible candidates, in descriptor order.
  pub candidates: Vec<MergeCandidate>,
  /// Markets where one side had no balance.
  pub skipped_zero: usize,
  /// Markets whose mergeable amount was under the minimum.
  pub skipped_below_min: usize,
  /// Markets dropped because a balance read failed.
  pub failed: usize,
}

/// Scans markets for mergeable positions.
pub struct CandidateScanner<B: BalanceReader> {
  balances: Arc<B>,
  owner: Address,
  minimum: U256,
}

impl<B: BalanceReader> CandidateScanner<B> {
  /// Create a scanner for one owner (the proxy wallet).
  pub fn new(balances: Arc<B>, owner: Address, minimum: U256) -> Self {
    Self {
      balances,
      owner,
      minimum,
    }
  }

  /// Classify every descriptor, sequentially.
  #[instrument(skip_all, fields(markets = markets.len()))]
  pub async fn scan(&self, markets: &[MarketDescriptor]) -> ScanReport {
    let mut report = ScanReport::default();

    for descriptor in markets {
      let balances = match self.read_balances(descriptor).await {
        Ok(b) => b,
        Err(e) => {
          warn!(
            condition_id = %descriptor.condition_id,
            error = %e,
            "Balance read failed, skipping market this cycle"
          );
          report.failed += 1;
          continue;
        }
      };

      match market::classify(balances, self.minimum) {
        Eligibility::Zero => report.skipped_zero += 1,
        Eligibility::BelowMinimum(amount) => {
          debug!(
            condition_id = %descriptor.condition_id,
            amount = %amount,
            minimum = %self.minimum,
            "Mergeable amount below minimum"
          );
          report.skipped_below_min += 1;
        }
        Eligibility::Eligible(amount) => {
          let candidate = MergeCandidate {
            market: descriptor.clone(),
            amount,
          };
          debug!(candidate = %candidate, "Market eligible for merge");
          report.candidates.push(candidate);
        }
      }
    }

    report
  }

  /// Read both sides of one market concurrently.
  async fn read_balances(&self, descriptor: &MarketDescriptor) -> Result<Balances> {
    let (yes, no) = tokio::try_join!(
      self.balances.balance_of(self.owner, descriptor.yes_token_id),
      self.balances.balance_of(self.owner, descriptor.no_token_id),
    )
    .with_context(|| format!("balances for {}", descriptor.condition_id))?;

    Ok(Balances::new(yes, no))
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use alloy::primitives::B256;
  use async_trait::async_trait;

  use super::*;

  /// Balance table keyed by position ID; missing IDs fail the read.
  struct TableReader(HashMap<U256, u64>);

  #[async_trait]
  impl BalanceReader for TableReader {
    async fn balance_of(&self, _owner: Address, position_id: U256) -> Result<U256> {
      self
        .0
        .get(&position_id)
        .map(|v| U256::from(*v))
        .ok_or_else(|| anyhow::anyhow!("rpc timeout"))
    }
  }

  fn market(i: u8) -> MarketDescriptor {
    MarketDescriptor {
      condition_id: B256::repeat_byte(i),
      yes_token_id: U256::from(u64::from(i) * 10),
      no_token_id: U256::from(u64::from(i) * 10 + 1),
      slug: None,
      question: None,
    }
  }

  #[tokio::test]
  async fn test_scan_classifies_and_preserves_order() {
    let table = HashMap::from([
      (U256::from(10u64), 5),
      (U256::from(11u64), 3),
      (U256::from(20u64), 0),
      (U256::from(21u64), 7),
      (U256::from(30u64), 20),
      (U256::from(31u64), 15),
      (U256::from(50u64), 40),
      (U256::from(51u64), 99),
      // market 4 missing: read fails
    ]);
    let scanner = CandidateScanner::new(
      Arc::new(TableReader(table)),
      Address::repeat_byte(9),
      U256::from(10u64),
    );

    let markets: Vec<_> = [1, 2, 3, 4, 5].into_iter().map(market).collect();
    let report = scanner.scan(&markets).await;

    assert_eq!(report.skipped_below_min, 1);
    assert_eq!(report.skipped_zero, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.candidates.len(), 2);
    assert_eq!(report.candidates[0].market, market(3));
    assert_eq!(report.candidates[0].amount, U256::from(15u64));
    assert_eq!(report.candidates[1].market, market(5));
    assert_eq!(report.candidates[1].amount, U256::from(40u64));
  }

  #[tokio::test]
  async fn test_empty_scan() {
    let scanner = CandidateScanner::new(
      Arc::new(TableReader(HashMap::new())),
      Address::ZERO,
      U256::from(1u64),
    );
    assert_eq!(scanner.scan(&[]).await, ScanReport::default());
  }
}
