//! Balance Reader Port - On-chain Position Balances
//!
//! Reads ERC-1155 balances of CTF outcome tokens. Values are always
//! fresh; nothing is cached between cycles.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::domain::market::PositionId;

/// Trait for position balance queries.
#[async_trait]
pub trait BalanceReader: Send + Sync + 'static {
  /// `balanceOf(owner, position_id)` on the conditional tokens contract.
  async fn balance_of(&self, owner: Address, position_id: PositionId) -> anyhow::Result<U256>;
}
