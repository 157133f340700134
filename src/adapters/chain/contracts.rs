//! CTF Contract Reads - Conditional Token Balances
//!
//! Implements the `BalanceReader` port with a raw `eth_call` of
//! `balanceOf(address,uint256)` on the conditional tokens contract.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::domain::market::PositionId;
use crate::domain::merge::{encode_balance_of, IConditionalTokens};
use crate::ports::balances::BalanceReader;

use super::provider::PolygonProvider;

/// ERC-1155 balance reader for CTF outcome tokens.
pub struct CtfBalances {
    provider: Arc<PolygonProvider>,
    ctf: Address,
}

impl CtfBalances {
    /// Bind to the CTF contract, refusing addresses without code.
    #[instrument(skip(provider))]
    pub async fn new(provider: Arc<PolygonProvider>, ctf: Address) -> Result<Self> {
        let code = provider
            .inner()
            .get_code_at(ctf)
            .await
            .context("Failed to query CTF contract code")?;

        if code.is_empty() {
            bail!("Contract at {ctf} has no deployed code, check CTF_ADDRESS");
        }

        info!(address = %ctf, "Validated CTF contract on-chain");
        Ok(Self { provider, ctf })
    }
}

#[async_trait]
impl BalanceReader for CtfBalances {
    async fn balance_of(&self, owner: Address, position_id: PositionId) -> Result<U256> {
        let request = TransactionRequest::default()
            .to(self.ctf)
            .input(encode_balance_of(owner, position_id).into());

        let output = self
            .provider
            .inner()
            .call(&request)
            .await
            .with_context(|| format!("balanceOf({owner}, {position_id}) call failed"))?;

        let decoded = IConditionalTokens::balanceOfCall::abi_decode_returns(&output, true)
            .context("Malformed balanceOf return data")?;
        Ok(decoded.balance)
    }
}
