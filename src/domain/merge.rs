//! CTF merge transaction encoding.
//!
//! `mergePositions` burns equal amounts of both outcome tokens and
//! returns the same amount of collateral. Polymarket binary markets use
//! a zero parent collection and the full partition `[1, 2]`.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use serde::Serialize;

use super::market::MergeCandidate;

sol! {
    /// Subset of the Gnosis ConditionalTokens interface used by the worker.
    interface IConditionalTokens {
        function balanceOf(address owner, uint256 id) external view returns (uint256 balance);

        function mergePositions(
            address collateralToken,
            bytes32 parentCollectionId,
            bytes32 conditionId,
            uint256[] partition,
            uint256 amount
        ) external;
    }
}

/// Index sets of the two outcomes of a binary market.
pub const BINARY_PARTITION: [u64; 2] = [1, 2];

/// Parent collection of top-level positions.
pub const PARENT_COLLECTION_ID: B256 = B256::ZERO;

/// One call the relay executes on behalf of the proxy wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelayTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Fixed addresses every merge transaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeTarget {
    /// ConditionalTokens contract.
    pub ctf: Address,
    /// Collateral the positions were split from (USDC.e).
    pub collateral: Address,
}

impl MergeTarget {
    /// Encode the merge of one candidate's full mergeable amount.
    pub fn encode(&self, candidate: &MergeCandidate) -> RelayTransaction {
        let call = IConditionalTokens::mergePositionsCall {
            collateralToken: self.collateral,
            parentCollectionId: PARENT_COLLECTION_ID,
            conditionId: candidate.market.condition_id,
            partition: BINARY_PARTITION.iter().map(|i| U256::from(*i)).collect(),
            amount: candidate.amount,
        };

        RelayTransaction {
            to: self.ctf,
            data: Bytes::from(call.abi_encode()),
            value: U256::ZERO,
        }
    }
}

/// Calldata for `balanceOf(owner, id)`.
pub fn encode_balance_of(owner: Address, position_id: U256) -> Bytes {
    Bytes::from(IConditionalTokens::balanceOfCall { owner, id: position_id }.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::MarketDescriptor;

    #[test]
    fn test_merge_calldata_round_trips_fields() {
        let target = MergeTarget {
            ctf: Address::repeat_byte(0x11),
            collateral: Address::repeat_byte(0x22),
        };
        let candidate = MergeCandidate {
            market: MarketDescriptor {
                condition_id: B256::repeat_byte(0x33),
                yes_token_id: U256::from(1u64),
                no_token_id: U256::from(2u64),
                slug: None,
                question: None,
            },
            amount: U256::from(42_000_000u64),
        };

        let tx = target.encode(&candidate);
        assert_eq!(tx.to, target.ctf);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(
            &tx.data[..4],
            IConditionalTokens::mergePositionsCall::SELECTOR.as_slice()
        );

        let decoded = IConditionalTokens::mergePositionsCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(decoded.collateralToken, target.collateral);
        assert_eq!(decoded.parentCollectionId, B256::ZERO);
        assert_eq!(decoded.conditionId, B256::repeat_byte(0x33));
        assert_eq!(decoded.partition, vec![U256::from(1u64), U256::from(2u64)]);
        assert_eq!(decoded.amount, U256::from(42_000_000u64));
    }
}
