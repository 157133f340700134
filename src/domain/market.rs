//! Market domain types.
//!
//! Defines the market descriptors read from the metadata store, the
//! per-cycle balance snapshot, and the merge candidates produced by
//! scanning. Also holds the eligibility rule that decides whether a
//! market is worth a merge transaction.
//!
//! Amounts are raw CTF units (6 decimals, same as USDC.e collateral).

use std::fmt;

use alloy::primitives::{B256, U256};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Condition identifier (bytes32) naming one binary market.
pub type ConditionId = B256;

/// ERC-1155 position (outcome token) identifier.
pub type PositionId = U256;

/// Decimals used by CTF positions and the USDC.e collateral.
pub const COLLATERAL_DECIMALS: u32 = 6;

/// Immutable description of a binary market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDescriptor {
    /// Condition ID of the market.
    pub condition_id: ConditionId,
    /// First outcome token (YES / UP).
    pub yes_token_id: PositionId,
    /// Second outcome token (NO / DOWN).
    pub no_token_id: PositionId,
    /// URL slug, when the store has one.
    pub slug: Option<String>,
    /// Market question, when the store has one.
    pub question: Option<String>,
}

impl MarketDescriptor {
    /// Short human-readable name used in logs and relay labels.
    ///
    /// Prefers the slug; otherwise a prefix of the question, otherwise
    /// a prefix of the hex condition ID. Prefixes are at most
    /// `max_chars` characters.
    pub fn display_name(&self, max_chars: usize) -> String {
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.is_empty()) {
            return slug.to_string();
        }
        if let Some(question) = self.question.as_deref().filter(|q| !q.is_empty()) {
            return truncate_chars(question, max_chars);
        }
        truncate_chars(&self.condition_id.to_string(), max_chars)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Raw JSON record as stored under the asset hash.
///
/// All fields are optional so that incomplete records can be detected
/// and dropped instead of failing the whole fetch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMarketRecord {
    #[serde(alias = "conditionId")]
    pub condition_id: Option<String>,
    #[serde(alias = "yesTokenId", alias = "upTokenId")]
    pub yes_token_id: Option<String>,
    #[serde(alias = "noTokenId", alias = "downTokenId")]
    pub no_token_id: Option<String>,
    pub slug: Option<String>,
    pub question: Option<String>,
}

/// Why a raw record could not become a [`MarketDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    Missing(&'static str),
    #[error("field `{field}` is not valid: {value}")]
    Invalid { field: &'static str, value: String },
}

impl TryFrom<RawMarketRecord> for MarketDescriptor {
    type Error = RecordError;

    fn try_from(raw: RawMarketRecord) -> Result<Self, Self::Error> {
        let condition = raw
            .condition_id
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::Missing("condition_id"))?;
        let yes = raw
            .yes_token_id
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::Missing("yes_token_id"))?;
        let no = raw
            .no_token_id
            .filter(|s| !s.is_empty())
            .ok_or(RecordError::Missing("no_token_id"))?;

        let condition_id: ConditionId =
            condition.parse().map_err(|_| RecordError::Invalid {
                field: "condition_id",
                value: condition.clone(),
            })?;

        Ok(Self {
            condition_id,
            yes_token_id: parse_position_id("yes_token_id", &yes)?,
            no_token_id: parse_position_id("no_token_id", &no)?,
            slug: raw.slug,
            question: raw.question,
        })
    }
}

fn parse_position_id(field: &'static str, value: &str) -> Result<PositionId, RecordError> {
    U256::from_str_radix(value, 10).map_err(|_| RecordError::Invalid {
        field,
        value: value.to_string(),
    })
}

/// Balances of both outcome tokens for one owner, read in the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    pub yes: U256,
    pub no: U256,
}

impl Balances {
    pub const fn new(yes: U256, no: U256) -> Self {
        Self { yes, no }
    }

    /// Number of complete sets that can be merged back into collateral.
    pub fn mergeable(&self) -> U256 {
        self.yes.min(self.no)
    }
}

/// Classification of a market after its balances are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Nothing to merge (one side is empty).
    Zero,
    /// Mergeable amount exists but is under the configured minimum.
    BelowMinimum(U256),
    /// Worth merging.
    Eligible(U256),
}

/// Decide eligibility: `amount > 0 && amount >= minimum`.
pub fn classify(balances: Balances, minimum: U256) -> Eligibility {
    let amount = balances.mergeable();
    if amount.is_zero() {
        Eligibility::Zero
    } else if amount < minimum {
        Eligibility::BelowMinimum(amount)
    } else {
        Eligibility::Eligible(amount)
    }
}

/// A market with a mergeable amount, ready for batching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    pub market: MarketDescriptor,
    pub amount: U256,
}

impl MergeCandidate {
    /// Amount in collateral units, for logging.
    pub fn amount_usdc(&self) -> Decimal {
        to_usdc(self.amount)
    }
}

impl fmt::Display for MergeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} USDC)", self.market.display_name(20), self.amount_usdc())
    }
}

/// Convert raw 6-decimal units to a decimal amount. Saturates on overflow.
pub fn to_usdc(raw: U256) -> Decimal {
    let raw: u128 = raw.saturating_to();
    i128::try_from(raw)
        .ok()
        .and_then(|v| Decimal::try_from_i128_with_scale(v, COLLATERAL_DECIMALS).ok())
        .unwrap_or(Decimal::MAX)
}
