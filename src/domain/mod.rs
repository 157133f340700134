//! Domain layer - Core merge logic and models.
//!
//! Pure logic for the merge worker: eligibility, quota accounting,
//! batching, calldata encoding and throttle classification.
//! No I/O here (hexagonal architecture inner ring).

pub mod batch;
pub mod market;
pub mod merge;
pub mod quota;
pub mod summary;
pub mod throttle;

// Re-export core types for convenience
pub use batch::{BatchBuilder, TransactionBatch};
pub use market::{
    Balances, ConditionId, Eligibility, MarketDescriptor, MergeCandidate, PositionId,
};
pub use merge::{MergeTarget, RelayTransaction};
pub use quota::QuotaTracker;
pub use summary::CycleSummary;
pub use throttle::ThrottleSignal;
