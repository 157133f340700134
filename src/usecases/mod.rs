//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the worker's control loop.
//!
//! Use cases:
//! - `CandidateScanner`: balance reads + eligibility per market
//! - `ExecutionEngine`: per-batch submit / backoff / retry state machine
//! - `MergeWorker`: the scan-batch-execute-sleep cycle
//! - `ShutdownSignal`: cooperative cancellation shared by all of the above

pub mod executor;
pub mod orchestrator;
pub mod scanner;
pub mod shutdown;
