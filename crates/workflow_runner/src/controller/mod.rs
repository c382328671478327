//! Controller Module - runs plans against a repository
//!
//! - **setup**: the `init` and `labels` flows (preflight, inspect, plan, execute)
//! - **executor**: applies one plan, operation by operation
//! - **result**: what a run produced

pub mod executor;
pub mod result;
pub mod setup;

pub use executor::{execute, execute_operation, ExecutionContext, DEFAULT_VERIFY_DELAY};
pub use result::{
    ExecutionResult, LabelTally, OperationOutcome, OperationRecord, OperationStatus, RunStatus,
};
pub use setup::{
    InitOptions, InitOutcome, LabelListing, LabelsAction, LabelsOutcome, SetupController,
};
