//! State Module - the two snapshots a run reconciles
//!
//! - **ObservedState**: what exists in the repository right now
//! - **DesiredState**: what the latest catalogue version says should exist

mod desired;
mod observed;

pub use desired::{compute_desired, DesiredState, SetupMode, Toggles};
pub use observed::{ObservedState, FALLBACK_BRANCH};
