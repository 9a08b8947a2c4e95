//! Application services
//!
//! The composition engine and the event router in front of it. Both are
//! concrete structs; contributors and host capabilities come in as traits.

mod engine;
mod router;

pub use engine::{
    BuildReport, ContributorFailure, EngineState, ReconcileReport, RefreshReport,
    TreeCompositionEngine,
};
pub use router::{TreeEvent, TreeEventOutcome, TreeEventRouter};
