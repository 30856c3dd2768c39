//! Interaction handling - Event-driven command dispatch

pub mod router;

pub use router::{DispatchOutcome, InteractionRouter};
