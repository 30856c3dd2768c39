//! Domain traits - Abstractions for infrastructure implementations

pub mod handler;
pub mod registry;

pub use handler::InteractionHandler;
pub use registry::{CommandRegistry, RemoteCommand, RemoteId};
