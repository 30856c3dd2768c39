//! Application services - Business logic orchestration

pub mod generation;
pub mod handler_registry;
pub mod payload_builder;
pub mod reconciler;

pub use generation::{RegisteredCommand, RegistryEntry, RegistryGeneration, SharedRegistry};
pub use handler_registry::{HandlerFactory, HandlerRegistry};
pub use payload_builder::PayloadBuilder;
pub use reconciler::{
    DuplicatePolicy, ReconcileFailure, ReconcileOptions, ReconcileReport, ReconcileState, Reconciler, Stage,
};
