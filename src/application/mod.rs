//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Payload building, handler lookup, reconciliation
//! - Errors: Domain-specific errors
//! - Messaging: Interaction routing
//! - Handlers: Built-in interaction handlers

pub mod errors;
pub mod services;
pub mod messaging;
pub mod handlers;
