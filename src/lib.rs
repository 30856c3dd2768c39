//! galactic-bot - Declarative slash command registration and interaction
//! dispatch
//!
//! Commands are declared in YAML files, reconciled against the remote
//! command registry, and inbound interactions are routed to handlers
//! registered under string locators.

pub mod domain;
pub mod application;
pub mod infrastructure;
