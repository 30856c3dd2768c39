//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration and command file loading
//! - Adapters: Registry backends (Discord, in-memory) and the console

pub mod config;
pub mod adapters;
