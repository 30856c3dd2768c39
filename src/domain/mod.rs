//! Domain layer - Core business objects with no I/O
//! 
//! This layer contains:
//! - Entities: Command schema and inbound interactions
//! - Traits: Abstractions for the remote registry and for handlers

pub mod entities;
pub mod traits;
