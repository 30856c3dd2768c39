//! Platform adapters

pub mod console;
pub mod discord;
pub mod memory;

pub use console::{ConsoleAdapter, ConsoleCommand};
pub use discord::DiscordRegistry;
pub use memory::InMemoryRegistry;
