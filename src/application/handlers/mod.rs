//! Built-in handlers bound under the `builtin.*` locators

use tracing::info;

use crate::application::errors::HandlerError;
use crate::application::services::HandlerRegistry;
use crate::domain::entities::Interaction;
use crate::domain::traits::InteractionHandler;

pub const PING: &str = "builtin.ping";
pub const ECHO: &str = "builtin.echo";

#[derive(Debug, Default)]
pub struct PingHandler;

impl InteractionHandler for PingHandler {
    fn handle(&self, interaction: &Interaction) -> Result<(), HandlerError> {
        let latency = chrono::Utc::now() - interaction.received_at;
        info!("[{}] pong ({} ms)", interaction.id, latency.num_milliseconds());
        Ok(())
    }
}

/// Logs the invocation and its payload
#[derive(Debug, Default)]
pub struct EchoHandler;

impl InteractionHandler for EchoHandler {
    fn handle(&self, interaction: &Interaction) -> Result<(), HandlerError> {
        info!(
            "[{}] {} '{}' by {} in {}: {}",
            interaction.id,
            interaction.kind.as_str(),
            interaction.name,
            interaction.user_id.as_deref().unwrap_or("unknown"),
            interaction.guild_id.as_deref().unwrap_or("dm"),
            interaction.payload
        );
        Ok(())
    }
}

/// Register every built-in handler
pub fn register_builtins(registry: &mut HandlerRegistry) {
    registry.register_handler::<PingHandler>(PING);
    registry.register_handler::<EchoHandler>(ECHO);
}
