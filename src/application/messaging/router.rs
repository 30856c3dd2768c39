//! Interaction router - Routes inbound interactions to their handlers

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::application::errors::DispatchError;
use crate::application::services::{HandlerRegistry, SharedRegistry};
use crate::domain::entities::{Interaction, InteractionKind};

/// Result of an isolated dispatch
#[derive(Debug)]
pub enum DispatchOutcome {
    Handled,
    Failed(DispatchError),
    /// The handler panicked; the payload message if it was a string
    Panicked(String),
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled)
    }
}

/// Looks up the definition of an interaction in the current generation and
/// runs its handler on the calling thread.
pub struct InteractionRouter {
    shared: Arc<SharedRegistry>,
    handlers: Arc<HandlerRegistry>,
}

impl InteractionRouter {
    pub fn new(shared: Arc<SharedRegistry>, handlers: Arc<HandlerRegistry>) -> Self {
        Self { shared, handlers }
    }

    /// Route one interaction. Handler errors are returned to the caller.
    pub fn route(&self, interaction: &Interaction) -> Result<(), DispatchError> {
        // Snapshot: a reload publishing mid-dispatch does not affect this call
        let generation = self.shared.current();

        let locator = match interaction.kind {
            InteractionKind::Slash => generation
                .find_slash(&interaction.name)
                .map(|e| e.definition.handler.as_str()),
            InteractionKind::Context(_) => generation
                .find_context(&interaction.name)
                .map(|e| e.definition.handler.as_str()),
        }
        .ok_or_else(|| DispatchError::UnknownCommand(interaction.name.clone()))?;

        let handler = self.handlers.resolve(locator)?;
        debug!(
            "[{}] Dispatching {} '{}' to {}",
            interaction.id,
            interaction.kind.as_str(),
            interaction.name,
            locator
        );

        handler
            .handle(interaction)
            .map_err(|source| DispatchError::HandlerFailed {
                command: interaction.name.clone(),
                source,
            })
    }

    /// Route one interaction behind an isolation boundary: errors and panics
    /// are logged and returned as an outcome, never propagated.
    pub fn dispatch(&self, interaction: &Interaction) -> DispatchOutcome {
        match catch_unwind(AssertUnwindSafe(|| self.route(interaction))) {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(e)) => {
                warn!("[{}] {} '{}': {}", interaction.id, interaction.kind.as_str(), interaction.name, e);
                DispatchOutcome::Failed(e)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    "[{}] Handler for '{}' panicked: {}",
                    interaction.id, interaction.name, message
                );
                DispatchOutcome::Panicked(message)
            }
        }
    }
}
