use crate::application::errors::HandlerError;
use crate::domain::entities::Interaction;

/// Application code bound to a command through its handler locator.
///
/// A fresh instance is built for every interaction, so implementations
/// should not rely on state surviving between calls.
pub trait InteractionHandler: Send {
    /// Handle one invocation
    fn handle(&self, interaction: &Interaction) -> Result<(), HandlerError>;
}

impl<F> InteractionHandler for F
where
    F: Fn(&Interaction) -> Result<(), HandlerError> + Send,
{
    fn handle(&self, interaction: &Interaction) -> Result<(), HandlerError> {
        self(interaction)
    }
}
