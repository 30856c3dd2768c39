use async_trait::async_trait;
use std::fmt;

use crate::application::errors::RegistrationError;
use crate::domain::entities::payload::{CommandPayload, PrivilegePayload};

/// Identifier assigned by the remote registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemoteId(pub String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command as currently held by the remote registry
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCommand {
    pub id: RemoteId,
    pub name: String,
    /// Command type code (1 chat input, 2 user, 3 message)
    pub kind: u8,
}

/// Remote command registry - abstraction over the platform's command API
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    /// Create the command, or replace the one with the same name and type
    async fn upsert(&self, payload: &CommandPayload) -> Result<RemoteId, RegistrationError>;

    /// List every command currently registered
    async fn list_all(&self) -> Result<Vec<RemoteCommand>, RegistrationError>;

    /// Delete a command by id
    async fn delete(&self, id: &RemoteId) -> Result<(), RegistrationError>;

    /// Replace the guild-scoped privileges of a command
    async fn set_privileges(
        &self,
        id: &RemoteId,
        guild_id: &str,
        privileges: &[PrivilegePayload],
    ) -> Result<(), RegistrationError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
