//! In-memory command registry for console mode and tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::RegistrationError;
use crate::domain::entities::{CommandPayload, PrivilegePayload};
use crate::domain::traits::{CommandRegistry, RemoteCommand, RemoteId};

/// Upsert-by-name registry kept in process memory.
///
/// Commands are keyed by `(type, name)`, mirroring the platform: an upsert
/// of an existing name keeps its id and replaces the payload.
#[derive(Clone)]
pub struct InMemoryRegistry {
    commands: Arc<RwLock<Vec<(RemoteId, CommandPayload)>>>,
    privileges: Arc<RwLock<HashMap<(RemoteId, String), Vec<PrivilegePayload>>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(RwLock::new(Vec::new())),
            privileges: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1000)),
        }
    }

    /// Stored payload by name and type
    pub async fn get(&self, name: &str, kind: u8) -> Option<CommandPayload> {
        let commands = self.commands.read().await;
        commands
            .iter()
            .find(|(_, p)| p.name == name && p.kind == kind)
            .map(|(_, p)| p.clone())
    }

    /// Names of everything registered, sorted
    pub async fn names(&self) -> Vec<String> {
        let commands = self.commands.read().await;
        let mut names: Vec<String> = commands.iter().map(|(_, p)| p.name.clone()).collect();
        names.sort();
        names
    }

    pub async fn privileges_of(&self, id: &RemoteId, guild_id: &str) -> Vec<PrivilegePayload> {
        let privileges = self.privileges.read().await;
        privileges
            .get(&(id.clone(), guild_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.commands.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn allocate_id(&self) -> RemoteId {
        RemoteId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string())
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRegistry for InMemoryRegistry {
    async fn upsert(&self, payload: &CommandPayload) -> Result<RemoteId, RegistrationError> {
        let mut commands = self.commands.write().await;
        if let Some((id, existing)) = commands
            .iter_mut()
            .find(|(_, p)| p.name == payload.name && p.kind == payload.kind)
        {
            *existing = payload.clone();
            return Ok(id.clone());
        }

        let id = self.allocate_id();
        commands.push((id.clone(), payload.clone()));
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<RemoteCommand>, RegistrationError> {
        let commands = self.commands.read().await;
        Ok(commands
            .iter()
            .map(|(id, p)| RemoteCommand {
                id: id.clone(),
                name: p.name.clone(),
                kind: p.kind,
            })
            .collect())
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RegistrationError> {
        let mut commands = self.commands.write().await;
        let before = commands.len();
        commands.retain(|(existing, _)| existing != id);
        if commands.len() == before {
            return Err(RegistrationError::Remote(format!("Unknown command id {}", id)));
        }
        drop(commands);

        self.privileges.write().await.retain(|(existing, _), _| existing != id);
        Ok(())
    }

    async fn set_privileges(
        &self,
        id: &RemoteId,
        guild_id: &str,
        privileges: &[PrivilegePayload],
    ) -> Result<(), RegistrationError> {
        if !self.commands.read().await.iter().any(|(existing, _)| existing == id) {
            return Err(RegistrationError::Remote(format!("Unknown command id {}", id)));
        }
        self.privileges
            .write()
            .await
            .insert((id.clone(), guild_id.to_string()), privileges.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
