//! Registry generations - The remote id to definition map produced by one
//! reconciliation pass

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use crate::domain::entities::{CommandCategory, CommandDefinition, ContextCommandDefinition};
use crate::domain::traits::RemoteId;

/// Remote id paired with the definition it was registered from
#[derive(Debug, Clone)]
pub struct RegistryEntry<D> {
    pub remote_id: RemoteId,
    pub definition: Arc<D>,
}

impl<D> RegistryEntry<D> {
    pub fn new(remote_id: RemoteId, definition: Arc<D>) -> Self {
        Self { remote_id, definition }
    }
}

/// Either kind of registered definition
#[derive(Debug, Clone, Copy)]
pub enum RegisteredCommand<'a> {
    Slash(&'a CommandDefinition),
    Context(&'a ContextCommandDefinition),
}

impl RegisteredCommand<'_> {
    pub fn name(&self) -> &str {
        match self {
            RegisteredCommand::Slash(c) => &c.name,
            RegisteredCommand::Context(c) => &c.name,
        }
    }

    pub fn handler(&self) -> &str {
        match self {
            RegisteredCommand::Slash(c) => &c.handler,
            RegisteredCommand::Context(c) => &c.handler,
        }
    }
}

/// Immutable once published. Entries keep declaration order within each
/// category.
#[derive(Debug, Clone)]
pub struct RegistryGeneration {
    pub number: u64,
    pub published_at: DateTime<Utc>,
    pub moderator: Vec<RegistryEntry<CommandDefinition>>,
    pub user: Vec<RegistryEntry<CommandDefinition>>,
    pub context: Vec<RegistryEntry<ContextCommandDefinition>>,
}

impl RegistryGeneration {
    /// The generation visible before the first pass completes
    pub fn empty() -> Self {
        Self::new(0)
    }

    pub fn new(number: u64) -> Self {
        Self {
            number,
            published_at: Utc::now(),
            moderator: Vec::new(),
            user: Vec::new(),
            context: Vec::new(),
        }
    }

    /// Slash command by declared name, moderator entries first. First match
    /// wins when a name is declared more than once.
    pub fn find_slash(&self, name: &str) -> Option<&RegistryEntry<CommandDefinition>> {
        self.moderator
            .iter()
            .chain(self.user.iter())
            .find(|e| e.definition.name == name)
    }

    /// Context command by declared name
    pub fn find_context(&self, name: &str) -> Option<&RegistryEntry<ContextCommandDefinition>> {
        self.context.iter().find(|e| e.definition.name == name)
    }

    /// Definition by remote id, any category
    pub fn find_by_id(&self, id: &RemoteId) -> Option<RegisteredCommand<'_>> {
        self.moderator
            .iter()
            .chain(self.user.iter())
            .find(|e| &e.remote_id == id)
            .map(|e| RegisteredCommand::Slash(&e.definition))
            .or_else(|| {
                self.context
                    .iter()
                    .find(|e| &e.remote_id == id)
                    .map(|e| RegisteredCommand::Context(&e.definition))
            })
    }

    /// Registered names of a category, in declaration order
    pub fn names(&self, category: CommandCategory) -> Vec<&str> {
        match category {
            CommandCategory::Moderator => self.moderator.iter().map(|e| e.definition.name.as_str()).collect(),
            CommandCategory::User => self.user.iter().map(|e| e.definition.name.as_str()).collect(),
            CommandCategory::Context => self.context.iter().map(|e| e.definition.name.as_str()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.moderator.len() + self.user.len() + self.context.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holder of the current generation. Readers take a snapshot; the
/// reconciler replaces it in one swap.
#[derive(Debug)]
pub struct SharedRegistry {
    current: RwLock<Arc<RegistryGeneration>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(RegistryGeneration::empty())),
        }
    }

    /// Snapshot of the current generation
    pub fn current(&self) -> Arc<RegistryGeneration> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current generation, returning the previous one
    pub fn publish(&self, generation: RegistryGeneration) -> Arc<RegistryGeneration> {
        let next = Arc::new(generation);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }

    /// Publish only when `generation` is numbered above the current one.
    /// Returns whether the swap happened.
    pub fn publish_if_newer(&self, generation: RegistryGeneration) -> bool {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if generation.number <= guard.number {
            return false;
        }
        *guard = Arc::new(generation);
        true
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}
