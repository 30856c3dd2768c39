//! Handler registry - Maps handler locators to handler factories

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::errors::ResolutionError;
use crate::domain::entities::CommandSchema;
use crate::domain::traits::InteractionHandler;

/// Builds a fresh handler instance
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn InteractionHandler> + Send + Sync>;

/// Locator to factory table, filled once at start-up.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a locator. A later registration replaces an
    /// earlier one.
    pub fn register<F, H>(&mut self, locator: impl Into<String>, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: InteractionHandler + 'static,
    {
        let locator = locator.into();
        if self.factories.contains_key(&locator) {
            info!("Replacing handler for locator: {}", locator);
        } else {
            debug!("Registering handler: {}", locator);
        }
        self.factories
            .insert(locator, Arc::new(move || Box::new(factory()) as Box<dyn InteractionHandler>));
    }

    /// Register a handler type that can be default-constructed
    pub fn register_handler<H>(&mut self, locator: impl Into<String>)
    where
        H: InteractionHandler + Default + 'static,
    {
        self.register(locator, H::default);
    }

    pub fn with<F, H>(mut self, locator: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: InteractionHandler + 'static,
    {
        self.register(locator, factory);
        self
    }

    /// Build a new handler instance for a locator
    pub fn resolve(&self, locator: &str) -> Result<Box<dyn InteractionHandler>, ResolutionError> {
        self.factories
            .get(locator)
            .map(|factory| factory())
            .ok_or_else(|| ResolutionError::LocatorNotRegistered(locator.to_string()))
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.factories.contains_key(locator)
    }

    /// Registered locators, sorted
    pub fn locators(&self) -> Vec<String> {
        let mut locators: Vec<String> = self.factories.keys().cloned().collect();
        locators.sort();
        locators
    }

    /// Locators the schema references that have no registered factory.
    /// Reported only; dispatch is where a missing handler actually fails.
    pub fn unresolved(&self, schema: &CommandSchema) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for locator in schema.locators() {
            if !self.contains(locator) && !missing.iter().any(|m| m == locator) {
                missing.push(locator.to_string());
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
