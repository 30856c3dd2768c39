//! Application layer errors

use thiserror::Error;

use crate::domain::entities::CommandCategory;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reconciliation pass {0} was superseded by a newer one")]
    Superseded(u64),
}

/// Malformed schema, detected before any remote call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown option type '{token}' on option '{option}'")]
    UnknownOptionType { option: String, token: String },

    #[error("Unknown context command type '{0}'")]
    UnknownContextType(String),

    #[error("Unknown privilege type '{0}'")]
    UnknownPrivilegeType(String),

    #[error("Privilege id '{0}' is not a snowflake")]
    InvalidPrivilegeId(String),

    #[error("Command '{0}' mixes options, sub-commands and sub-command groups")]
    MixedOptionStyles(String),

    #[error("Invalid name '{0}'")]
    InvalidName(String),

    #[error("Option '{option}' of type '{token}' cannot have choices")]
    ChoicesNotSupported { option: String, token: String },

    #[error("Command '{name}' is already declared in the {first} category")]
    DuplicateName { name: String, first: CommandCategory },
}

/// Failure of a single remote registry call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Remote registry error: {0}")]
    Remote(String),

    #[error("Remote call timed out")]
    Timeout,

    #[error("Cancelled by a newer reconciliation pass")]
    Cancelled,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Handler locator lookup failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("No handler registered for locator '{0}'")]
    LocatorNotRegistered(String),
}

/// Errors raised by handler implementations
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Interaction routing errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Handler unavailable: {0}")]
    HandlerUnavailable(#[from] ResolutionError),

    #[error("Handler for '{command}' failed: {source}")]
    HandlerFailed {
        command: String,
        #[source]
        source: HandlerError,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
