//! Domain entities - Command schema, wire payloads and inbound events

pub mod command;
pub mod interaction;
pub mod payload;

pub use command::{
    Choice, ChoiceValue, CommandCategory, CommandDefinition, CommandSchema, ContextCommandDefinition,
    OptionDefinition, Privilege, SubCommand, SubCommandGroup,
};
pub use interaction::{ContextTarget, Interaction, InteractionKind};
pub use payload::{ChoicePayload, CommandPayload, OptionPayload, OptionType, PrivilegePayload};
