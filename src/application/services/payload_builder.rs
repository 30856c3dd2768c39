//! Payload builder - Turns schema definitions into registry payloads

use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::ValidationError;
use crate::domain::entities::payload::{
    COMMAND_CHAT_INPUT, COMMAND_MESSAGE, COMMAND_USER, PRIVILEGE_ROLE, PRIVILEGE_USER,
};
use crate::domain::entities::{
    ChoicePayload, CommandDefinition, CommandPayload, ContextCommandDefinition, ContextTarget,
    OptionDefinition, OptionPayload, OptionType, PrivilegePayload, SubCommand, SubCommandGroup,
};

static SLASH_NAME: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(r"^[-_a-z0-9]{1,32}$") {
    Ok(re) => Some(re),
    Err(e) => {
        tracing::error!("Command name pattern failed to compile, every name will be rejected: {}", e);
        None
    }
});

/// Builds registry payloads. Pure: no I/O and no shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadBuilder;

impl PayloadBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the payload of a slash command
    pub fn build(&self, command: &CommandDefinition) -> Result<CommandPayload, ValidationError> {
        check_name(&command.name)?;

        let styles = [
            !command.options.is_empty(),
            !command.sub_commands.is_empty(),
            !command.sub_command_groups.is_empty(),
        ];
        if styles.iter().filter(|set| **set).count() > 1 {
            return Err(ValidationError::MixedOptionStyles(command.name.clone()));
        }

        let options = if !command.sub_command_groups.is_empty() {
            command
                .sub_command_groups
                .iter()
                .map(|g| self.build_group(g))
                .collect::<Result<Vec<_>, _>>()?
        } else if !command.sub_commands.is_empty() {
            command
                .sub_commands
                .iter()
                .map(|s| self.build_sub_command(s))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            self.build_options(&command.options)?
        };

        Ok(CommandPayload {
            name: command.name.clone(),
            kind: COMMAND_CHAT_INPUT,
            description: command.description.clone(),
            options,
            // Only sent when it differs from the platform default
            default_permission: (!command.enabled_by_default).then_some(false),
        })
    }

    /// Build the payload of a context-menu command
    pub fn build_context(
        &self,
        command: &ContextCommandDefinition,
    ) -> Result<CommandPayload, ValidationError> {
        let kind = match ContextTarget::parse(&command.target) {
            Some(ContextTarget::User) => COMMAND_USER,
            Some(ContextTarget::Message) => COMMAND_MESSAGE,
            None => return Err(ValidationError::UnknownContextType(command.target.clone())),
        };
        // Context names are free text shown in the menu
        if command.name.trim().is_empty() || command.name.chars().count() > 32 {
            return Err(ValidationError::InvalidName(command.name.clone()));
        }

        Ok(CommandPayload {
            name: command.name.clone(),
            kind,
            description: String::new(),
            options: Vec::new(),
            default_permission: None,
        })
    }

    /// Build the guild privileges of a slash command
    pub fn build_privileges(
        &self,
        command: &CommandDefinition,
    ) -> Result<Vec<PrivilegePayload>, ValidationError> {
        command
            .privileges
            .iter()
            .map(|p| {
                let kind = match p.target.to_ascii_lowercase().as_str() {
                    "role" => PRIVILEGE_ROLE,
                    "user" => PRIVILEGE_USER,
                    _ => return Err(ValidationError::UnknownPrivilegeType(p.target.clone())),
                };
                if p.id.parse::<u64>().is_err() {
                    return Err(ValidationError::InvalidPrivilegeId(p.id.clone()));
                }
                Ok(PrivilegePayload {
                    id: p.id.clone(),
                    kind,
                    permission: p.enabled,
                })
            })
            .collect()
    }

    fn build_group(&self, group: &SubCommandGroup) -> Result<OptionPayload, ValidationError> {
        check_name(&group.name)?;
        let options = group
            .sub_commands
            .iter()
            .map(|s| self.build_sub_command(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OptionPayload {
            kind: OptionType::SubCommandGroup.code(),
            name: group.name.clone(),
            description: group.description.clone(),
            required: false,
            choices: Vec::new(),
            options,
        })
    }

    fn build_sub_command(&self, sub: &SubCommand) -> Result<OptionPayload, ValidationError> {
        check_name(&sub.name)?;
        Ok(OptionPayload {
            kind: OptionType::SubCommand.code(),
            name: sub.name.clone(),
            description: sub.description.clone(),
            required: false,
            choices: Vec::new(),
            options: self.build_options(&sub.options)?,
        })
    }

    fn build_options(&self, options: &[OptionDefinition]) -> Result<Vec<OptionPayload>, ValidationError> {
        options.iter().map(|o| self.build_option(o)).collect()
    }

    fn build_option(&self, option: &OptionDefinition) -> Result<OptionPayload, ValidationError> {
        check_name(&option.name)?;
        let kind = OptionType::from_token(&option.kind).ok_or_else(|| {
            ValidationError::UnknownOptionType {
                option: option.name.clone(),
                token: option.kind.clone(),
            }
        })?;
        if !option.choices.is_empty() && !kind.accepts_choices() {
            return Err(ValidationError::ChoicesNotSupported {
                option: option.name.clone(),
                token: option.kind.clone(),
            });
        }

        Ok(OptionPayload {
            kind: kind.code(),
            name: option.name.clone(),
            description: option.description.clone(),
            required: option.required,
            choices: option
                .choices
                .iter()
                .map(|c| ChoicePayload {
                    name: c.name.clone(),
                    value: c.value.clone(),
                })
                .collect(),
            options: Vec::new(),
        })
    }
}

fn check_name(name: &str) -> Result<(), ValidationError> {
    if SLASH_NAME.as_ref().is_some_and(|re| re.is_match(name)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidName(name.to_string()))
    }
}
