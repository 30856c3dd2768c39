//! Wire shapes accepted by the remote command registry

use serde::{Deserialize, Serialize};

use super::command::ChoiceValue;

pub const COMMAND_CHAT_INPUT: u8 = 1;
pub const COMMAND_USER: u8 = 2;
pub const COMMAND_MESSAGE: u8 = 3;

pub const PRIVILEGE_ROLE: u8 = 1;
pub const PRIVILEGE_USER: u8 = 2;

/// Registry option type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Number = 10,
    Attachment = 11,
}

impl OptionType {
    /// Parse a declared type token, ignoring case. Only value types are
    /// accepted; the two structural codes are produced by the builder.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "string" => Some(OptionType::String),
            "integer" => Some(OptionType::Integer),
            "boolean" => Some(OptionType::Boolean),
            "user" => Some(OptionType::User),
            "channel" => Some(OptionType::Channel),
            "role" => Some(OptionType::Role),
            "mentionable" => Some(OptionType::Mentionable),
            "number" => Some(OptionType::Number),
            "attachment" => Some(OptionType::Attachment),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn accepts_choices(self) -> bool {
        matches!(self, OptionType::String | OptionType::Integer | OptionType::Number)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Top level command payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_permission: Option<bool>,
}

/// Option, sub-command or sub-command group, told apart by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ChoicePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoicePayload {
    pub name: String,
    pub value: ChoiceValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegePayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub permission: bool,
}
