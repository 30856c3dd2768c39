use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition a command is declared in. Names are unique within a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandCategory {
    Moderator,
    User,
    Context,
}

impl CommandCategory {
    pub fn as_str(&self) -> &str {
        match self {
            CommandCategory::Moderator => "moderator",
            CommandCategory::User => "user",
            CommandCategory::Context => "context",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slash command as declared in a command file.
///
/// Type tokens and ids are kept as raw strings; nothing here is validated.
/// The payload builder rejects malformed definitions so a bad file can be
/// loaded and reported instead of aborting the loader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled_by_default: bool,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
    #[serde(default)]
    pub sub_commands: Vec<SubCommand>,
    #[serde(default)]
    pub sub_command_groups: Vec<SubCommandGroup>,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
    #[serde(default)]
    pub handler: String,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            enabled_by_default: true,
            ..Default::default()
        }
    }

    pub fn with_handler(mut self, locator: impl Into<String>) -> Self {
        self.handler = locator.into();
        self
    }

    pub fn with_option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_sub_command(mut self, sub: SubCommand) -> Self {
        self.sub_commands.push(sub);
        self
    }

    pub fn with_group(mut self, group: SubCommandGroup) -> Self {
        self.sub_command_groups.push(group);
        self
    }

    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privileges.push(privilege);
        self
    }

    pub fn enabled_by_default(mut self, enabled: bool) -> Self {
        self.enabled_by_default = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }
}

/// A context-menu command (right click on a user or a message).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextCommandDefinition {
    pub name: String,
    /// `user` or `message`
    #[serde(rename = "type")]
    pub target: String,
    #[serde(default)]
    pub handler: String,
}

impl ContextCommandDefinition {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            handler: String::new(),
        }
    }

    pub fn with_handler(mut self, locator: impl Into<String>) -> Self {
        self.handler = locator.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Type token, e.g. `string`, `integer`, `user`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl OptionDefinition {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            kind: kind.into(),
            choices: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: ChoiceValue,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Underlying value of a choice. Integers are tried before floats so that
/// `5` in a command file stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        ChoiceValue::String(value.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        ChoiceValue::String(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        ChoiceValue::Integer(value)
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        ChoiceValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

impl SubCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: OptionDefinition) -> Self {
        self.options.push(option);
        self
    }
}

/// One level of nesting only: groups hold sub-commands, never other groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubCommandGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sub_commands: Vec<SubCommand>,
}

impl SubCommandGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            sub_commands: Vec::new(),
        }
    }

    pub fn with_sub_command(mut self, sub: SubCommand) -> Self {
        self.sub_commands.push(sub);
        self
    }
}

/// Guild-scoped allow/deny rule for a role or a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Privilege {
    /// `role` or `user`
    #[serde(rename = "type")]
    pub target: String,
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Privilege {
    pub fn role(id: impl Into<String>, enabled: bool) -> Self {
        Self {
            target: "role".to_string(),
            id: id.into(),
            enabled,
        }
    }

    pub fn user(id: impl Into<String>, enabled: bool) -> Self {
        Self {
            target: "user".to_string(),
            id: id.into(),
            enabled,
        }
    }
}

fn default_true() -> bool {
    true
}

/// All declared commands of one configuration load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSchema {
    pub moderator: Vec<CommandDefinition>,
    pub user: Vec<CommandDefinition>,
    pub context: Vec<ContextCommandDefinition>,
}

impl CommandSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_moderator(mut self, command: CommandDefinition) -> Self {
        self.moderator.push(command);
        self
    }

    pub fn with_user(mut self, command: CommandDefinition) -> Self {
        self.user.push(command);
        self
    }

    pub fn with_context(mut self, command: ContextCommandDefinition) -> Self {
        self.context.push(command);
        self
    }

    /// Slash commands of a category. Empty for [`CommandCategory::Context`].
    pub fn slash(&self, category: CommandCategory) -> &[CommandDefinition] {
        match category {
            CommandCategory::Moderator => &self.moderator,
            CommandCategory::User => &self.user,
            CommandCategory::Context => &[],
        }
    }

    /// Every handler locator referenced by the schema, in declaration order.
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.moderator
            .iter()
            .chain(self.user.iter())
            .map(|c| c.handler.as_str())
            .chain(self.context.iter().map(|c| c.handler.as_str()))
    }

    pub fn len(&self) -> usize {
        self.moderator.len() + self.user.len() + self.context.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
