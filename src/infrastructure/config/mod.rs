//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::services::{DuplicatePolicy, ReconcileOptions};
use crate::domain::entities::{CommandDefinition, CommandSchema, ContextCommandDefinition};

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub registration: RegistrationConfig,
    pub commands: CommandFilesConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegistrationConfig {
    /// Register commands on one guild instead of globally
    pub for_guild: bool,
    pub guild_id: Option<String>,
    /// Delete every remote command before registering
    pub delete_on_reload: bool,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandFilesConfig {
    pub directory: PathBuf,
    pub moderator: String,
    pub user: String,
    pub context: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    pub application_id: Option<String>,
    pub token: Option<String>,
    /// OAuth2 bearer token for the command permissions endpoint
    pub permissions_token: Option<String>,
    pub api_base: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "galactic-bot".to_string(),
            },
            registration: RegistrationConfig {
                for_guild: true,
                guild_id: None,
                delete_on_reload: false,
                duplicate_policy: DuplicatePolicy::Allow,
                timeout_seconds: 30,
            },
            commands: CommandFilesConfig {
                directory: PathBuf::from("./commands"),
                moderator: "Mod.yml".to_string(),
                user: "User.yml".to_string(),
                context: "Context.yml".to_string(),
            },
            discord: DiscordConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;

        // Command files live next to the config file, not the working directory
        if config.commands.directory.is_relative() {
            if let Some(parent) = path.parent() {
                config.commands.directory = parent.join(&config.commands.directory);
            }
        }
        Ok(config)
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Environment variables override values from the file
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            self.discord.token = Some(token);
        }

        if let Ok(bearer) = std::env::var("DISCORD_PERMISSIONS_TOKEN") {
            self.discord.permissions_token = Some(bearer);
        }

        if let Ok(app) = std::env::var("DISCORD_APPLICATION_ID") {
            self.discord.application_id = Some(app);
        }

        if let Ok(guild) = std::env::var("GUILD_ID") {
            self.registration.guild_id = Some(guild);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registration.for_guild && self.registration.guild_id.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue("registration.guild-id is empty".to_string()));
        }
        if self.registration.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "registration.timeout-seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Guild commands are registered on, if any
    pub fn guild_id(&self) -> Option<&str> {
        if self.registration.for_guild {
            self.registration.guild_id.as_deref()
        } else {
            None
        }
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            delete_on_reload: self.registration.delete_on_reload,
            duplicate_policy: self.registration.duplicate_policy,
            timeout: Duration::from_secs(self.registration.timeout_seconds),
            // Privileges are guild scoped even for global commands
            guild_id: self.registration.guild_id.clone(),
        }
    }

    /// Load the three command files. A missing file is an empty category.
    pub fn load_schema(&self) -> Result<CommandSchema, ConfigError> {
        let dir = &self.commands.directory;
        Ok(CommandSchema {
            moderator: read_command_file::<CommandDefinition>(&dir.join(&self.commands.moderator))?,
            user: read_command_file::<CommandDefinition>(&dir.join(&self.commands.user))?,
            context: read_command_file::<ContextCommandDefinition>(&dir.join(&self.commands.context))?,
        })
    }
}

fn read_command_file<T>(path: &Path) -> Result<Vec<T>, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        tracing::warn!("Command file {} not found, treating as empty", path.display());
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_yaml::from_str::<Option<Vec<T>>>(&content)
        .map(Option::unwrap_or_default)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))
}
