//! Discord adapter - Application command registry over the REST API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::application::errors::{ConfigError, RegistrationError};
use crate::domain::entities::{CommandPayload, PrivilegePayload};
use crate::domain::traits::{CommandRegistry, RemoteCommand, RemoteId};
use crate::infrastructure::config::Config;

/// Discord API base URL
const API_BASE: &str = "https://discord.com/api/v10";

/// Application command as returned by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationCommand {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default = "chat_input")]
    pub kind: u8,
}

fn chat_input() -> u8 {
    1
}

#[derive(Debug, Serialize)]
struct PermissionsBody<'a> {
    permissions: &'a [PrivilegePayload],
}

/// Registry backed by Discord's application command endpoints.
///
/// Commands go to one guild when a guild id is given, otherwise they are
/// registered globally. The permissions endpoint does not accept bot tokens;
/// privileges are only sent when an OAuth2 bearer token is configured.
pub struct DiscordRegistry {
    token: String,
    permissions_token: Option<String>,
    application_id: String,
    guild_id: Option<String>,
    api_base: String,
    client: Client,
}

impl DiscordRegistry {
    pub fn new(
        token: impl Into<String>,
        application_id: impl Into<String>,
        guild_id: Option<String>,
    ) -> Self {
        Self {
            token: token.into(),
            permissions_token: None,
            application_id: application_id.into(),
            guild_id,
            api_base: API_BASE.to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let token = config
            .discord
            .token
            .clone()
            .ok_or_else(|| ConfigError::MissingField("discord.token".to_string()))?;
        let application_id = config
            .discord
            .application_id
            .clone()
            .ok_or_else(|| ConfigError::MissingField("discord.application-id".to_string()))?;

        let mut registry = Self::new(token, application_id, config.guild_id().map(str::to_string));
        if let Some(base) = &config.discord.api_base {
            registry = registry.with_api_base(base.clone());
        }
        if let Some(bearer) = &config.discord.permissions_token {
            registry = registry.with_permissions_token(bearer.clone());
        }
        Ok(registry)
    }

    /// Bearer token with the `applications.commands.permissions.update` scope
    pub fn with_permissions_token(mut self, token: impl Into<String>) -> Self {
        self.permissions_token = Some(token.into());
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Collection URL for this application's commands
    fn commands_url(&self) -> String {
        match &self.guild_id {
            Some(guild) => format!(
                "{}/applications/{}/guilds/{}/commands",
                self.api_base, self.application_id, guild
            ),
            None => format!("{}/applications/{}/commands", self.api_base, self.application_id),
        }
    }

    fn permissions_url(&self, guild_id: &str, id: &RemoteId) -> String {
        format!(
            "{}/applications/{}/guilds/{}/commands/{}/permissions",
            self.api_base, self.application_id, guild_id, id
        )
    }

    fn bot_authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn permissions_authorization(&self) -> Option<String> {
        self.permissions_token
            .as_ref()
            .map(|token| format!("Bearer {}", token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RegistrationError> {
        self.send_as(request, self.bot_authorization()).await
    }

    async fn send_as(&self, request: RequestBuilder, authorization: String) -> Result<Response, RegistrationError> {
        let response = request
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| RegistrationError::Remote(format!("Network error: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RegistrationError::Remote(format!("HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl CommandRegistry for DiscordRegistry {
    async fn upsert(&self, payload: &CommandPayload) -> Result<RemoteId, RegistrationError> {
        let response = self
            .send(self.client.post(self.commands_url()).json(payload))
            .await?;
        let command: ApplicationCommand = response
            .json()
            .await
            .map_err(|e| RegistrationError::Remote(format!("Parse error: {}", e)))?;

        tracing::debug!("Upserted '{}' as {}", command.name, command.id);
        Ok(RemoteId(command.id))
    }

    async fn list_all(&self) -> Result<Vec<RemoteCommand>, RegistrationError> {
        let response = self.send(self.client.get(self.commands_url())).await?;
        let commands: Vec<ApplicationCommand> = response
            .json()
            .await
            .map_err(|e| RegistrationError::Remote(format!("Parse error: {}", e)))?;

        Ok(commands
            .into_iter()
            .map(|c| RemoteCommand {
                id: RemoteId(c.id),
                name: c.name,
                kind: c.kind,
            })
            .collect())
    }

    async fn delete(&self, id: &RemoteId) -> Result<(), RegistrationError> {
        let url = format!("{}/{}", self.commands_url(), id);
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn set_privileges(
        &self,
        id: &RemoteId,
        guild_id: &str,
        privileges: &[PrivilegePayload],
    ) -> Result<(), RegistrationError> {
        let Some(authorization) = self.permissions_authorization() else {
            tracing::warn!(
                "Skipping privileges of command {}: no discord.permissions-token configured",
                id
            );
            return Ok(());
        };

        let body = PermissionsBody { permissions: privileges };
        self.send_as(
            self.client.put(self.permissions_url(guild_id, id)).json(&body),
            authorization,
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "discord"
    }
}
