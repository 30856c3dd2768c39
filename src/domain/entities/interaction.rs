use chrono::{DateTime, Utc};

/// Target of a context-menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextTarget {
    User,
    Message,
}

impl ContextTarget {
    pub fn as_str(&self) -> &str {
        match self {
            ContextTarget::User => "user",
            ContextTarget::Message => "message",
        }
    }

    /// Parse a target token, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "user" => Some(ContextTarget::User),
            "message" => Some(ContextTarget::Message),
            _ => None,
        }
    }
}

/// Discriminates slash invocations from context-menu invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Slash,
    Context(ContextTarget),
}

impl InteractionKind {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::Slash => "slash",
            InteractionKind::Context(ContextTarget::User) => "user-context",
            InteractionKind::Context(ContextTarget::Message) => "message-context",
        }
    }

    pub fn is_context(&self) -> bool {
        matches!(self, InteractionKind::Context(_))
    }
}

/// An inbound command invocation delivered by the transport.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub id: String,
    pub name: String,
    pub kind: InteractionKind,
    pub guild_id: Option<String>,
    pub user_id: Option<String>,
    /// Forwarded to the handler untouched
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(name: impl Into<String>, kind: InteractionKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            guild_id: None,
            user_id: None,
            payload: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    pub fn slash(name: impl Into<String>) -> Self {
        Self::new(name, InteractionKind::Slash)
    }

    pub fn context(name: impl Into<String>, target: ContextTarget) -> Self {
        Self::new(name, InteractionKind::Context(target))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
