use serde::{Deserialize, Serialize};
use twilight_model::application::command::CommandOption;

/// Declarative metadata submitted to the application's command catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandData {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

impl CommandData {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<CommandOption>) -> Self {
        self.options = options;
        self
    }
}

/// A slash-command invocation as delivered by the gateway, stripped down to what
/// command handlers need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandInteraction {
    pub id: String,
    pub token: String,
    pub application_id: String,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    pub user_id: Option<String>,
    pub command_name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl CommandInteraction {
    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some()
    }
}
