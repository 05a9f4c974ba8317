use serde::{Deserialize, Serialize};

/// Body of the guild-registration call: what the remote catalog learns about a
/// newly joined guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

/// One element of the config-fetch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildConfigEntry<T = serde_json::Value> {
    pub guild: String,
    #[serde(rename = "guildConfig")]
    pub guild_config: T,
}

/// Who the bot is, as reported by the gateway's READY payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotIdentity {
    pub user_id: String,
    pub application_id: String,
}

impl BotIdentity {
    pub fn new(user_id: impl Into<String>, application_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            application_id: application_id.into(),
        }
    }

    /// Push topic on which the remote service announces config changes for this bot.
    pub fn config_topic(&self) -> String {
        format!("configUpdated:{}", self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_entry_uses_camel_case_payload_key() {
        let entries: Vec<GuildConfigEntry> = serde_json::from_str(
            r#"[{"guild":"A","guildConfig":{"x":1}},{"guild":"B","guildConfig":null}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].guild, "A");
        assert_eq!(entries[0].guild_config["x"], 1);
        assert!(entries[1].guild_config.is_null());
    }

    #[test]
    fn config_topic_is_scoped_to_the_bot_user() {
        let id = BotIdentity::new("1234", "5678");
        assert_eq!(id.config_topic(), "configUpdated:1234");
    }
}
