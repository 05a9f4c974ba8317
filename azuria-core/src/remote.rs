//! Bot-management HTTP service client.
//!
//! Two endpoints, both scoped to the bot's user id and authenticated with the
//! bot's API key:
//!
//! - `POST {api}/api/v1/bots/{bot}/guilds/add` with a [`GuildRecord`] body
//! - `GET  {api}/api/v1/bots/{bot}/configs` returning `[{guild, guildConfig}]`

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use azuria_common::models::{GuildConfigEntry, GuildRecord};
use azuria_common::traits::RemoteApi;

use crate::settings::Settings;
use crate::Error;

#[derive(Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base: String,
    api_key: String,
}

impl HttpRemoteApi {
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        Url::parse(&settings.api_url)?;
        let client = Client::builder().timeout(settings.http_timeout).build()?;
        Ok(Self {
            client,
            base: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn endpoint(&self, bot_id: &str, path: &str) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}/api/v1/bots/{}/{}", self.base, bot_id, path))?)
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn register_guild(&self, bot_id: &str, guild: &GuildRecord) -> Result<(), Error> {
        let url = self.endpoint(bot_id, "guilds/add")?;
        debug!("POST {}", url);
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(guild)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_configs(&self, bot_id: &str) -> Result<Vec<GuildConfigEntry>, Error> {
        let url = self.endpoint(bot_id, "configs")?;
        debug!("GET {}", url);
        let entries = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<GuildConfigEntry>>()
            .await?;
        Ok(entries)
    }
}
