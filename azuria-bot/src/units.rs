//! Factories for the commands and events shipped under `bot/`.

use std::fmt::Write as _;

use async_trait::async_trait;
use tracing::info;

use azuria_core::models::{CommandInteraction, GatewayEvent};
use azuria_core::{
    AzuriaClient, Command, CommandFactories, CommandHandler, Error, Event, EventFactories, Manifest,
};

pub fn commands() -> CommandFactories {
    CommandFactories::new()
        .register("ping", |m: &Manifest, _: &AzuriaClient| Command::from_manifest(m, Ping))
        .register("help", |m: &Manifest, _: &AzuriaClient| Command::from_manifest(m, Help))
}

pub fn events() -> EventFactories {
    EventFactories::new().register("ready", |m: &Manifest, _: &AzuriaClient| {
        Ok(Event::from_fn(m.event_name()?, |client: AzuriaClient, event: GatewayEvent| async move {
            if let GatewayEvent::Ready { identity, .. } = event {
                info!("Ready! Logged in as {}", identity.user_id);
            }
            if let Some(identity) = client.identity() {
                info!("Serving application {}", identity.application_id);
            }
            Ok::<(), Error>(())
        }))
    })
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn execute(&self, client: &AzuriaClient, interaction: &CommandInteraction) -> Result<(), Error> {
        client.gateway().reply(interaction, "Pong!").await
    }
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn execute(&self, client: &AzuriaClient, interaction: &CommandInteraction) -> Result<(), Error> {
        let mut text = String::new();
        for (category, names) in client.commands().categories().await {
            let _ = writeln!(text, "**{}**: {}", category, names.join(", "));
        }
        client.gateway().reply(interaction, &text).await
    }
}
