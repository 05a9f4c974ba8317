// File: azuria-common/src/models/mod.rs
pub mod command;
pub mod discord;
pub mod event;

pub use command::{CommandData, CommandInteraction};
pub use discord::{BotIdentity, GuildConfigEntry, GuildRecord};
pub use event::{GatewayEvent, PushNotification};
