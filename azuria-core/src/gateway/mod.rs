//! The real-time gateway seam. The framework only talks to
//! [`GatewayApi`]; [`discord::DiscordGateway`] is the production implementation.

pub mod discord;

pub use azuria_common::models::event::{
    GatewayEvent, PushNotification, GUILD_CREATE, INTERACTION_CREATE, MESSAGE_CREATE, READY,
};
pub use azuria_common::traits::GatewayApi;
pub use discord::DiscordGateway;
