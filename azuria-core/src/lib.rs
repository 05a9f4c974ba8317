// src/lib.rs

pub mod settings;
pub mod logging;
pub mod loader;
pub mod commands;
pub mod events;
pub mod config_store;
pub mod push;
pub mod gateway;
pub mod remote;
pub mod client;
pub mod test_utils;

pub use azuria_common::error::Error;
pub use azuria_common::models;
pub use client::{AzuriaClient, ClientBuilder, CommandFactories, EventFactories};
pub use commands::{Command, CommandHandler};
pub use config_store::ConfigStore;
pub use events::{Event, EventHandler};
pub use loader::{FactoryTable, Manifest};
pub use settings::Settings;
