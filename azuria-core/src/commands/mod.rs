// File: azuria-core/src/commands/mod.rs

pub mod registry;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use azuria_common::models::{CommandData, CommandInteraction};

use crate::client::AzuriaClient;
use crate::loader::Manifest;
use crate::Error;

pub use registry::CommandRegistry;

/// Behaviour run when a user invokes a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, client: &AzuriaClient, interaction: &CommandInteraction) -> Result<(), Error>;
}

/// Adapts an async closure into a [`CommandHandler`].
pub struct FnCommand<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for FnCommand<F>
where
    F: Fn(AzuriaClient, CommandInteraction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn execute(&self, client: &AzuriaClient, interaction: &CommandInteraction) -> Result<(), Error> {
        (self.0)(client.clone(), interaction.clone()).await
    }
}

/// A user-invokable action: metadata plus behaviour. Immutable once built.
#[derive(Clone)]
pub struct Command {
    pub data: CommandData,
    /// Reply visible only to the invoker.
    pub ephemeral: bool,
    /// Opens a form instead of replying, so the dispatcher must not defer it.
    pub modal: bool,
    pub(crate) category: String,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn builder(data: CommandData) -> CommandBuilder {
        CommandBuilder {
            data,
            ephemeral: false,
            modal: false,
        }
    }

    /// Metadata and flags from `manifest`, behaviour from `handler`.
    pub fn from_manifest<H>(manifest: &Manifest, handler: H) -> Result<Self, Error>
    where
        H: CommandHandler + 'static,
    {
        Ok(Command::builder(manifest.command_data()?)
            .ephemeral(manifest.ephemeral)
            .modal(manifest.modal)
            .handler(handler))
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub async fn execute(&self, client: &AzuriaClient, interaction: &CommandInteraction) -> Result<(), Error> {
        self.handler.execute(client, interaction).await
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.data.name)
            .field("category", &self.category)
            .field("ephemeral", &self.ephemeral)
            .field("modal", &self.modal)
            .finish()
    }
}

pub struct CommandBuilder {
    data: CommandData,
    ephemeral: bool,
    modal: bool,
}

impl CommandBuilder {
    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    pub fn handler<H>(self, handler: H) -> Command
    where
        H: CommandHandler + 'static,
    {
        Command {
            data: self.data,
            ephemeral: self.ephemeral,
            modal: self.modal,
            category: String::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn handler_fn<F, Fut>(self, f: F) -> Command
    where
        F: Fn(AzuriaClient, CommandInteraction) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.handler(FnCommand(f))
    }
}
