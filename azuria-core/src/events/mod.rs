// File: azuria-core/src/events/mod.rs

pub mod defaults;
pub mod registry;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use azuria_common::models::GatewayEvent;

use crate::client::AzuriaClient;
use crate::loader::Manifest;
use crate::Error;

pub use registry::EventRegistry;

/// Reaction to one gateway event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error>;
}

/// Adapts an async closure into an [`EventHandler`].
pub struct FnEvent<F>(pub F);

#[async_trait]
impl<F, Fut> EventHandler for FnEvent<F>
where
    F: Fn(AzuriaClient, GatewayEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn handle(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error> {
        (self.0)(client.clone(), event.clone()).await
    }
}

/// A listener bound to one gateway event name.
#[derive(Clone)]
pub struct Event {
    name: String,
    handler: Arc<dyn EventHandler>,
}

impl Event {
    pub fn new<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(AzuriaClient, GatewayEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self::new(name, FnEvent(f))
    }

    /// Event name from `manifest`, behaviour from `handler`.
    pub fn from_manifest<H>(manifest: &Manifest, handler: H) -> Result<Self, Error>
    where
        H: EventHandler + 'static,
    {
        Ok(Self::new(manifest.event_name()?, handler))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn execute(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<(), Error> {
        self.handler.handle(client, event).await
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("name", &self.name).finish()
    }
}
