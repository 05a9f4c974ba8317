use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use azuria_common::models::GatewayEvent;

use crate::client::AzuriaClient;
use crate::events::{defaults, Event};
use crate::loader::{display_name, list_sorted, FactoryTable, Loader};
use crate::Error;

/// Ordered listeners per gateway event name.
///
/// Attaching a second listener to a name does not replace the first: both run,
/// in attachment order, each awaited before the next. The built-in listeners
/// are attached before any listener loaded from disk.
pub struct EventRegistry {
    dir: PathBuf,
    loader: Loader<Event, AzuriaClient>,
    with_defaults: bool,
    listeners: Arc<RwLock<HashMap<String, Vec<Arc<Event>>>>>,
}

impl EventRegistry {
    pub fn new(dir: impl Into<PathBuf>, factories: FactoryTable<Event, AzuriaClient>) -> Self {
        Self {
            dir: dir.into(),
            loader: Loader::new(factories),
            with_defaults: true,
            listeners: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Skips the built-in listeners on the next [`load`](Self::load).
    pub fn without_defaults(mut self) -> Self {
        self.with_defaults = false;
        self
    }

    /// Attaches the built-in listeners, then every event file in the events
    /// directory. Returns how many listeners were attached in total.
    pub async fn load(&self, client: &AzuriaClient) -> Result<usize, Error> {
        let mut attached = 0;

        if self.with_defaults {
            info!("Loading default events...");
            for event in defaults::default_events() {
                self.attach(event).await;
                attached += 1;
            }
        }

        let files = list_sorted(&self.dir, false).await?;
        info!("Found {} events, loading...", files.len());
        for file in &files {
            let event = self
                .loader
                .load(file, client)
                .await?
                .ok_or_else(|| Error::InvalidEventFile(display_name(file)))?;
            self.attach(event).await;
            attached += 1;
        }

        Ok(attached)
    }

    /// Appends `event` to the listener list for its name.
    pub async fn attach(&self, event: Event) {
        let name = event.name().to_string();
        let mut listeners = self.listeners.write().await;
        let list = listeners.entry(name.clone()).or_default();
        if !list.is_empty() {
            debug!("Chaining after {} existing listener(s) on {}", list.len(), name);
        }
        list.push(Arc::new(event));
        info!("Events on listener {} has been added.", name);
    }

    /// Runs every listener for `event` in order. The first error stops the
    /// chain and is returned. Returns how many listeners ran.
    pub async fn dispatch(&self, client: &AzuriaClient, event: &GatewayEvent) -> Result<usize, Error> {
        let chain = self.listeners_for(event.name()).await;
        for listener in &chain {
            listener.execute(client, event).await?;
        }
        Ok(chain.len())
    }

    pub async fn listeners_for(&self, name: &str) -> Vec<Arc<Event>> {
        self.listeners
            .read()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn listener_count(&self, name: &str) -> usize {
        self.listeners.read().await.get(name).map_or(0, Vec::len)
    }

    pub async fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.listeners.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
