use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::client::AzuriaClient;
use crate::commands::Command;
use crate::loader::{display_name, list_sorted, FactoryTable, Loader};
use crate::Error;

/// Name-keyed catalog of the bot's commands.
///
/// Commands live on disk as `<root>/<category>/<command>.json`. Loading walks
/// categories and files in lexicographic order; on a name clash the command
/// loaded last wins. Each loaded command is also submitted to the gateway's
/// command catalog, in the background, as soon as the bot identity is known.
pub struct CommandRegistry {
    root: PathBuf,
    loader: Loader<Command, AzuriaClient>,
    commands: Arc<RwLock<HashMap<String, Arc<Command>>>>,
    registrations: Mutex<JoinSet<()>>,
}

impl CommandRegistry {
    pub fn new(root: impl Into<PathBuf>, factories: FactoryTable<Command, AzuriaClient>) -> Self {
        Self {
            root: root.into(),
            loader: Loader::new(factories),
            commands: Arc::new(RwLock::new(HashMap::new())),
            registrations: Mutex::new(JoinSet::new()),
        }
    }

    /// Loads every category under the root directory. Returns how many command
    /// files were loaded.
    pub async fn load(&self, client: &AzuriaClient) -> Result<usize, Error> {
        let categories = list_sorted(&self.root, true).await?;
        info!("Found {} categories, registering...", categories.len());

        let mut loaded = 0;
        for category in categories {
            loaded += self.load_category(client, &category).await?;
        }

        info!("Loaded {} commands.", loaded);
        Ok(loaded)
    }

    async fn load_category(&self, client: &AzuriaClient, dir: &Path) -> Result<usize, Error> {
        let category = display_name(dir);
        let files = list_sorted(dir, false).await?;
        info!("Found {} commands in {}, loading...", files.len(), category);

        for file in &files {
            let mut command = self
                .loader
                .load(file, client)
                .await?
                .ok_or_else(|| Error::InvalidCommandFile(display_name(file)))?;
            command.category = category.clone();

            let command = self.insert(command).await;
            self.register(client, &command);
        }

        Ok(files.len())
    }

    /// Adds `command` to the catalog, replacing any entry with the same name.
    /// Does not submit it to the gateway.
    pub async fn insert(&self, command: Command) -> Arc<Command> {
        let command = Arc::new(command);
        let previous = self
            .commands
            .write()
            .await
            .insert(command.data.name.clone(), command.clone());

        if let Some(previous) = previous {
            warn!(
                "Command '{}' from category '{}' replaces the one from '{}'",
                command.name(),
                command.category(),
                previous.category()
            );
        }
        command
    }

    /// Starts the catalog registration call for `command`. Failures are logged,
    /// never raised.
    fn register(&self, client: &AzuriaClient, command: &Command) {
        let Some(identity) = client.identity() else {
            debug!(
                "Application not resolved yet; '{}' will not be registered",
                command.name()
            );
            return;
        };

        let gateway = client.gateway();
        let application_id = identity.application_id.clone();
        let data = command.data.clone();

        self.registrations.lock().spawn(async move {
            match gateway.create_command(&application_id, &data).await {
                Ok(()) => info!("Registered {}", data.name),
                Err(e) => error!("Failed to register command {}: {}", data.name, e),
            }
        });
    }

    /// Waits for every registration started so far. Returns how many finished.
    pub async fn wait_registrations(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.registrations.lock());
        let mut finished = 0;
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                error!("Command registration task failed: {}", e);
            }
            finished += 1;
        }
        finished
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.commands.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Command names grouped by category, both levels sorted.
    pub async fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for command in self.commands.read().await.values() {
            grouped
                .entry(command.category.clone())
                .or_default()
                .push(command.data.name.clone());
        }
        for names in grouped.values_mut() {
            names.sort();
        }
        grouped
    }

    pub async fn len(&self) -> usize {
        self.commands.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.commands.read().await.is_empty()
    }
}
