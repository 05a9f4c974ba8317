//! Per-guild configuration mirrored from the remote service.
//!
//! The store fetches every guild's config once at startup and again whenever
//! the push channel announces a change for this bot. Fetches are tagged with a
//! monotonically increasing sequence number and an entry is only overwritten by
//! a fetch that started later than the one that wrote it, so a slow response
//! can never clobber a newer one. A burst of change notifications arriving
//! while a fetch is in flight results in at most one follow-up fetch.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use azuria_common::traits::RemoteApi;

use crate::client::AzuriaClient;
use crate::Error;

#[derive(Debug, Clone)]
struct Slot<T> {
    seq: u64,
    value: T,
}

struct Shared<T> {
    entries: DashMap<String, Slot<T>>,
    next_seq: AtomicU64,
}

impl<T> Shared<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Writes `value` unless the slot already holds a value from a newer fetch.
    fn apply(&self, guild: String, seq: u64, value: T) -> bool {
        match self.entries.entry(guild) {
            Entry::Occupied(mut slot) => {
                if slot.get().seq > seq {
                    trace!("Dropping stale config for guild {} (seq {} < {})", slot.key(), seq, slot.get().seq);
                    return false;
                }
                slot.insert(Slot { seq, value });
                true
            }
            Entry::Vacant(slot) => {
                slot.insert(Slot { seq, value });
                true
            }
        }
    }

    async fn fetch(&self, remote: &dyn RemoteApi, bot_id: &str) -> Result<usize, Error> {
        let seq = self.next_seq();
        debug!("Fetching config (seq {})...", seq);

        let entries = remote.fetch_configs(bot_id).await?;
        let decoded: Vec<(String, T)> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry.guild_config) {
                Ok(value) => Some((entry.guild, value)),
                Err(e) => {
                    warn!("Skipping undecodable config for guild {}: {}", entry.guild, e);
                    None
                }
            })
            .collect();

        let mut applied = 0;
        for (guild, value) in decoded {
            if self.apply(guild, seq, value) {
                applied += 1;
            }
        }

        info!("Config fetched ! ({} guild(s) updated)", applied);
        Ok(applied)
    }
}

/// Guild id -> config, kept in sync with the remote service.
pub struct ConfigStore<T = serde_json::Value> {
    shared: Arc<Shared<T>>,
    remote: Arc<dyn RemoteApi>,
    refresh: Arc<Notify>,
    loaded: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ConfigStore<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(remote: Arc<dyn RemoteApi>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: DashMap::new(),
                next_seq: AtomicU64::new(0),
            }),
            remote,
            refresh: Arc::new(Notify::new()),
            loaded: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// Subscribes to change notifications for this bot, performs the initial
    /// fetch, then starts the background refresh worker.
    ///
    /// Fails with [`Error::NotReady`] before the bot identity is known, and with
    /// [`Error::AlreadyLoaded`] on a second call. An initial fetch failure is
    /// returned as is.
    pub async fn load(&self, client: &AzuriaClient) -> Result<usize, Error> {
        info!("Loading config...");
        let Some(identity) = client.identity() else {
            error!("Client is not ready yet !");
            return Err(Error::NotReady);
        };

        if self.loaded.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyLoaded("config store".into()));
        }

        let bot_id = identity.user_id.clone();
        let mut notifications = match client.push().subscribe(&identity.config_topic()).await {
            Ok(rx) => rx,
            Err(e) => {
                self.loaded.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let applied = match self.refresh(&bot_id).await {
            Ok(n) => n,
            Err(e) => {
                error!("An error occured while fetching the config: {}", e);
                self.loaded.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let refresh = self.refresh.clone();
        let listener = tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                info!("New config received ! ({})", notification.topic);
                refresh.notify_one();
            }
            debug!("Config notification stream closed");
        });

        let shared = self.shared.clone();
        let remote = self.remote.clone();
        let refresh = self.refresh.clone();
        let worker = tokio::spawn(async move {
            loop {
                refresh.notified().await;
                if let Err(e) = shared.fetch(remote.as_ref(), &bot_id).await {
                    error!("An error occured while fetching the config: {}", e);
                }
            }
        });

        self.tasks.lock().extend([listener, worker]);
        Ok(applied)
    }

    /// One full fetch for `bot_id`. Returns how many entries were written.
    pub async fn refresh(&self, bot_id: &str) -> Result<usize, Error> {
        self.shared.fetch(self.remote.as_ref(), bot_id).await
    }

    pub fn get(&self, guild: &str) -> Option<T> {
        self.shared.entries.get(guild).map(|slot| slot.value.clone())
    }

    pub fn contains(&self, guild: &str) -> bool {
        self.shared.entries.contains_key(guild)
    }

    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, T> {
        self.shared
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect()
    }

    /// Local override. Counts as newer than every fetch started so far.
    pub fn insert(&self, guild: impl Into<String>, value: T) {
        let seq = self.shared.next_seq();
        self.shared.apply(guild.into(), seq, value);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Stops the refresh worker and the notification listener.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl<T> Drop for ConfigStore<T> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azuria_common::models::GuildConfigEntry;
    use azuria_common::traits::MockRemoteApi;
    use serde_json::json;

    fn entry(guild: &str, config: serde_json::Value) -> GuildConfigEntry {
        GuildConfigEntry {
            guild: guild.into(),
            guild_config: config,
        }
    }

    #[test]
    fn older_fetch_never_overwrites_newer_one() {
        let shared: Shared<serde_json::Value> = Shared {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        };
        let first = shared.next_seq();
        let second = shared.next_seq();

        assert!(shared.apply("A".into(), second, json!("new")));
        assert!(!shared.apply("A".into(), first, json!("old")));
        assert_eq!(shared.entries.get("A").unwrap().value, json!("new"));
    }

    #[tokio::test]
    async fn refresh_keeps_guilds_missing_from_the_response() {
        let mut remote = MockRemoteApi::new();
        let mut calls = 0;
        remote.expect_fetch_configs().times(2).returning(move |_| {
            calls += 1;
            Ok(if calls == 1 {
                vec![entry("A", json!({"x": 1})), entry("B", json!({"x": 2}))]
            } else {
                vec![entry("A", json!({"x": 3}))]
            })
        });

        let store: ConfigStore = ConfigStore::new(Arc::new(remote));
        assert_eq!(store.refresh("bot").await.unwrap(), 2);
        assert_eq!(store.refresh("bot").await.unwrap(), 1);

        assert_eq!(store.get("A"), Some(json!({"x": 3})));
        assert_eq!(store.get("B"), Some(json!({"x": 2})));
        assert_eq!(store.len(), 2);
    }

    #[derive(Debug, Clone, PartialEq, serde::Deserialize)]
    struct Typed {
        prefix: String,
    }

    #[tokio::test]
    async fn undecodable_entries_are_skipped_and_the_rest_applied() {
        let mut remote = MockRemoteApi::new();
        remote.expect_fetch_configs().returning(|_| {
            Ok(vec![
                entry("A", json!({"prefix": "!"})),
                entry("B", json!({"prefix": 42})),
                entry("C", json!({"prefix": "?"})),
            ])
        });

        let store: ConfigStore<Typed> = ConfigStore::new(Arc::new(remote));
        assert_eq!(store.refresh("bot").await.unwrap(), 2);
        assert_eq!(store.get("A").unwrap().prefix, "!");
        assert_eq!(store.get("C").unwrap().prefix, "?");
        assert!(!store.contains("B"));
    }

    #[tokio::test]
    async fn local_insert_overrides_fetched_value() {
        let mut remote = MockRemoteApi::new();
        remote
            .expect_fetch_configs()
            .returning(|_| Ok(vec![entry("A", json!({"prefix": "!"}))]));

        let store: ConfigStore<Typed> = ConfigStore::new(Arc::new(remote));
        store.refresh("bot").await.unwrap();
        store.insert(
            "A",
            Typed {
                prefix: "?".into(),
            },
        );
        assert_eq!(store.get("A").unwrap().prefix, "?");
    }
}
