use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;

use azuria_common::models::{
    BotIdentity, CommandData, CommandInteraction, GatewayEvent, GuildConfigEntry, GuildRecord,
    PushNotification,
};
use azuria_common::traits::{GatewayApi, PushChannel, RemoteApi};

use crate::Error;

/// Gateway double: logs in with a fixed identity, records every outbound
/// call, and replays whatever events the test emits.
pub struct RecordingGateway {
    login: Result<BotIdentity, String>,
    fail_commands: AtomicBool,
    logins: AtomicUsize,
    disconnects: AtomicUsize,
    commands: Mutex<Vec<(String, CommandData)>>,
    deferrals: Mutex<Vec<(String, bool)>>,
    replies: Mutex<Vec<(String, String)>>,
    tx: Mutex<Option<UnboundedSender<GatewayEvent>>>,
    rx: AsyncMutex<UnboundedReceiver<GatewayEvent>>,
}

impl RecordingGateway {
    pub fn new(identity: BotIdentity) -> Self {
        Self::with_login(Ok(identity))
    }

    /// A gateway whose login always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_login(Err(reason.into()))
    }

    fn with_login(login: Result<BotIdentity, String>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            login,
            fail_commands: AtomicBool::new(false),
            logins: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            deferrals: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            tx: Mutex::new(Some(tx)),
            rx: AsyncMutex::new(rx),
        }
    }

    /// Makes every later `create_command` call fail.
    pub fn fail_commands(&self) {
        self.fail_commands.store(true, Ordering::SeqCst);
    }

    /// Queues an inbound event. Returns false once the stream has ended.
    pub fn emit(&self, event: GatewayEvent) -> bool {
        self.tx
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Ends the event stream after the queued events.
    pub fn end(&self) {
        self.tx.lock().take();
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// `(application_id, data)` for every registration attempt, in call order.
    pub fn created_commands(&self) -> Vec<(String, CommandData)> {
        self.commands.lock().clone()
    }

    /// `(interaction_id, ephemeral)` for every deferral.
    pub fn deferrals(&self) -> Vec<(String, bool)> {
        self.deferrals.lock().clone()
    }

    /// `(interaction_id, content)` for every reply.
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().clone()
    }
}

#[async_trait]
impl GatewayApi for RecordingGateway {
    async fn login(&self, _token: &str) -> Result<BotIdentity, Error> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.login.clone().map_err(Error::Platform)
    }

    async fn next_event(&self) -> Option<GatewayEvent> {
        self.rx.lock().await.recv().await
    }

    async fn create_command(&self, application_id: &str, data: &CommandData) -> Result<(), Error> {
        self.commands
            .lock()
            .push((application_id.to_string(), data.clone()));
        if self.fail_commands.load(Ordering::SeqCst) {
            return Err(Error::Platform(format!("rejected /{}", data.name)));
        }
        Ok(())
    }

    async fn defer_reply(&self, interaction: &CommandInteraction, ephemeral: bool) -> Result<(), Error> {
        self.deferrals.lock().push((interaction.id.clone(), ephemeral));
        Ok(())
    }

    async fn reply(&self, interaction: &CommandInteraction, content: &str) -> Result<(), Error> {
        self.replies
            .lock()
            .push((interaction.id.clone(), content.to_string()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), Error> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.end();
        Ok(())
    }
}

/// Remote service double backed by in-memory state.
#[derive(Default)]
pub struct InMemoryRemoteApi {
    configs: Mutex<Vec<GuildConfigEntry>>,
    registered: Mutex<Vec<(String, GuildRecord)>>,
    fetches: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_register: AtomicBool,
    fetch_delay: Mutex<Duration>,
}

impl InMemoryRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: Vec<GuildConfigEntry>) -> Self {
        let api = Self::default();
        api.set_configs(configs);
        api
    }

    /// Replaces what the next fetch returns.
    pub fn set_configs(&self, configs: Vec<GuildConfigEntry>) {
        *self.configs.lock() = configs;
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Every fetch sleeps for `delay` before answering.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = delay;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// `(bot_id, guild)` for every registration attempt.
    pub fn registered(&self) -> Vec<(String, GuildRecord)> {
        self.registered.lock().clone()
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemoteApi {
    async fn register_guild(&self, bot_id: &str, guild: &GuildRecord) -> Result<(), Error> {
        self.registered
            .lock()
            .push((bot_id.to_string(), guild.clone()));
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(Error::Platform("guild registration refused".into()));
        }
        Ok(())
    }

    async fn fetch_configs(&self, _bot_id: &str) -> Result<Vec<GuildConfigEntry>, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Error::Platform("config service unavailable".into()));
        }
        Ok(self.configs.lock().clone())
    }
}

/// Push double: tests call [`notify`](Self::notify) to simulate the server.
#[derive(Default)]
pub struct ManualPushChannel {
    subscribers: Mutex<HashMap<String, Vec<UnboundedSender<PushNotification>>>>,
    subscriptions: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl ManualPushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topics subscribed so far, in order, duplicates included.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    /// Sends one notification on `topic`. Returns how many receivers got it.
    pub fn notify(&self, topic: &str, payload: serde_json::Value) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(senders) = subscribers.get_mut(topic) else {
            return 0;
        };
        senders.retain(|tx| {
            tx.send(PushNotification {
                topic: topic.to_string(),
                payload: payload.clone(),
            })
            .is_ok()
        });
        senders.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for ManualPushChannel {
    async fn subscribe(&self, topic: &str) -> Result<UnboundedReceiver<PushNotification>, Error> {
        let (tx, rx) = unbounded_channel();
        self.subscriptions.lock().push(topic.to_string());
        self.subscribers
            .lock()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        self.subscribers.lock().clear();
        Ok(())
    }
}
