//! The client facade: one handle over the gateway, the remote service, the
//! push channel and the three registries.
//!
//! Handlers receive `&AzuriaClient` when they run; none of the registries keeps
//! a copy of the client, so dropping the last handle tears everything down.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use azuria_common::models::{BotIdentity, GatewayEvent};
use azuria_common::traits::{GatewayApi, PushChannel, RemoteApi};

use crate::commands::{Command, CommandRegistry};
use crate::config_store::ConfigStore;
use crate::events::{Event, EventRegistry};
use crate::gateway::DiscordGateway;
use crate::loader::FactoryTable;
use crate::push::SocketIoPushChannel;
use crate::remote::HttpRemoteApi;
use crate::settings::Settings;
use crate::Error;

pub type CommandFactories = FactoryTable<Command, AzuriaClient>;
pub type EventFactories = FactoryTable<Event, AzuriaClient>;

struct ClientInner {
    settings: Settings,
    gateway: Arc<dyn GatewayApi>,
    remote: Arc<dyn RemoteApi>,
    push: Arc<dyn PushChannel>,
    identity: OnceCell<BotIdentity>,
    commands: CommandRegistry,
    events: EventRegistry,
    config: ConfigStore,
    shutdown_tx: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct AzuriaClient {
    inner: Arc<ClientInner>,
}

impl AzuriaClient {
    pub fn builder(settings: Settings) -> ClientBuilder {
        ClientBuilder {
            settings,
            gateway: None,
            remote: None,
            push: None,
            commands: FactoryTable::new(),
            events: FactoryTable::new(),
            default_events: true,
        }
    }

    /// Production wiring: Discord gateway, HTTP remote API, Socket.IO push.
    pub fn discord(
        settings: Settings,
        commands: CommandFactories,
        events: EventFactories,
    ) -> Result<Self, Error> {
        let gateway = Arc::new(DiscordGateway::new(&settings));
        let remote = Arc::new(HttpRemoteApi::new(&settings)?);
        let push = Arc::new(SocketIoPushChannel::new(
            &settings.push_url,
            settings.push_reconnect_delay,
        )?);

        Self::builder(settings)
            .gateway(gateway)
            .remote(remote)
            .push(push)
            .commands(commands)
            .events(events)
            .build()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// The bot identity, once login has resolved it.
    pub fn identity(&self) -> Option<&BotIdentity> {
        self.inner.identity.get()
    }

    pub fn gateway(&self) -> Arc<dyn GatewayApi> {
        self.inner.gateway.clone()
    }

    pub fn remote(&self) -> Arc<dyn RemoteApi> {
        self.inner.remote.clone()
    }

    pub fn push(&self) -> Arc<dyn PushChannel> {
        self.inner.push.clone()
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.inner.commands
    }

    pub fn events(&self) -> &EventRegistry {
        &self.inner.events
    }

    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    /// Records the identity resolved by login. The first identity sticks.
    pub fn set_identity(&self, identity: BotIdentity) {
        if let Err(rejected) = self.inner.identity.set(identity) {
            if self.identity() != Some(&rejected) {
                warn!("Ignoring new identity {}; already logged in", rejected.user_id);
            }
        }
    }

    /// Loads events, logs in, loads config and commands. Bounded by
    /// `Settings::startup_timeout`.
    pub async fn start(&self) -> Result<(), Error> {
        let deadline = self.settings().startup_timeout;
        match tokio::time::timeout(deadline, self.start_sequence()).await {
            Ok(result) => result,
            Err(elapsed) => {
                error!("Startup did not finish within {:?}", deadline);
                Err(elapsed.into())
            }
        }
    }

    async fn start_sequence(&self) -> Result<(), Error> {
        self.events().load(self).await?;

        let identity = match self.gateway().login(&self.settings().token).await {
            Ok(identity) => identity,
            Err(e) => {
                error!("CLIENT_START_ERR: {}", e);
                return Err(e);
            }
        };
        info!("Logged in as {}.", identity.user_id);
        self.set_identity(identity);

        self.config().load(self).await?;
        self.commands().load(self).await?;

        if self.settings().await_registrations {
            let finished = self.commands().wait_registrations().await;
            info!("{} command registration(s) finished", finished);
        }

        info!("Client started.");
        Ok(())
    }

    /// Starts the client, then dispatches gateway events until the stream ends
    /// or [`shutdown`](Self::shutdown) is called.
    ///
    /// Interactions are dispatched on their own task so a slow command does not
    /// hold up the stream; every other event is dispatched in arrival order.
    pub async fn run(&self) -> Result<(), Error> {
        self.start().await?;

        let mut shutdown = self.inner.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return Ok(());
        }

        let gateway = self.gateway();
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutdown requested; leaving the event loop");
                    break;
                }
                next = gateway.next_event() => match next {
                    Some(event @ GatewayEvent::InteractionCreate(_)) => {
                        let client = self.clone();
                        tokio::spawn(async move { client.dispatch(event).await });
                    }
                    Some(event) => self.dispatch(event).await,
                    None => {
                        warn!("Gateway event stream ended");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    /// Runs the listener chain for one event, logging a failure.
    pub async fn dispatch(&self, event: GatewayEvent) {
        match self.events().dispatch(self, &event).await {
            Ok(0) => debug!("No listener for {}", event.name()),
            Ok(_) => {}
            Err(e) => error!("Listener for {} failed: {}", event.name(), e),
        }
    }

    /// Stops the event loop and background tasks, then disconnects.
    pub async fn shutdown(&self) -> Result<(), Error> {
        let _ = self.inner.shutdown_tx.send(true);
        self.config().shutdown();
        if let Err(e) = self.push().close().await {
            warn!("Error closing push channel: {}", e);
        }
        self.gateway().disconnect().await
    }
}

pub struct ClientBuilder {
    settings: Settings,
    gateway: Option<Arc<dyn GatewayApi>>,
    remote: Option<Arc<dyn RemoteApi>>,
    push: Option<Arc<dyn PushChannel>>,
    commands: CommandFactories,
    events: EventFactories,
    default_events: bool,
}

impl ClientBuilder {
    pub fn gateway(mut self, gateway: Arc<dyn GatewayApi>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteApi>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn push(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn commands(mut self, factories: CommandFactories) -> Self {
        self.commands = factories;
        self
    }

    pub fn events(mut self, factories: EventFactories) -> Self {
        self.events = factories;
        self
    }

    /// Leaves out the built-in guild reporter, identity recorder and command
    /// dispatcher.
    pub fn without_default_events(mut self) -> Self {
        self.default_events = false;
        self
    }

    pub fn build(self) -> Result<AzuriaClient, Error> {
        let gateway = self
            .gateway
            .ok_or_else(|| Error::Platform("client has no gateway".into()))?;
        let remote = self
            .remote
            .ok_or_else(|| Error::Platform("client has no remote API".into()))?;
        let push = self
            .push
            .ok_or_else(|| Error::Platform("client has no push channel".into()))?;

        let commands = CommandRegistry::new(self.settings.commands_dir(), self.commands);
        let mut events = EventRegistry::new(self.settings.events_dir(), self.events);
        if !self.default_events {
            events = events.without_defaults();
        }
        let config = ConfigStore::new(remote.clone());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(AzuriaClient {
            inner: Arc::new(ClientInner {
                settings: self.settings,
                gateway,
                remote,
                push,
                identity: OnceCell::new(),
                commands,
                events,
                config,
                shutdown_tx,
            }),
        })
    }
}
