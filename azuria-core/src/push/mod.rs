// File: azuria-core/src/push/mod.rs

pub mod frame;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use azuria_common::models::PushNotification;
use azuria_common::traits::PushChannel;

use crate::push::frame::Frame;
use crate::Error;

type Subscribers = DashMap<String, Vec<mpsc::UnboundedSender<PushNotification>>>;

/// Builds the Socket.IO websocket endpoint for an `http(s)` or `ws(s)` base URL.
pub fn endpoint(base: &str) -> Result<String, Error> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::InvalidUri(format!("unsupported push scheme '{other}'"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::InvalidUri(format!("cannot use {scheme} for {base}")))?;

    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url.to_string())
}

/// Push channel over a Socket.IO websocket.
///
/// The connection is opened on the first subscription and kept alive by a
/// background task that reconnects after a fixed delay whenever it drops.
pub struct SocketIoPushChannel {
    endpoint: String,
    reconnect_delay: Duration,
    subscribers: Arc<Subscribers>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SocketIoPushChannel {
    pub fn new(base_url: &str, reconnect_delay: Duration) -> Result<Self, Error> {
        Ok(Self {
            endpoint: endpoint(base_url)?,
            reconnect_delay,
            subscribers: Arc::new(DashMap::new()),
            task: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn ensure_connected(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let endpoint = self.endpoint.clone();
        let subscribers = self.subscribers.clone();
        let delay = self.reconnect_delay;
        *task = Some(tokio::spawn(connection_loop(endpoint, subscribers, delay)));
    }
}

#[async_trait]
impl PushChannel for SocketIoPushChannel {
    async fn subscribe(&self, topic: &str) -> Result<mpsc::UnboundedReceiver<PushNotification>, Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.entry(topic.to_string()).or_default().push(tx);
        debug!("[Push] subscribed to {}", topic);
        self.ensure_connected();
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.subscribers.clear();
        info!("[Push] closed");
        Ok(())
    }
}

impl Drop for SocketIoPushChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

async fn connection_loop(endpoint: String, subscribers: Arc<Subscribers>, delay: Duration) {
    loop {
        match connect_async(endpoint.as_str()).await {
            Ok((mut ws, _)) => {
                info!("[Push] connected → {}", endpoint);
                match read_loop(&mut ws, &subscribers).await {
                    Ok(()) => warn!("[Push] server closed the socket; reconnecting"),
                    Err(e) => error!("[Push] loop error: {}", e),
                }
            }
            Err(e) => error!("[Push] connect error: {}", e),
        }
        sleep(delay).await;
    }
}

/// Engine.IO defaults, used until the server's open frame says otherwise.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(25_000);
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(20_000);

/// How long the server may stay silent before the connection counts as dead:
/// one ping interval plus the ping timeout from the open frame.
fn read_deadline(open: &serde_json::Value) -> Duration {
    let millis = |key: &str| open.get(key).and_then(serde_json::Value::as_u64).map(Duration::from_millis);
    millis("pingInterval").unwrap_or(DEFAULT_PING_INTERVAL) + millis("pingTimeout").unwrap_or(DEFAULT_PING_TIMEOUT)
}

async fn read_loop(
    ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>,
    subscribers: &Subscribers,
) -> Result<(), Error> {
    let mut deadline = DEFAULT_PING_INTERVAL + DEFAULT_PING_TIMEOUT;
    loop {
        let msg = match timeout(deadline, ws.next()).await {
            Ok(Some(msg)) => msg.map_err(|e| Error::WebSocket(e.to_string()))?,
            Ok(None) => return Ok(()),
            Err(_) => {
                return Err(Error::WebSocket(format!("no frame from server in {deadline:?}")));
            }
        };
        let txt = match msg {
            Message::Text(txt) => txt,
            Message::Ping(data) => {
                send(ws, Message::Pong(data)).await?;
                continue;
            }
            Message::Close(_) => return Ok(()),
            _ => continue,
        };

        match frame::parse(txt.as_str()) {
            Frame::Open(params) => {
                deadline = read_deadline(&params);
                debug!("[Push] transport open, read deadline {:?}", deadline);
                send(ws, Message::text(frame::CONNECT)).await?;
            }
            Frame::Ping => send(ws, Message::text(frame::PONG)).await?,
            Frame::Connected => debug!("[Push] namespace joined"),
            Frame::Event { name, payload } => deliver(subscribers, name, payload),
            Frame::ConnectError(reason) => {
                return Err(Error::WebSocket(format!("namespace refused: {reason}")));
            }
            Frame::Close | Frame::Disconnected => return Ok(()),
            Frame::Pong | Frame::Noop => {}
            Frame::Unknown(raw) => trace!("[Push] ignoring frame {}", raw),
        }
    }
}

async fn send(ws: &mut WebSocketStream<MaybeTlsStream<TcpStream>>, msg: Message) -> Result<(), Error> {
    ws.send(msg).await.map_err(|e| Error::WebSocket(e.to_string()))
}

/// Hands a notification to every live receiver of `topic`, forgetting closed ones.
fn deliver(subscribers: &Subscribers, topic: String, payload: serde_json::Value) {
    let Some(mut senders) = subscribers.get_mut(&topic) else {
        trace!("[Push] no subscriber for {}", topic);
        return;
    };
    senders.retain(|tx| {
        tx.send(PushNotification {
            topic: topic.clone(),
            payload: payload.clone(),
        })
        .is_ok()
    });
}
