//! WebSocket transport
//!
//! Runs the socket on a dedicated thread with a single-threaded tokio
//! runtime. The owning (UI) thread talks to it through channels and never
//! blocks: commands go out over a tokio mpsc, events come back over a std
//! mpsc drained with [`WebSocketTransport::poll_events`].

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

use super::phoenix::{self, ChannelState, PhoenixMessage};
use super::{Result, Transport, TransportError, TransportEvent};

/// How long dropping the transport waits for the leave to go out
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Commands from the owner to the socket thread
#[derive(Debug)]
enum Command {
    Push { event: String, payload: Value },
    Leave,
}

/// Phoenix channel transport over a WebSocket
pub struct WebSocketTransport {
    /// Socket endpoint, without the `vsn` query parameter
    endpoint: String,
    heartbeat: Duration,
    commands: Option<UnboundedSender<Command>>,
    events_tx: Sender<TransportEvent>,
    events_rx: Receiver<TransportEvent>,
    worker: Option<JoinHandle<()>>,
}

impl WebSocketTransport {
    pub fn new(endpoint: impl Into<String>, heartbeat: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            endpoint: endpoint.into(),
            heartbeat,
            commands: None,
            events_tx,
            events_rx,
            worker: None,
        }
    }

    /// Drain every event received since the last call (non-blocking)
    pub fn poll_events(&self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

impl Transport for WebSocketTransport {
    fn join(&mut self, topic: &str, params: Value) -> Result<()> {
        if self.commands.is_some() {
            return Err(TransportError::AlreadyJoined);
        }

        let (tx, rx) = unbounded_channel();
        let url = phoenix::socket_url(&self.endpoint);
        let topic = topic.to_string();
        let heartbeat = self.heartbeat;
        let events = self.events_tx.clone();

        let worker = thread::Builder::new()
            .name("mudplay-socket".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        let _ = events.send(TransportEvent::JoinError(format!(
                            "failed to start runtime: {e}"
                        )));
                        return;
                    }
                };
                runtime.block_on(run_socket(url, topic, params, heartbeat, rx, events));
            })
            .map_err(TransportError::Spawn)?;

        self.commands = Some(tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn push(&mut self, event: &str, payload: Value) -> Result<()> {
        let commands = self.commands.as_ref().ok_or(TransportError::Closed)?;
        commands
            .send(Command::Push {
                event: event.to_string(),
                payload,
            })
            .map_err(|_| TransportError::Closed)
    }

    fn leave(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.send(Command::Leave);
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.leave();

        // Give the worker a moment to send phx_leave and close the socket;
        // a connect that is still pending must not hold up shutdown.
        if let Some(handle) = self.worker.take() {
            let deadline = Instant::now() + SHUTDOWN_GRACE;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                debug!("socket worker still busy at shutdown, detaching");
            }
        }
    }
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

async fn send_message(sink: &mut WsSink, message: &PhoenixMessage) -> Result<()> {
    let text = message.encode()?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

async fn run_socket(
    url: String,
    topic: String,
    params: Value,
    heartbeat: Duration,
    mut commands: UnboundedReceiver<Command>,
    events: Sender<TransportEvent>,
) {
    let (ws, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(v) => v,
        Err(e) => {
            warn!(url = %url, err = %e, "connect failed");
            let _ = events.send(TransportEvent::JoinError(format!("connect {url}: {e}")));
            return;
        }
    };
    info!(url = %url, "socket connected");

    let (mut sink, mut stream) = ws.split();
    let mut channel = ChannelState::new();

    let join = channel.join_message(&topic, params);
    if let Err(e) = send_message(&mut sink, &join).await {
        let _ = events.send(TransportEvent::JoinError(format!("join send failed: {e}")));
        return;
    }

    let mut ticker = tokio::time::interval(heartbeat);
    // First tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            m = stream.next() => {
                let text = match m {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(frame))) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "socket closed by server".to_string());
                        let _ = events.send(TransportEvent::Disconnected(reason));
                        return;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(err = %e, "socket read failed");
                        let _ = events.send(TransportEvent::Disconnected(e.to_string()));
                        return;
                    }
                    None => {
                        let _ = events.send(TransportEvent::Disconnected("socket closed".to_string()));
                        return;
                    }
                };

                let event = match PhoenixMessage::decode(&text) {
                    Ok(message) => channel.route(message),
                    Err(e) => Some(TransportEvent::Undecodable(e.to_string())),
                };
                if let Some(event) = event {
                    if events.send(event).is_err() {
                        // Owner is gone
                        return;
                    }
                }
            }
            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Push { event, payload }) => {
                        let Some(message) = channel.push_message(&event, payload) else {
                            continue;
                        };
                        if let Err(e) = send_message(&mut sink, &message).await {
                            let _ = events.send(TransportEvent::Disconnected(format!("send failed: {e}")));
                            return;
                        }
                    }
                    Some(Command::Leave) | None => {
                        if let Some(message) = channel.leave_message() {
                            let _ = send_message(&mut sink, &message).await;
                        }
                        let _ = sink.close().await;
                        debug!(topic = %topic, "left channel");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                let message = channel.heartbeat_message();
                if let Err(e) = send_message(&mut sink, &message).await {
                    let _ = events.send(TransportEvent::Disconnected(format!("heartbeat failed: {e}")));
                    return;
                }
            }
        }
    }
}
