//! Reconnecting websocket link to the relay.
//!
//! A background task owns the socket. It connects, pumps frames in both
//! directions, and on any closure waits the fixed reconnect delay before the
//! next attempt. The session talks to it through [`RelayConnection`]:
//! outbound frames go over an unbounded channel, connection state is read
//! from a `watch` channel, and everything that happens comes back as
//! [`TransportEvent`]s.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use watchparty_core::{codec, LinkState, TransportLink, WatchError, WatchResult};

use super::reconnect::ReconnectSchedule;
use super::TransportEvent;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the pump loop returned.
enum PumpExit {
    /// The socket closed or failed; reconnect.
    Closed,
    /// The session dropped its handle; stop for good.
    Shutdown,
}

/// Handle to the single relay connection of this process.
pub struct RelayConnection {
    url: String,
    outgoing_tx: mpsc::UnboundedSender<String>,
    state_rx: watch::Receiver<LinkState>,
    task: tokio::task::JoinHandle<()>,
}

impl RelayConnection {
    /// Spawn the connection task. The first attempt starts immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let url = url.into();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<TransportEvent>();
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);

        let task = {
            let url = url.clone();
            tokio::spawn(async move {
                Self::connection_loop(url, reconnect_delay, outgoing_rx, events_tx, state_tx).await;
            })
        };

        (
            Self {
                url,
                outgoing_tx,
                state_rx,
                task,
            },
            events_rx,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn connection_loop(
        url: String,
        reconnect_delay: Duration,
        mut outgoing_rx: mpsc::UnboundedReceiver<String>,
        events: mpsc::UnboundedSender<TransportEvent>,
        state_tx: watch::Sender<LinkState>,
    ) {
        let mut schedule = ReconnectSchedule::new(reconnect_delay);

        loop {
            let attempt = schedule.begin_attempt();
            state_tx.send_replace(LinkState::Connecting);
            debug!(url = %url, attempt, "connecting to relay");
            if events.send(TransportEvent::Connecting { attempt }).is_err() {
                break;
            }

            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    schedule.on_open();
                    state_tx.send_replace(LinkState::Connected);
                    info!(url = %url, attempt, "relay connected");
                    if events.send(TransportEvent::Opened).is_err() {
                        break;
                    }

                    let exit = Self::pump(ws, &mut outgoing_rx, &events, &state_tx).await;
                    if let PumpExit::Shutdown = exit {
                        break;
                    }
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "relay connect failed");
                    if events.send(TransportEvent::Error(e.to_string())).is_err() {
                        break;
                    }
                }
            }

            state_tx.send_replace(LinkState::Disconnected);

            // Frames queued after the socket went down are not retried.
            while let Ok(frame) = outgoing_rx.try_recv() {
                debug!(len = frame.len(), "dropping frame queued on closed link");
            }

            let Some(retry_at) = schedule.on_closed(Instant::now()) else {
                continue;
            };
            if events
                .send(TransportEvent::Closed {
                    retry_in: schedule.delay(),
                })
                .is_err()
            {
                break;
            }
            tokio::time::sleep_until(retry_at).await;
        }

        state_tx.send_replace(LinkState::Disconnected);
        debug!("relay connection loop ended");
    }

    /// Shuttle frames until the socket closes or the handle goes away. The
    /// link is marked disconnected before anything about the closure is
    /// reported, so `send_text` never accepts a frame for a dead socket.
    async fn pump(
        ws: WsStream,
        outgoing_rx: &mut mpsc::UnboundedReceiver<String>,
        events: &mpsc::UnboundedSender<TransportEvent>,
        state_tx: &watch::Sender<LinkState>,
    ) -> PumpExit {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => match codec::decode(&text) {
                            Ok(cmd) => {
                                if events.send(TransportEvent::Command(cmd)).is_err() {
                                    return PumpExit::Shutdown;
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "dropping malformed frame");
                            }
                        },
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = sink.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            state_tx.send_replace(LinkState::Disconnected);
                            debug!("relay closed the connection");
                            return PumpExit::Closed;
                        }
                        Some(Ok(_)) => {
                            // Binary frames and pongs carry no commands.
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "relay read error");
                            state_tx.send_replace(LinkState::Disconnected);
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            return PumpExit::Closed;
                        }
                    }
                }
                frame = outgoing_rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                                warn!(error = %e, "relay write error");
                                state_tx.send_replace(LinkState::Disconnected);
                                let _ = events.send(TransportEvent::Error(e.to_string()));
                                return PumpExit::Closed;
                            }
                        }
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            return PumpExit::Shutdown;
                        }
                    }
                }
            }
        }
    }
}

impl TransportLink for RelayConnection {
    fn state(&self) -> LinkState {
        *self.state_rx.borrow()
    }

    fn send_text(&mut self, frame: String) -> WatchResult<()> {
        if !self.state().is_open() {
            return Err(WatchError::NotConnected);
        }
        self.outgoing_tx
            .send(frame)
            .map_err(|_| WatchError::Transport("relay connection task ended".into()))
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}
