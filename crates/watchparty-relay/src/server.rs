//! Core relay: accepts websocket peers and fans their commands out.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use watchparty_core::{codec, WatchError, WatchResult};

use crate::config::RelayConfig;
use crate::peers::{PeerId, PeerRegistry};

/// What to do with one inbound text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Broadcast and remember as the replay for late joiners.
    Video,
    /// Broadcast only.
    Chat,
    /// Log and drop.
    Drop,
}

/// Classify a frame by its `type` field. Anything that does not parse as an
/// envelope or carries an unknown type is dropped.
pub fn route(frame: &str) -> Routing {
    let envelope = match codec::decode_envelope(frame) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "dropping unparseable frame");
            return Routing::Drop;
        }
    };
    match envelope.command_type() {
        Ok(kind) if kind.is_video() => Routing::Video,
        Ok(_) => Routing::Chat,
        Err(e) => {
            warn!(error = %e, "dropping frame with unknown type");
            Routing::Drop
        }
    }
}

pub struct RelayServer {
    listener: TcpListener,
    path: String,
    peers: PeerRegistry,
}

impl RelayServer {
    /// Bind the listening socket.
    pub async fn bind(config: &RelayConfig) -> WatchResult<Self> {
        config.validate()?;
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| WatchError::Transport(format!("bind {addr} failed: {e}")))?;
        Ok(Self {
            listener,
            path: config.path.clone(),
            peers: PeerRegistry::new(config.max_peers, config.replay_last_command),
        })
    }

    pub fn local_addr(&self) -> WatchResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Accept connections until the task is cancelled.
    pub async fn run(self) -> WatchResult<()> {
        let addr = self.local_addr()?;
        info!(addr = %addr, path = %self.path, "relay listening");

        loop {
            match self.listener.accept().await {
                Ok((stream, remote)) => {
                    let peers = self.peers.clone();
                    let path = self.path.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, remote, path, peers).await {
                            debug!(remote = %remote, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "TCP accept failed");
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    remote: SocketAddr,
    path: String,
    peers: PeerRegistry,
) -> WatchResult<()> {
    let check_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == path {
            Ok(resp)
        } else {
            debug!(remote = %remote, path = %req.uri().path(), "rejecting upgrade on unknown path");
            let mut err = ErrorResponse::new(Some("not found".to_string()));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
    };

    let mut ws = tokio_tungstenite::accept_hdr_async(stream, check_path)
        .await
        .map_err(|e| WatchError::Transport(format!("websocket handshake failed: {e}")))?;

    let Some((id, mut outbound)) = peers.register().await else {
        let _ = ws
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Again,
                reason: "relay is full".into(),
            })))
            .await;
        return Ok(());
    };
    debug!(peer = id, remote = %remote, "websocket connection accepted");

    let (mut sink, mut stream) = ws.split();

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                warn!(peer = id, error = %e, "send to peer failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    // The writer ends on its own when the peer is evicted or unwritable.
    let result = tokio::select! {
        result = read_loop(id, &mut stream, &peers) => result,
        _ = &mut writer => {
            debug!(peer = id, "writer ended, closing connection");
            Ok(())
        }
    };

    peers.unregister(id).await;
    writer.abort();
    result
}

async fn read_loop<S>(id: PeerId, stream: &mut S, peers: &PeerRegistry) -> WatchResult<()>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let text = text.to_string();
                match route(&text) {
                    Routing::Video => {
                        peers.broadcast(&text, true).await;
                    }
                    Routing::Chat => {
                        peers.broadcast(&text, false).await;
                    }
                    Routing::Drop => {
                        debug!(peer = id, len = text.len(), "frame dropped");
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {
                // Pings are answered by tungstenite; binary frames carry nothing.
            }
            Err(e) => {
                return Err(WatchError::Transport(format!("peer {id} read failed: {e}")));
            }
        }
    }
    Ok(())
}
