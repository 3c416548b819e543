//! Peer registry and fan-out.
//!
//! Every connected peer has a bounded outbound queue drained by its own
//! writer task. A peer whose queue fills up is evicted. The registry also
//! remembers the last playback command so late joiners start on the same
//! video and position.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

pub type PeerId = u64;

/// Outbound queue of one peer; items are raw text frames.
pub type PeerSender = mpsc::Sender<String>;

/// Frames a peer may fall behind by before it is evicted.
pub const PEER_QUEUE_LEN: usize = 256;

#[derive(Default)]
struct Inner {
    peers: HashMap<PeerId, PeerSender>,
    last_video_command: Option<String>,
    next_id: PeerId,
}

/// Shared registry of connected peers.
#[derive(Clone)]
pub struct PeerRegistry {
    inner: Arc<RwLock<Inner>>,
    max_peers: usize,
    replay: bool,
    queue_len: usize,
}

impl PeerRegistry {
    pub fn new(max_peers: usize, replay: bool) -> Self {
        Self::with_queue_len(max_peers, replay, PEER_QUEUE_LEN)
    }

    pub fn with_queue_len(max_peers: usize, replay: bool, queue_len: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            max_peers,
            replay,
            queue_len: queue_len.max(1),
        }
    }

    /// Add a peer. Returns `None` when the relay is full.
    ///
    /// The last playback command, if any, is queued to the new peer before
    /// anything broadcast after registration.
    pub async fn register(&self) -> Option<(PeerId, mpsc::Receiver<String>)> {
        let mut inner = self.inner.write().await;
        if inner.peers.len() >= self.max_peers {
            warn!(max_peers = self.max_peers, "relay full, refusing peer");
            return None;
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let (tx, rx) = mpsc::channel(self.queue_len);

        if self.replay {
            if let Some(frame) = &inner.last_video_command {
                debug!(peer = id, "replaying last video command");
                let _ = tx.try_send(frame.clone());
            }
        }

        inner.peers.insert(id, tx);
        info!(peer = id, peers = inner.peers.len(), "peer joined");
        Some((id, rx))
    }

    pub async fn unregister(&self, id: PeerId) {
        let mut inner = self.inner.write().await;
        if inner.peers.remove(&id).is_some() {
            info!(peer = id, peers = inner.peers.len(), "peer left");
        }
    }

    /// Queue `frame` to every peer, the sender included. With `remember`,
    /// the frame becomes the replay for future joiners. Peers whose queue is
    /// full are evicted; dropping their sender ends their writer task.
    pub async fn broadcast(&self, frame: &str, remember: bool) -> usize {
        let mut inner = self.inner.write().await;
        if remember {
            inner.last_video_command = Some(frame.to_string());
        }

        let mut delivered = 0;
        let mut lagging = Vec::new();
        for (id, tx) in &inner.peers {
            match tx.try_send(frame.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => lagging.push(*id),
                Err(TrySendError::Closed(_)) => debug!(peer = id, "peer queue closed, skipping"),
            }
        }
        for id in lagging {
            inner.peers.remove(&id);
            warn!(peer = id, queue_len = self.queue_len, "peer fell behind, evicting");
        }
        debug!(delivered, "broadcast frame");
        delivered
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.peers.len()
    }

    pub async fn last_video_command(&self) -> Option<String> {
        self.inner.read().await.last_video_command.clone()
    }
}
