use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use babel_core::ids::ConnectionId;

use crate::wire::InboundEvent;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// A connected client channel. Immutable after registration apart from
/// liveness flags, so entries are shared without a lock.
pub struct Client {
    pub id: ConnectionId,
    pub tx: mpsc::Sender<String>,
    pub connected: AtomicBool,
    pub last_pong: AtomicU64,
}

impl Client {
    fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected: AtomicBool::new(true),
            last_pong: AtomicU64::new(now_secs()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    pub fn is_alive(&self) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < CLIENT_TIMEOUT.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Transport-level registry of connected channels. One entry per open
/// socket; the participant profile lives in a separate registry.
pub struct ClientRegistry {
    clients: DashMap<ConnectionId, Arc<Client>>,
    max_send_queue: usize,
}

impl ClientRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new channel. Returns its id and the receiving end of
    /// its send queue.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.clients.insert(id.clone(), Arc::new(Client::new(id.clone(), tx)));
        (id, rx)
    }

    /// Remove a channel. No-op when absent. Dropping the entry closes the
    /// send queue, which ends the writer task and lets the socket task run
    /// its disconnect handling.
    pub fn unregister(&self, id: &ConnectionId) {
        if let Some((_, client)) = self.clients.remove(id) {
            client.connected.store(false, Ordering::Relaxed);
        }
    }

    /// Queue a message for one channel. Best-effort: a full queue drops
    /// the message with a warn, a missing or closed channel returns false.
    pub fn send_to(&self, id: &ConnectionId, message: String) -> bool {
        let Some(client) = self.clients.get(id) else {
            return false;
        };
        match client.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    connection_id = %id,
                    msg_len = msg.len(),
                    "send queue full, dropping message"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.clients.contains_key(id)
    }

    /// Number of registered channels.
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    fn get(&self, id: &ConnectionId) -> Option<Arc<Client>> {
        self.clients.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove channels that haven't answered a ping within the timeout.
    pub fn cleanup_dead_clients(&self) -> usize {
        let dead: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|entry| !entry.value().is_alive())
            .map(|entry| entry.key().clone())
            .collect();

        let removed = dead.len();
        for id in dead {
            self.unregister(&id);
            tracing::info!(connection_id = %id, "cleaned up dead connection");
        }
        removed
    }
}

/// Pump one WebSocket: writer forwards the send queue and heartbeats,
/// reader feeds inbound text frames to the event queue and tracks pongs.
/// Returns once either side closes; the caller runs disconnect handling.
pub async fn handle_ws_connection(
    socket: WebSocket,
    connection_id: ConnectionId,
    mut rx: mpsc::Receiver<String>,
    registry: Arc<ClientRegistry>,
    inbound: mpsc::Sender<InboundEvent>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_cid = connection_id.clone();
    let writer_registry = Arc::clone(&registry);
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                    tracing::trace!(connection_id = %writer_cid, "sent ping");
                }
            }
        }

        if let Some(client) = writer_registry.get(&writer_cid) {
            client.connected.store(false, Ordering::Relaxed);
        }
    });

    let reader_cid = connection_id.clone();
    let reader_registry = Arc::clone(&registry);
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let _ = inbound
                        .send(InboundEvent::Frame(reader_cid.clone(), text.to_string()))
                        .await;
                }
                WsMessage::Pong(_) => {
                    if let Some(client) = reader_registry.get(&reader_cid) {
                        client.record_pong();
                    }
                }
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum answers pings itself
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    registry.unregister(&connection_id);
}

/// Start a background task that periodically sweeps dead channels.
pub fn start_cleanup_task(
    registry: Arc<ClientRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = registry.cleanup_dead_clients();
            if removed > 0 {
                tracing::info!(removed = removed, "dead connection cleanup");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_unique() {
        let registry = ClientRegistry::new(32);
        let (a, _rx_a) = registry.register();
        let (b, _rx_b) = registry.register();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("conn_"));
    }

    #[test]
    fn register_and_unregister() {
        let registry = ClientRegistry::new(32);
        assert_eq!(registry.count(), 0);

        let (id1, _rx1) = registry.register();
        let (id2, _rx2) = registry.register();
        assert_eq!(registry.count(), 2);
        assert!(registry.contains(&id1));

        registry.unregister(&id1);
        assert_eq!(registry.count(), 1);
        assert!(!registry.contains(&id1));

        registry.unregister(&id2);
        assert_eq!(registry.count(), 0);

        // Unregistering an absent id is a no-op
        registry.unregister(&id2);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn send_to_delivers() {
        let registry = ClientRegistry::new(32);
        let (id, mut rx) = registry.register();

        assert!(registry.send_to(&id, "test message".into()));
        assert_eq!(rx.try_recv().unwrap(), "test message");
    }

    #[test]
    fn send_to_unknown_connection() {
        let registry = ClientRegistry::new(32);
        let fake = ConnectionId::new();
        assert!(!registry.send_to(&fake, "test".into()));
    }

    #[test]
    fn send_to_full_queue_drops() {
        let registry = ClientRegistry::new(2); // tiny queue
        let (id, _rx) = registry.register();

        assert!(registry.send_to(&id, "msg1".into()));
        assert!(registry.send_to(&id, "msg2".into()));

        // Queue is full now
        assert!(!registry.send_to(&id, "msg3".into()));
    }

    #[test]
    fn pong_tracking() {
        let (tx, _rx) = mpsc::channel(1);
        let client = Client::new(ConnectionId::new(), tx);
        assert!(client.is_alive());

        client.record_pong();
        assert!(client.is_alive());
    }

    #[test]
    fn cleanup_removes_expired() {
        let registry = ClientRegistry::new(32);
        let (id, _rx) = registry.register();
        assert_eq!(registry.count(), 1);

        registry
            .get(&id)
            .unwrap()
            .last_pong
            .store(0, Ordering::Relaxed);

        assert_eq!(registry.cleanup_dead_clients(), 1);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn cleanup_keeps_live_connections() {
        let registry = ClientRegistry::new(32);
        let (_id, _rx) = registry.register();

        assert_eq!(registry.cleanup_dead_clients(), 0);
        assert_eq!(registry.count(), 1);
    }
}
