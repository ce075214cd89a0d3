use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::{mpsc, Mutex};

use crate::protocol::{decode, ControlMessage, Decoded, Frame, Role};

/// Handle for queueing outbound frames on one connection's writer task
pub type FrameSender = mpsc::UnboundedSender<Frame>;

/// Server-assigned connection identity, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

/// A connected client
#[derive(Debug)]
struct Peer {
    role: Option<Role>,
    tx: FrameSender,
    addr: SocketAddr,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    peers: HashMap<ConnId, Peer>,
    broadcaster: Option<ConnId>,
}

/// Owns the connection registry and the fan-out algorithm.
///
/// One broadcaster at a time pushes opaque frames; the hub relays each frame
/// verbatim to every registered viewer. Roles are message-driven: a client's
/// most recent register request decides whether its payloads are relayed.
/// All registry mutations are serialized behind a single lock, and no await
/// happens while it is held, so forwarding never observes a half-mutated
/// viewer set.
#[derive(Debug)]
pub struct RelayHub {
    registry: Mutex<Registry>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Admit a new connection with no role and queue the connection ack.
    pub async fn connect(&self, tx: FrameSender, addr: SocketAddr) -> ConnId {
        let mut registry = self.registry.lock().await;
        registry.next_id += 1;
        let id = ConnId(registry.next_id);

        send_control(&tx, &ControlMessage::connected());
        registry.peers.insert(id, Peer { role: None, tx, addr });
        id
    }

    /// Process one inbound payload from a connection.
    pub async fn handle_message(&self, id: ConnId, payload: Frame) {
        match decode(&payload) {
            Decoded::Register { role: Some(role) } => self.register(id, role).await,
            // Unknown or missing role: no state change, no ack, no error
            Decoded::Register { role: None } => {}
            Decoded::Frame => self.forward(id, payload).await,
        }
    }

    /// Remove a closed connection, dispatching on its stored role.
    pub async fn disconnect(&self, id: ConnId) {
        let mut registry = self.registry.lock().await;
        let Some(peer) = registry.peers.remove(&id) else {
            return;
        };

        match peer.role {
            Some(Role::Viewer) => {
                let viewers = count_viewers(&registry.peers);
                println!(
                    "[{}] Viewer disconnected. Total viewers: {}",
                    peer.addr, viewers
                );
            }
            Some(Role::Broadcaster) => {
                // A displaced former broadcaster must not clear its replacement
                if registry.broadcaster == Some(id) {
                    registry.broadcaster = None;
                    println!("[{}] Broadcaster disconnected", peer.addr);
                }
            }
            None => {}
        }
    }

    /// Number of currently registered viewers
    pub async fn viewer_count(&self) -> usize {
        let registry = self.registry.lock().await;
        count_viewers(&registry.peers)
    }

    /// The connection currently holding the broadcaster slot, if any
    pub async fn current_broadcaster(&self) -> Option<ConnId> {
        self.registry.lock().await.broadcaster
    }

    async fn register(&self, id: ConnId, role: Role) {
        let mut registry = self.registry.lock().await;
        let Registry {
            peers, broadcaster, ..
        } = &mut *registry;
        let Some(peer) = peers.get_mut(&id) else {
            return;
        };

        peer.role = Some(role);
        send_control(&peer.tx, &ControlMessage::registered(role));
        let addr = peer.addr;

        match role {
            Role::Viewer => {
                // The slot only holds a connection whose latest registration
                // is broadcaster
                if *broadcaster == Some(id) {
                    *broadcaster = None;
                }
                let viewers = count_viewers(peers);
                println!("[{}] Viewer registered. Total viewers: {}", addr, viewers);
            }
            Role::Broadcaster => {
                // Last registration wins; the previous holder is not closed
                *broadcaster = Some(id);
                println!("[{}] Broadcaster registered", addr);
            }
        }
    }

    async fn forward(&self, id: ConnId, payload: Frame) {
        let registry = self.registry.lock().await;
        if registry.broadcaster != Some(id) {
            // Viewer and unregistered payloads are dropped without feedback
            return;
        }

        for peer in registry.peers.values() {
            if peer.role != Some(Role::Viewer) {
                continue;
            }
            // A send on a closed channel means the transport is already
            // gone; the peer is only removed when its close event fires
            let _ = peer.tx.send(payload.clone());
        }
    }
}

fn count_viewers(peers: &HashMap<ConnId, Peer>) -> usize {
    peers
        .values()
        .filter(|peer| peer.role == Some(Role::Viewer))
        .count()
}

fn send_control(tx: &FrameSender, msg: &ControlMessage) {
    if let Ok(json) = msg.to_json() {
        let _ = tx.send(Frame::Text(json));
    }
}
