use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use log::{debug, trace};
use rand_distr::{Bernoulli, Distribution};
use rand_pcg::Pcg64Mcg;
use serde::Deserialize;

use vsteer_core::agent::AgentId;
use vsteer_core::model::{Model, ModelSettings};
use vsteer_core::radio::{Datagram, DatagramSocket, TransportError};

#[derive(Deserialize, Debug, Clone)]
pub struct NetworkSettings {
    pub loss_probability: f64,
    pub seed: u64,
}

impl ModelSettings for NetworkSettings {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
}

#[derive(Debug)]
struct NetState {
    inboxes: HashMap<AgentId, VecDeque<Datagram>>,
    loss: Bernoulli,
    rng: Pcg64Mcg,
    stats: NetworkStats,
}

/// In-process unreliable datagram network. Nodes bind their identity to get a socket;
/// every send is independently dropped with the configured loss probability, and datagrams
/// addressed to an unbound identity vanish silently.
#[derive(Clone, Debug)]
pub struct LossyNetwork {
    state: Arc<Mutex<NetState>>,
}

impl Model for LossyNetwork {
    type Settings = NetworkSettings;

    fn with_settings(settings: &NetworkSettings) -> Self {
        let probability = settings.loss_probability.clamp(0.0, 1.0);
        let loss = match Bernoulli::new(probability) {
            Ok(loss) => loss,
            Err(_) => panic!("Invalid loss probability {}", settings.loss_probability),
        };
        Self {
            state: Arc::new(Mutex::new(NetState {
                inboxes: HashMap::new(),
                loss,
                rng: Pcg64Mcg::new(settings.seed as u128),
                stats: NetworkStats::default(),
            })),
        }
    }
}

impl LossyNetwork {
    pub fn lossless() -> Self {
        Self::with_settings(&NetworkSettings {
            loss_probability: 0.0,
            seed: 0,
        })
    }

    fn lock(&self) -> MutexGuard<'_, NetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bind(&self, local: AgentId) -> Result<LossySocket, TransportError> {
        let mut state = self.lock();
        if state.inboxes.contains_key(&local) {
            return Err(TransportError::AddrInUse(local));
        }
        state.inboxes.insert(local, VecDeque::new());
        debug!("Bound socket for node {}", local);
        Ok(LossySocket {
            local,
            peer: None,
            closed: false,
            network: self.clone(),
        })
    }

    pub fn is_bound(&self, node: AgentId) -> bool {
        self.lock().inboxes.contains_key(&node)
    }

    pub fn stats(&self) -> NetworkStats {
        self.lock().stats
    }

    fn deliver(&self, from: AgentId, to: AgentId, payload: &[u8]) {
        let mut state = self.lock();
        state.stats.sent += 1;
        let NetState {
            inboxes,
            loss,
            rng,
            stats,
        } = &mut *state;
        if loss.sample(rng) {
            trace!("Datagram from {} to {} lost", from, to);
            stats.lost += 1;
            return;
        }
        match inboxes.get_mut(&to) {
            Some(inbox) => {
                inbox.push_back(Datagram {
                    from,
                    payload: payload.to_vec(),
                });
                stats.delivered += 1;
            }
            None => {
                trace!("Datagram from {} to unbound node {} dropped", from, to);
                stats.lost += 1;
            }
        }
    }

    fn take(&self, node: AgentId) -> Option<Datagram> {
        self.lock().inboxes.get_mut(&node)?.pop_front()
    }

    fn release(&self, node: AgentId) {
        if self.lock().inboxes.remove(&node).is_some() {
            debug!("Released socket of node {}", node);
        }
    }
}

#[derive(Debug)]
pub struct LossySocket {
    local: AgentId,
    peer: Option<AgentId>,
    closed: bool,
    network: LossyNetwork,
}

impl DatagramSocket for LossySocket {
    fn local_id(&self) -> AgentId {
        self.local
    }

    /// Connecting only succeeds towards a node that currently holds a bound socket.
    fn connect(&mut self, peer: AgentId) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.local));
        }
        if !self.network.is_bound(peer) {
            return Err(TransportError::Unreachable(peer));
        }
        self.peer = Some(peer);
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.local));
        }
        let peer = self.peer.ok_or(TransportError::NotConnected(self.local))?;
        self.network.deliver(self.local, peer, payload);
        Ok(payload.len())
    }

    fn recv(&mut self) -> Option<Datagram> {
        if self.closed {
            return None;
        }
        self.network.take(self.local)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.peer = None;
        self.network.release(self.local);
    }
}

impl Drop for LossySocket {
    fn drop(&mut self) {
        self.close();
    }
}
