use thiserror::Error;

use crate::agent::AgentId;

/// A datagram as it leaves the transport: the sender's address and the raw payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    pub from: AgentId,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("address {0} is already bound")]
    AddrInUse(AgentId),
    #[error("node {0} is unreachable")]
    Unreachable(AgentId),
    #[error("socket of {0} is not connected")]
    NotConnected(AgentId),
    #[error("socket of {0} is closed")]
    Closed(AgentId),
}

/// An unreliable, connectionless transport addressed by node identity. Sends are
/// fire-and-forget: a successful `send` says nothing about delivery.
///
/// Closing a socket must be idempotent and must release the bound address.
pub trait DatagramSocket: Send {
    fn local_id(&self) -> AgentId;
    fn connect(&mut self, peer: AgentId) -> Result<(), TransportError>;
    fn send(&mut self, payload: &[u8]) -> Result<usize, TransportError>;
    fn recv(&mut self) -> Option<Datagram>;
    fn close(&mut self);
}
