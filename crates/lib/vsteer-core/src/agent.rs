use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::str::FromStr;

use serde::Deserialize;

use crate::bucket::{Bucket, TimeMS};

/// A unique ID that is a property of all the agents in the deployment. Vehicles carry the same
/// ID on the wire, so it is kept at 32 bits.
#[derive(Deserialize, Default, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct AgentId(u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.parse::<u32>()?;
        Ok(Self(id))
    }
}

impl From<u32> for AgentId {
    fn from(f: u32) -> Self {
        Self(f)
    }
}

impl AgentId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }
    pub fn as_f64(&self) -> f64 {
        self.0 as f64
    }
}

/// The kind of agent taking part in the deployment.
#[derive(Deserialize, Debug, Hash, Copy, Default, Clone, PartialEq, Eq)]
pub enum AgentKind {
    #[default]
    Vehicle = 0,
    RSU,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Vehicle => write!(f, "Vehicle"),
            AgentKind::RSU => write!(f, "RSU"),
        }
    }
}

/// Agent order indicates the order in which the behavior of the agents is simulated.
///
/// At each time step the agents are popped by their order. Stage one runs from the lowest
/// order to the highest, stage two in the reverse direction. Giving vehicles a lower order
/// than roadside units makes every report sent in stage one visible to the collectors in
/// stage two of the same step.
#[derive(Deserialize, Debug, Copy, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentOrder(pub u32);

impl From<u32> for AgentOrder {
    fn from(f: u32) -> Self {
        Self(f)
    }
}

impl AgentOrder {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

pub trait Orderable {
    fn order(&self) -> AgentOrder;
}

/// A trait that allows an agent to be scheduled. Activation and deactivation get access to the
/// bucket so that agents can acquire and release the shared resources they need.
pub trait Activatable<B: Bucket> {
    fn activate(&mut self, bucket: &mut B);
    fn deactivate(&mut self, bucket: &mut B);
    fn is_deactivated(&self) -> bool;
    fn has_activation(&self) -> bool;
    fn time_of_activation(&mut self) -> TimeMS;
}

/// A trait that represents an agent. Only types with this trait can be handed to the
/// scheduler.
pub trait Agent<B>: Activatable<B> + Orderable + Send
where
    B: Bucket,
{
    fn id(&self) -> AgentId;
    fn stage_one(&mut self, bucket: &mut B);
    fn stage_two_reverse(&mut self, bucket: &mut B);
}
