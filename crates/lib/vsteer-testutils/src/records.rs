use std::sync::{Arc, Mutex, PoisonError};

use vsteer_core::agent::AgentId;
use vsteer_models::partition::{Group, GroupSink};
use vsteer_models::telemetry::TelemetryRecord;

pub fn make_record(x: f64, y: f64, speed: f64, agent_id: u32) -> TelemetryRecord {
    TelemetryRecord::builder()
        .position_x(x)
        .position_y(y)
        .speed(speed)
        .agent_id(AgentId::from(agent_id))
        .build()
}

/// `count` records of vehicles near `origin`, with agent IDs starting at `first_id`.
pub fn make_batch(origin: f64, first_id: u32, count: u32) -> Vec<TelemetryRecord> {
    (0..count)
        .map(|i| make_record(origin + 9.0 * i as f64, 0.0, 20.0, first_id + i))
        .collect()
}

/// Keeps persisted groups in memory. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    pub persisted: Arc<Mutex<Vec<Vec<Group>>>>,
}

impl MemorySink {
    pub fn runs(&self) -> Vec<Vec<Group>> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl GroupSink for MemorySink {
    fn persist(&mut self, groups: &[Group]) -> std::io::Result<()> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(groups.to_vec());
        Ok(())
    }
}
