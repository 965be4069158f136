use log::{debug, warn};
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::radio::DatagramSocket;

use crate::epoch::barrier::{EpochBarrier, EpochHook};
use crate::telemetry::TelemetryRecord;

/// Collects the telemetry sent to one roadside unit during its epoch.
///
/// Records are buffered in arrival order. Datagrams that are not exactly one record are
/// dropped and counted. On deactivation the socket is closed and the buffer is handed to the
/// epoch barrier; the last collector to do so runs the clustering phase.
#[derive(Debug, TypedBuilder)]
pub struct Aggregator<S: DatagramSocket> {
    collector_id: AgentId,
    socket: S,
    #[builder(default)]
    buffer: Vec<TelemetryRecord>,
    #[builder(default)]
    decode_errors: u64,
    #[builder(default)]
    deactivated: bool,
}

impl<S: DatagramSocket> Aggregator<S> {
    pub fn collector_id(&self) -> AgentId {
        self.collector_id
    }

    pub fn buffered(&self) -> &[TelemetryRecord] {
        &self.buffer
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    pub fn is_deactivated(&self) -> bool {
        self.deactivated
    }

    /// Drains every datagram waiting on the socket. Returns the records accepted in this call.
    pub fn receive(&mut self) -> Vec<TelemetryRecord> {
        let mut accepted = Vec::new();
        if self.deactivated {
            return accepted;
        }
        while let Some(datagram) = self.socket.recv() {
            match TelemetryRecord::decode(&datagram.payload) {
                Ok(record) => {
                    self.buffer.push(record);
                    accepted.push(record);
                }
                Err(e) => {
                    self.decode_errors += 1;
                    warn!(
                        "Collector {} dropped datagram from {}: {}",
                        self.collector_id, datagram.from, e
                    );
                }
            }
        }
        accepted
    }

    /// Stops receiving and contributes the buffer to the barrier. Only the first call has an
    /// effect; the return value is the phase output when this collector completed the run.
    pub fn deactivate<H: EpochHook>(&mut self, barrier: &EpochBarrier<H>) -> Option<H::Output> {
        if self.deactivated {
            return None;
        }
        self.deactivated = true;
        self.socket.close();
        let buffer = std::mem::take(&mut self.buffer);
        debug!(
            "Collector {} stopping with {} records and {} decode errors",
            self.collector_id,
            buffer.len(),
            self.decode_errors
        );
        barrier.contribute(buffer)
    }
}
