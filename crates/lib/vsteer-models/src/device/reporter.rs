use log::{debug, trace};
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::radio::{DatagramSocket, TransportError};

use crate::device::mobility::Kinematics;
use crate::telemetry::TelemetryRecord;

/// Periodically reports the kinematic state of one vehicle to its collector.
///
/// The collector is fixed when the reporter is built. Once activated, the first report is due
/// immediately and every report re-arms the next one `interval` later. Deactivation cancels
/// the pending report and closes the socket.
#[derive(Debug, TypedBuilder)]
pub struct Reporter<S: DatagramSocket> {
    agent_id: AgentId,
    collector: AgentId,
    interval: TimeMS,
    #[builder(default)]
    socket: Option<S>,
    #[builder(default)]
    next_report: Option<TimeMS>,
    #[builder(default)]
    sent: u64,
}

impl<S: DatagramSocket> Reporter<S> {
    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn collector(&self) -> AgentId {
        self.collector
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn next_report(&self) -> Option<TimeMS> {
        self.next_report
    }

    pub fn is_active(&self) -> bool {
        self.socket.is_some()
    }

    /// Connects the socket to the collector and schedules the first report at `now`.
    pub fn activate(&mut self, mut socket: S, now: TimeMS) -> Result<(), TransportError> {
        socket.connect(self.collector)?;
        debug!(
            "Reporter {} activated towards collector {} at {}",
            self.agent_id, self.collector, now
        );
        self.socket = Some(socket);
        self.next_report = Some(now);
        Ok(())
    }

    /// Sends the report if one is due and re-arms the timer. Returns the record that went out.
    pub fn poll(
        &mut self,
        now: TimeMS,
        kinematics: &Kinematics,
    ) -> Result<Option<TelemetryRecord>, TransportError> {
        let (Some(socket), Some(due)) = (self.socket.as_mut(), self.next_report) else {
            return Ok(None);
        };
        if now < due {
            return Ok(None);
        }

        let record = TelemetryRecord::builder()
            .position_x(kinematics.pos.x)
            .position_y(kinematics.pos.y)
            .speed(kinematics.speed())
            .agent_id(self.agent_id)
            .build();
        socket.send(&record.encode())?;
        self.sent += 1;
        self.next_report = Some(due + self.interval);
        trace!("Reporter {} sent {} at {}", self.agent_id, record, now);
        Ok(Some(record))
    }

    /// Cancels the pending report and releases the socket. Calling it again does nothing.
    pub fn deactivate(&mut self) {
        self.next_report = None;
        if let Some(mut socket) = self.socket.take() {
            socket.close();
            debug!(
                "Reporter {} deactivated after {} reports",
                self.agent_id, self.sent
            );
        }
    }
}
