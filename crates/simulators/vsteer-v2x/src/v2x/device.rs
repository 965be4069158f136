use log::{debug, error, warn};
use typed_builder::TypedBuilder;

use vsteer_core::agent::{Activatable, Agent, AgentId, AgentKind, AgentOrder, Orderable};
use vsteer_core::bucket::TimeMS;
use vsteer_models::device::aggregator::Aggregator;
use vsteer_models::device::power::PowerManager;
use vsteer_models::device::reporter::Reporter;
use vsteer_models::net::datagram::LossySocket;

use crate::v2x::bucket::DeviceBucket;

#[derive(Clone, Copy, Debug, Default, TypedBuilder)]
pub struct DeviceInfo {
    pub id: AgentId,
    pub device_type: AgentKind,
    pub agent_order: AgentOrder,
}

#[derive(Debug)]
pub enum DeviceRole {
    Vehicle(Reporter<LossySocket>),
    Collector(Aggregator<LossySocket>),
}

#[derive(Debug, TypedBuilder)]
pub struct Device {
    pub device_info: DeviceInfo,
    pub power: PowerManager,
    pub role: DeviceRole,
    #[builder(default)]
    pub step: TimeMS,
}

impl Device {
    fn stop_if_due(&mut self, bucket: &mut DeviceBucket) {
        if self.power.is_time_to_off(bucket.step) {
            self.deactivate(bucket);
        }
    }
}

impl Activatable<DeviceBucket> for Device {
    fn activate(&mut self, bucket: &mut DeviceBucket) {
        debug!("Starting agent: {}", self.device_info.id);
        let start = self.power.time_to_on();
        self.power.power_on();
        if let DeviceRole::Vehicle(reporter) = &mut self.role {
            let outcome = bucket
                .bind(self.device_info.id)
                .and_then(|socket| reporter.activate(socket, start));
            if let Err(e) = outcome {
                error!("Vehicle {} could not start: {}", self.device_info.id, e);
                self.power.power_off();
            }
        }
    }

    fn deactivate(&mut self, bucket: &mut DeviceBucket) {
        if !self.power.is_on() {
            return;
        }
        debug!("Stopping agent: {}", self.device_info.id);
        self.power.power_off();
        match &mut self.role {
            DeviceRole::Vehicle(reporter) => reporter.deactivate(),
            DeviceRole::Collector(aggregator) => bucket.collector_stopped(aggregator),
        }
    }

    fn is_deactivated(&self) -> bool {
        !self.power.is_on()
    }

    fn has_activation(&self) -> bool {
        self.power.has_next_time_to_on()
    }

    fn time_of_activation(&mut self) -> TimeMS {
        self.power.time_to_on()
    }
}

impl Orderable for Device {
    fn order(&self) -> AgentOrder {
        self.device_info.agent_order
    }
}

impl Agent<DeviceBucket> for Device {
    fn id(&self) -> AgentId {
        self.device_info.id
    }

    /// Vehicles report in stage one so that collectors see the reports in stage two.
    fn stage_one(&mut self, bucket: &mut DeviceBucket) {
        self.step = bucket.step;
        let DeviceRole::Vehicle(reporter) = &mut self.role else {
            return;
        };
        let Some(kinematics) = bucket.kinematics_of(self.device_info.id) else {
            warn!("No position known for vehicle {}", self.device_info.id);
            return;
        };
        if let Err(e) = reporter.poll(self.step, &kinematics) {
            warn!("Vehicle {} failed to report: {}", self.device_info.id, e);
        }
    }

    fn stage_two_reverse(&mut self, bucket: &mut DeviceBucket) {
        if let DeviceRole::Collector(aggregator) = &mut self.role {
            let received = aggregator.receive();
            bucket.record_rx(self.device_info.id, &received);
        }
        self.stop_if_due(bucket);
    }
}
