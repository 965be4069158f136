use log::{debug, error, info};
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::{Bucket, TimeMS};
use vsteer_core::model::BucketModel;
use vsteer_core::radio::TransportError;
use vsteer_models::device::aggregator::Aggregator;
use vsteer_models::device::mobility::{Kinematics, MobilitySource};
use vsteer_models::epoch::barrier::EpochBarrier;
use vsteer_models::epoch::phase::ClusteringPhase;
use vsteer_models::net::datagram::{LossyNetwork, LossySocket};
use vsteer_models::partition::Partition;
use vsteer_models::telemetry::TelemetryRecord;
use vsteer_output::result::Results;

use crate::v2x::space::Mapper;
use crate::v2x::switch::OfSwitch;

pub type V2XPhase = ClusteringPhase<LossySocket>;
pub type V2XBarrier = EpochBarrier<V2XPhase>;

#[derive(TypedBuilder)]
pub struct BucketModels {
    pub network: LossyNetwork,
    pub results: Results,
    pub mapper: Mapper,
    pub barrier: V2XBarrier,
    pub switch: OfSwitch,
}

#[derive(TypedBuilder)]
pub struct DeviceBucket {
    pub models: BucketModels,
    #[builder(default)]
    pub step: TimeMS,
    #[builder(default)]
    pub partition: Option<Partition>,
}

impl DeviceBucket {
    pub fn kinematics_of(&self, agent_id: AgentId) -> Option<Kinematics> {
        self.models.mapper.kinematics_of(agent_id, self.step)
    }

    pub fn bind(&self, agent_id: AgentId) -> Result<LossySocket, TransportError> {
        self.models.network.bind(agent_id)
    }

    pub fn record_rx(&mut self, collector_id: AgentId, records: &[TelemetryRecord]) {
        if let Some(writer) = &mut self.models.results.rx_trace {
            for record in records.iter() {
                writer.add_data(self.step, collector_id, record);
            }
        }
    }

    /// Hands the buffer of a stopping collector to the barrier and keeps the clustering
    /// result if this was the last collector.
    pub fn collector_stopped(&mut self, aggregator: &mut Aggregator<LossySocket>) {
        let Some(outcome) = aggregator.deactivate(&self.models.barrier) else {
            return;
        };
        match outcome {
            Ok(partition) => {
                info!(
                    "Clustering of {} records finished at {} with compactness {}",
                    partition.record_count(),
                    self.step,
                    partition.compactness
                );
                self.partition = Some(partition);
            }
            Err(e) => error!("Clustering phase at {} failed: {}", self.step, e),
        }
    }
}

impl Bucket for DeviceBucket {
    fn initialize(&mut self, step: TimeMS) {
        self.step = step;
        self.models.mapper.init(step);
        self.models.switch.connect();
    }

    fn before_agents(&mut self, step: TimeMS) {
        self.step = step;
        self.models.mapper.before_agent_step(step);
    }

    fn after_agents(&mut self) {
        self.models.switch.process(self.step);
    }

    fn stream_output(&mut self) {
        debug!("Writing output at {}", self.step);
        if let Err(e) = self.models.results.write_to_file() {
            error!("Writing output at {} failed: {}", self.step, e);
        }
    }

    fn terminate(self) {
        let stats = self.models.network.stats();
        info!(
            "Datagrams sent {}, delivered {}, lost {}",
            stats.sent, stats.delivered, stats.lost
        );
        let switch = &self.models.switch;
        info!(
            "Switch {} saw {} packet-ins, {} rejected, {} rules installed",
            switch.context().dp_id,
            switch.packet_ins(),
            switch.rejected(),
            switch.datapath().rules().len()
        );
        for (port, count) in switch.datapath().tx_counts() {
            info!("Port {} sent {} frames", port, count);
        }
        if self.partition.is_none() {
            info!(
                "Clustering did not run, {} of {} collectors stopped",
                self.models.barrier.completed(),
                self.models.barrier.total()
            );
        }
        if let Err(e) = self.models.results.close_files() {
            error!("Closing output files failed: {}", e);
        }
    }
}
