use log::{error, info};
use thiserror::Error;

use vsteer_core::radio::{DatagramSocket, TransportError};

use crate::control::advisor::FlowAdvisor;
use crate::epoch::barrier::{EpochHook, RawTelemetry};
use crate::partition::kmeans::{PartitionError, Partitioner};
use crate::partition::{GroupSink, Partition};
use crate::telemetry::TelemetryRecord;

#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("clustering failed: {0}")]
    Partition(#[from] PartitionError),
    #[error("persisting groups failed: {0}")]
    Persist(#[from] std::io::Error),
    #[error("advising the control plane failed: {0}")]
    Advise(#[from] TransportError),
}

/// The global step that runs once all collectors stopped: cluster the collected telemetry,
/// persist group membership, then push the summaries to the control plane.
pub struct ClusteringPhase<S: DatagramSocket> {
    partitioner: Partitioner,
    advisor: FlowAdvisor<S>,
    sink: Box<dyn GroupSink + Send>,
    runs: u32,
}

impl<S: DatagramSocket> ClusteringPhase<S> {
    pub fn new(
        partitioner: Partitioner,
        advisor: FlowAdvisor<S>,
        sink: Box<dyn GroupSink + Send>,
    ) -> Self {
        Self {
            partitioner,
            advisor,
            sink,
            runs: 0,
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }

    fn run(&mut self, raw: RawTelemetry) -> Result<Partition, PhaseError> {
        let records: Vec<TelemetryRecord> = raw.into_iter().flatten().collect();
        info!("Clustering started over {} records", records.len());
        let partition = self.partitioner.partition(&records)?;
        info!("Clustering completed");

        for (idx, summary) in partition.summaries.iter().enumerate() {
            info!("Cluster {}: {}", idx + 1, summary);
        }
        self.sink.persist(&partition.groups)?;
        self.advisor.advise(&partition.summaries)?;
        Ok(partition)
    }
}

impl<S: DatagramSocket> EpochHook for ClusteringPhase<S> {
    type Output = Result<Partition, PhaseError>;

    fn on_epoch_complete(&mut self, raw: RawTelemetry) -> Self::Output {
        self.runs += 1;
        let outcome = self.run(raw);
        if let Err(e) = &outcome {
            error!("Clustering phase failed: {}", e);
        }
        outcome
    }
}
