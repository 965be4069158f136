use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use vsteer_core::agent::{AgentId, AgentKind, AgentOrder};
use vsteer_core::bucket::TimeMS;
use vsteer_core::model::Model;
use vsteer_core::radio::TransportError;
use vsteer_core::scheduler::DefaultScheduler;
use vsteer_models::control::advisor::FlowAdvisor;
use vsteer_models::control::controller::{FlowController, SwitchContext};
use vsteer_models::device::aggregator::Aggregator;
use vsteer_models::device::mobility::{nearest_collector, Point2D};
use vsteer_models::device::power::PowerManager;
use vsteer_models::device::reporter::Reporter;
use vsteer_models::epoch::barrier::EpochBarrier;
use vsteer_models::epoch::phase::ClusteringPhase;
use vsteer_models::net::datagram::{LossyNetwork, NetworkSettings};
use vsteer_models::partition::kmeans::Partitioner;
use vsteer_output::groups::GroupCsvWriter;
use vsteer_output::logger::{initiate_logger, LogError};
use vsteer_output::result::Results;
use vsteer_output::writer::OutputError;
use hashbrown::HashMap;

use crate::simulation::config::{BaseConfig, BaseConfigReader};
use crate::v2x::bucket::{BucketModels, DeviceBucket, V2XBarrier};
use crate::v2x::device::{Device, DeviceInfo, DeviceRole};
use crate::v2x::space::Mapper;
use crate::v2x::switch::{Datapath, OfSwitch};

pub type DScheduler = DefaultScheduler<Device, DeviceBucket>;

const VEHICLE_ORDER: u32 = 1;
const COLLECTOR_ORDER: u32 = 2;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration file {0} is not found")]
    MissingConfig(String),
    #[error("configuration file {path} is invalid: {reason}")]
    InvalidConfig { path: String, reason: String },
    #[error("deployment needs at least one collector")]
    NoCollectors,
    #[error("stop margin {margin} is not shorter than the run of {duration} ms")]
    StopMargin { margin: TimeMS, duration: TimeMS },
    #[error("step size must be positive")]
    ZeroStep,
    #[error("step size {step} is longer than the report interval {interval}")]
    StepExceedsInterval { step: TimeMS, interval: TimeMS },
    #[error(transparent)]
    Log(#[from] LogError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Node identities are handed out in creation order: vehicles, collectors, the switch and
/// finally the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeLayout {
    pub vehicle_count: u32,
    pub collector_count: u32,
}

impl NodeLayout {
    pub fn vehicle(&self, idx: u32) -> AgentId {
        AgentId::from(idx)
    }

    pub fn collector(&self, idx: u32) -> AgentId {
        AgentId::from(self.vehicle_count + idx)
    }

    pub fn switch(&self) -> AgentId {
        AgentId::from(self.vehicle_count + self.collector_count)
    }

    pub fn controller(&self) -> AgentId {
        AgentId::from(self.vehicle_count + self.collector_count + 1)
    }
}

pub struct SimulationBuilder {
    base_config: BaseConfig,
    config_path: PathBuf,
    network: LossyNetwork,
}

impl SimulationBuilder {
    pub(crate) fn new(base_config_file: &str) -> Result<Self, BuildError> {
        let config_file = Path::new(base_config_file);
        if !config_file.exists() {
            return Err(BuildError::MissingConfig(base_config_file.to_owned()));
        }
        let config_path = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base_config = BaseConfigReader::new(base_config_file)
            .parse()
            .map_err(|e| BuildError::InvalidConfig {
                path: base_config_file.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_config(base_config, config_path))
    }

    pub(crate) fn with_config(base_config: BaseConfig, config_path: PathBuf) -> Self {
        let network = LossyNetwork::with_settings(&NetworkSettings {
            loss_probability: base_config.telemetry_settings.loss_probability,
            seed: base_config.simulation_settings.seed,
        });
        Self {
            base_config,
            config_path,
            network,
        }
    }

    pub(crate) fn build(&mut self) -> Result<DScheduler, BuildError> {
        initiate_logger(
            &self.config_path,
            &self.base_config.log_settings,
            Some(self.base_config.output_settings.scenario_id),
        )?;
        self.build_without_logger()
    }

    pub(crate) fn build_without_logger(&mut self) -> Result<DScheduler, BuildError> {
        self.validate()?;
        info!("Building devices and device pools...");
        let mapper = self.build_mapper();
        let agent_map = self.build_agents(&mapper)?;
        let device_bucket = self.build_device_bucket(mapper)?;
        Ok(self.build_scheduler(agent_map, device_bucket))
    }

    pub(crate) fn layout(&self) -> NodeLayout {
        NodeLayout {
            vehicle_count: self.base_config.deployment.vehicle_count,
            collector_count: self.base_config.deployment.collector_count,
        }
    }

    pub(crate) fn network(&self) -> &LossyNetwork {
        &self.network
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.base_config.deployment.collector_count == 0 {
            return Err(BuildError::NoCollectors);
        }
        let step = self.step_size();
        if step == TimeMS::default() {
            return Err(BuildError::ZeroStep);
        }
        let interval = self.base_config.telemetry_settings.report_interval;
        if step > interval {
            return Err(BuildError::StepExceedsInterval { step, interval });
        }
        let margin = self.base_config.telemetry_settings.stop_margin;
        if margin >= self.duration() {
            return Err(BuildError::StopMargin {
                margin,
                duration: self.duration(),
            });
        }
        Ok(())
    }

    fn vehicle_start(&self, idx: u32) -> Point2D {
        Point2D::new(idx as f64 * self.base_config.deployment.vehicle_spacing, 0.0)
    }

    /// Collectors sit evenly spaced along the stretch occupied by the vehicles at the start,
    /// offset from the road.
    pub(crate) fn collector_positions(&self) -> Vec<Point2D> {
        let deployment = &self.base_config.deployment;
        let road_length = deployment.vehicle_count as f64 * deployment.vehicle_spacing;
        let spacing = road_length / (deployment.collector_count + 1) as f64;
        (0..deployment.collector_count)
            .map(|idx| Point2D::new((idx + 1) as f64 * spacing, deployment.collector_offset_y))
            .collect()
    }

    fn build_mapper(&self) -> Mapper {
        let layout = self.layout();
        let velocity = Point2D::new(self.base_config.deployment.vehicle_velocity, 0.0);
        let mut mapper = Mapper::default();
        for idx in 0..layout.vehicle_count {
            mapper.place(layout.vehicle(idx), self.vehicle_start(idx), velocity);
        }
        for (idx, position) in self.collector_positions().into_iter().enumerate() {
            mapper.place(layout.collector(idx as u32), position, Point2D::default());
        }
        mapper
    }

    fn build_agents(&mut self, mapper: &Mapper) -> Result<HashMap<AgentId, Device>, BuildError> {
        info!("Building devices...");
        let layout = self.layout();
        let collectors = self.collector_positions();
        let mut device_map = HashMap::new();

        for idx in 0..layout.collector_count {
            let collector_id = layout.collector(idx);
            let aggregator = Aggregator::builder()
                .collector_id(collector_id)
                .socket(self.network.bind(collector_id)?)
                .build();
            let device = self.build_device(
                collector_id,
                AgentKind::RSU,
                COLLECTOR_ORDER,
                DeviceRole::Collector(aggregator),
            );
            device_map.insert(collector_id, device);
        }

        for idx in 0..layout.vehicle_count {
            let vehicle_id = layout.vehicle(idx);
            let position = mapper
                .position_of(vehicle_id)
                .unwrap_or_else(|| self.vehicle_start(idx));
            let nearest = nearest_collector(&position, &collectors).unwrap_or_default();
            let reporter = Reporter::builder()
                .agent_id(vehicle_id)
                .collector(layout.collector(nearest as u32))
                .interval(self.base_config.telemetry_settings.report_interval)
                .build();
            let device = self.build_device(
                vehicle_id,
                AgentKind::Vehicle,
                VEHICLE_ORDER,
                DeviceRole::Vehicle(reporter),
            );
            device_map.insert(vehicle_id, device);
        }
        info!(
            "Built {} vehicles and {} collectors",
            layout.vehicle_count, layout.collector_count
        );
        Ok(device_map)
    }

    fn build_device(
        &self,
        device_id: AgentId,
        device_type: AgentKind,
        order: u32,
        role: DeviceRole,
    ) -> Device {
        let device_info = DeviceInfo::builder()
            .id(device_id)
            .device_type(device_type)
            .agent_order(AgentOrder::from(order))
            .build();
        let power = PowerManager::builder()
            .on_at(TimeMS::default())
            .off_at(self.duration() - self.base_config.telemetry_settings.stop_margin)
            .build();
        Device::builder()
            .device_info(device_info)
            .power(power)
            .role(role)
            .build()
    }

    fn build_barrier(&self, results: &Results) -> Result<V2XBarrier, BuildError> {
        let layout = self.layout();
        let advisor = FlowAdvisor::new(self.network.bind(layout.switch())?, layout.controller());
        let phase = ClusteringPhase::new(
            Partitioner::with_settings(&self.base_config.clustering_settings),
            advisor,
            Box::new(GroupCsvWriter::new(results.groups_path.clone())),
        );
        Ok(EpochBarrier::new(layout.collector_count, phase))
    }

    fn build_switch(&self) -> Result<OfSwitch, BuildError> {
        let control = &self.base_config.control_settings;
        Ok(OfSwitch::builder()
            .socket(self.network.bind(self.layout().controller())?)
            .controller(FlowController::with_settings(&control.controller))
            .datapath(Datapath::builder().dp_id(control.switch_dp_id).build())
            .context(SwitchContext::new(control.switch_dp_id))
            .uplink_port(control.uplink_port)
            .build())
    }

    fn build_device_bucket(&mut self, mapper: Mapper) -> Result<DeviceBucket, BuildError> {
        info!("Building device bucket...");
        let results = Results::new(&self.config_path, &self.base_config.output_settings)?;
        let models = BucketModels::builder()
            .network(self.network.clone())
            .barrier(self.build_barrier(&results)?)
            .switch(self.build_switch()?)
            .results(results)
            .mapper(mapper)
            .build();
        Ok(DeviceBucket::builder().models(models).build())
    }

    fn build_scheduler(
        &mut self,
        agent_map: HashMap<AgentId, Device>,
        device_bucket: DeviceBucket,
    ) -> DScheduler {
        info!("Building scheduler...");
        DefaultScheduler::builder()
            .duration(self.duration())
            .step_size(self.step_size())
            .agents(agent_map)
            .output_interval(self.output_interval())
            .bucket(device_bucket)
            .build()
    }

    fn output_interval(&self) -> TimeMS {
        self.base_config.output_settings.output_interval
    }

    fn duration(&self) -> TimeMS {
        self.base_config.simulation_settings.duration
    }

    fn step_size(&self) -> TimeMS {
        self.base_config.simulation_settings.step_size
    }
}
