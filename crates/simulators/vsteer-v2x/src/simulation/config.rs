use std::path::PathBuf;

use serde::Deserialize;

use vsteer_core::bucket::TimeMS;
use vsteer_models::control::controller::ControllerSettings;
use vsteer_models::partition::kmeans::KMeansSettings;
use vsteer_output::logger::LogSettings;
use vsteer_output::result::OutputSettings;

#[derive(Deserialize, Debug, Clone)]
pub struct BaseConfig {
    pub simulation_settings: SimSettings,
    pub deployment: DeploymentSettings,
    pub telemetry_settings: TelemetrySettings,
    pub clustering_settings: KMeansSettings,
    pub control_settings: ControlSettings,
    pub log_settings: LogSettings,
    pub output_settings: OutputSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SimSettings {
    pub scenario: String,
    pub duration: TimeMS,
    pub step_size: TimeMS,
    pub seed: u64,
}

/// Vehicles start on a line along x at `i * vehicle_spacing` and drive with a constant
/// velocity. Collectors are spread evenly over the occupied stretch of road.
#[derive(Deserialize, Debug, Clone)]
pub struct DeploymentSettings {
    pub vehicle_count: u32,
    pub collector_count: u32,
    #[serde(default = "default_spacing")]
    pub vehicle_spacing: f64,
    #[serde(default = "default_velocity")]
    pub vehicle_velocity: f64,
    #[serde(default = "default_offset")]
    pub collector_offset_y: f64,
}

fn default_spacing() -> f64 {
    9.0
}

fn default_velocity() -> f64 {
    20.0
}

fn default_offset() -> f64 {
    20.0
}

#[derive(Deserialize, Debug, Clone)]
pub struct TelemetrySettings {
    pub report_interval: TimeMS,
    /// Reporters and collectors stop this long before the end of the run.
    pub stop_margin: TimeMS,
    #[serde(default)]
    pub loss_probability: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ControlSettings {
    pub switch_dp_id: u64,
    /// Port on which traffic addressed to the controller enters the switch.
    pub uplink_port: u32,
    #[serde(flatten)]
    pub controller: ControllerSettings,
}

pub struct BaseConfigReader {
    file_path: PathBuf,
}

impl BaseConfigReader {
    pub fn new(file_name: &str) -> Self {
        let file_path = PathBuf::from(file_name);
        Self { file_path }
    }

    pub fn parse(&self) -> Result<BaseConfig, Box<dyn std::error::Error>> {
        let parsing_result = std::fs::read_to_string(&self.file_path)?;
        let config: BaseConfig = toml::from_str(&parsing_result)?;
        Ok(config)
    }
}
