use std::fs;
use std::path::{Path, PathBuf};

use arrow::datatypes::Schema;
use log::debug;
use serde::Deserialize;

use vsteer_core::bucket::TimeMS;

use crate::tables::rx::RxTraceWriter;
use crate::writer::OutputError;

#[derive(Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputType {
    RxTrace,
}

#[derive(Deserialize, Debug, Clone)]
pub struct OutputSettings {
    pub output_interval: TimeMS,
    pub output_path: String,
    #[serde(default)]
    pub outputs: Vec<Outputs>,
    pub scenario_id: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Outputs {
    pub output_type: OutputType,
    pub output_filename: String,
}

pub trait ResultWriter {
    fn schema() -> Schema;
    fn write_to_file(&mut self) -> Result<(), OutputError>;
    fn close_file(self) -> Result<(), OutputError>;
}

/// The tables a run writes. Tables live under `<output_path>/<scenario_id>/files` and the
/// group listings under `<output_path>/<scenario_id>/groups`.
#[derive(Debug)]
pub struct Results {
    pub rx_trace: Option<RxTraceWriter>,
    pub groups_path: PathBuf,
}

impl Results {
    pub fn new(config_path: &Path, output_settings: &OutputSettings) -> Result<Self, OutputError> {
        let scenario_path = config_path
            .join(&output_settings.output_path)
            .join(output_settings.scenario_id.to_string());
        let output_path = scenario_path.join("files");
        if !output_path.exists() {
            fs::create_dir_all(&output_path)?;
        }
        let groups_path = scenario_path.join("groups");
        debug!("Writing tables to {}", output_path.display());

        let rx_trace = match output_settings
            .outputs
            .iter()
            .filter(|output| output.output_type == OutputType::RxTrace)
            .last()
        {
            Some(settings) => Some(RxTraceWriter::new(
                &output_path.join(&settings.output_filename),
            )?),
            None => None,
        };
        Ok(Self {
            rx_trace,
            groups_path,
        })
    }

    pub fn write_to_file(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.rx_trace {
            writer.write_to_file()?;
        }
        Ok(())
    }

    pub fn close_files(self) -> Result<(), OutputError> {
        if let Some(writer) = self.rx_trace {
            writer.close_file()?;
        }
        Ok(())
    }
}
