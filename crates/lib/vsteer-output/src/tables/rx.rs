use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, RecordBatch, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_models::telemetry::TelemetryRecord;

use crate::result::ResultWriter;
use crate::writer::{OutputError, WriterType};

/// Every telemetry record accepted by a collector, with the time it arrived.
#[derive(Debug)]
pub struct RxTraceWriter {
    time_step: Vec<u64>,
    collector_id: Vec<u32>,
    agent_id: Vec<u32>,
    position_x: Vec<f64>,
    position_y: Vec<f64>,
    speed: Vec<f64>,
    to_output: WriterType,
}

impl RxTraceWriter {
    pub fn new(output_file: &Path) -> Result<Self, OutputError> {
        Ok(Self {
            to_output: WriterType::new(output_file, Self::schema())?,
            time_step: Vec::new(),
            collector_id: Vec::new(),
            agent_id: Vec::new(),
            position_x: Vec::new(),
            position_y: Vec::new(),
            speed: Vec::new(),
        })
    }

    pub fn add_data(&mut self, time_step: TimeMS, collector_id: AgentId, record: &TelemetryRecord) {
        self.time_step.push(time_step.as_u64());
        self.collector_id.push(collector_id.as_u32());
        self.agent_id.push(record.agent_id.as_u32());
        self.position_x.push(record.position_x);
        self.position_y.push(record.position_y);
        self.speed.push(record.speed);
    }

    pub fn pending(&self) -> usize {
        self.time_step.len()
    }
}

impl ResultWriter for RxTraceWriter {
    fn schema() -> Schema {
        let time_ms = Field::new("time_step", DataType::UInt64, false);
        let collector_id = Field::new("collector_id", DataType::UInt32, false);
        let agent_id = Field::new("agent_id", DataType::UInt32, false);
        let position_x = Field::new("position_x", DataType::Float64, false);
        let position_y = Field::new("position_y", DataType::Float64, false);
        let speed = Field::new("speed", DataType::Float64, false);
        Schema::new(vec![
            time_ms,
            collector_id,
            agent_id,
            position_x,
            position_y,
            speed,
        ])
    }

    fn write_to_file(&mut self) -> Result<(), OutputError> {
        if self.time_step.is_empty() {
            return Ok(());
        }
        let record_batch = RecordBatch::try_from_iter(vec![
            (
                "time_step",
                Arc::new(UInt64Array::from(std::mem::take(&mut self.time_step))) as ArrayRef,
            ),
            (
                "collector_id",
                Arc::new(UInt32Array::from(std::mem::take(&mut self.collector_id))) as ArrayRef,
            ),
            (
                "agent_id",
                Arc::new(UInt32Array::from(std::mem::take(&mut self.agent_id))) as ArrayRef,
            ),
            (
                "position_x",
                Arc::new(Float64Array::from(std::mem::take(&mut self.position_x))) as ArrayRef,
            ),
            (
                "position_y",
                Arc::new(Float64Array::from(std::mem::take(&mut self.position_y))) as ArrayRef,
            ),
            (
                "speed",
                Arc::new(Float64Array::from(std::mem::take(&mut self.speed))) as ArrayRef,
            ),
        ])?;
        self.to_output.write(&record_batch)
    }

    fn close_file(mut self) -> Result<(), OutputError> {
        self.write_to_file()?;
        self.to_output.close()
    }
}
