use std::fmt::{Display, Formatter};

use crate::telemetry::TelemetryRecord;

pub mod kmeans;

/// Records sharing one cluster label.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    pub label: usize,
    pub records: Vec<TelemetryRecord>,
}

/// Centroid of one group. The representative ID is the centroid's coordinate on the agent
/// ID axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupSummary {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub centroid_speed: f64,
    pub representative_id: f64,
}

impl Display for GroupSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}) with node ID: {}",
            self.centroid_x, self.centroid_y, self.centroid_speed, self.representative_id
        )
    }
}

impl From<[f64; 4]> for GroupSummary {
    fn from(centroid: [f64; 4]) -> Self {
        Self {
            centroid_x: centroid[0],
            centroid_y: centroid[1],
            centroid_speed: centroid[2],
            representative_id: centroid[3],
        }
    }
}

/// Outcome of one clustering run, kept apart from the raw telemetry it was computed from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Partition {
    pub groups: Vec<Group>,
    pub summaries: Vec<GroupSummary>,
    /// Sum of squared distances between every record and its group's centroid.
    pub compactness: f64,
}

impl Partition {
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }
}

/// Durable storage for group membership.
pub trait GroupSink {
    fn persist(&mut self, groups: &[Group]) -> std::io::Result<()>;
}
