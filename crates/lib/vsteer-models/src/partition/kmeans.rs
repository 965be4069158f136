use log::{debug, trace};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_pcg::Pcg64Mcg;
use serde::Deserialize;
use thiserror::Error;

use vsteer_core::model::{Model, ModelSettings};

use crate::partition::{Group, GroupSummary, Partition};
use crate::telemetry::TelemetryRecord;

type Feature = [f64; 4];

#[derive(Deserialize, Debug, Clone)]
pub struct KMeansSettings {
    pub group_count: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_restarts")]
    pub restarts: u32,
    #[serde(default)]
    pub seed: u64,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_epsilon() -> f64 {
    1.0
}

fn default_restarts() -> u32 {
    3
}

impl ModelSettings for KMeansSettings {}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PartitionError {
    #[error("cannot split {records} records into {groups} groups")]
    NotEnoughRecords { records: usize, groups: usize },
    #[error("group count must be at least one")]
    NoGroups,
}

/// k-means over the features `[x, y, speed, agent id]` of every record.
///
/// Each restart seeds its centroids with k-means++ and runs Lloyd iterations until either the
/// iteration cap is hit or no centroid moves by `epsilon` or more. Restart `r` draws from its
/// own generator seeded with `seed + r`, so a run with several restarts always includes the
/// single-restart result and keeps the most compact one seen.
#[derive(Debug, Clone)]
pub struct Partitioner {
    settings: KMeansSettings,
}

impl Model for Partitioner {
    type Settings = KMeansSettings;

    fn with_settings(settings: &KMeansSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }
}

struct Attempt {
    centroids: Vec<Feature>,
    labels: Vec<usize>,
    compactness: f64,
}

impl Partitioner {
    pub fn group_count(&self) -> usize {
        self.settings.group_count
    }

    pub fn partition(&self, records: &[TelemetryRecord]) -> Result<Partition, PartitionError> {
        let k = self.settings.group_count;
        if k == 0 {
            return Err(PartitionError::NoGroups);
        }
        if records.len() < k {
            return Err(PartitionError::NotEnoughRecords {
                records: records.len(),
                groups: k,
            });
        }

        let points: Vec<Feature> = records.iter().map(TelemetryRecord::features).collect();
        let mut best: Option<Attempt> = None;
        for restart in 0..self.settings.restarts.max(1) {
            let mut rng = restart_rng(self.settings.seed, restart as usize);
            let attempt = self.attempt(&points, &mut rng);
            debug!(
                "Restart {} finished with compactness {}",
                restart, attempt.compactness
            );
            match &best {
                Some(current) if attempt.compactness >= current.compactness => {}
                _ => best = Some(attempt),
            }
        }

        let Some(best) = best else {
            return Err(PartitionError::NoGroups);
        };
        let mut groups: Vec<Group> = (0..k)
            .map(|label| Group {
                label,
                records: Vec::new(),
            })
            .collect();
        for (record, label) in records.iter().zip(best.labels.iter()) {
            groups[*label].records.push(*record);
        }
        Ok(Partition {
            groups,
            summaries: best.centroids.into_iter().map(GroupSummary::from).collect(),
            compactness: best.compactness,
        })
    }

    fn attempt(&self, points: &[Feature], rng: &mut Pcg64Mcg) -> Attempt {
        let k = self.settings.group_count;
        let mut centroids = seed_centroids(points, k, rng);
        let mut labels = vec![0usize; points.len()];

        for iteration in 0..self.settings.max_iterations {
            assign(points, &centroids, &mut labels);
            let updated = update_centroids(points, &labels, &centroids);
            let shift = centroids
                .iter()
                .zip(updated.iter())
                .map(|(old, new)| squared_distance(old, new).sqrt())
                .fold(0.0, f64::max);
            centroids = updated;
            trace!("Iteration {} moved centroids by at most {}", iteration, shift);
            if shift < self.settings.epsilon {
                break;
            }
        }

        let compactness = assign(points, &centroids, &mut labels);
        Attempt {
            centroids,
            labels,
            compactness,
        }
    }
}

/// Every restart gets its own stream: the seed fills the upper half of the state and the
/// restart index sits above the low bit, which the generator forces to one.
fn restart_rng(seed: u64, restart: usize) -> Pcg64Mcg {
    Pcg64Mcg::new(((seed as u128) << 64) | ((restart as u128) << 1))
}

/// k-means++: the first centroid is uniform, every next one is drawn with probability
/// proportional to the squared distance to the closest centroid chosen so far.
fn seed_centroids(points: &[Feature], k: usize, rng: &mut Pcg64Mcg) -> Vec<Feature> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);
    let mut closest: Vec<f64> = points
        .iter()
        .map(|point| squared_distance(point, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let next = match WeightedIndex::new(&closest) {
            Ok(weights) => weights.sample(rng),
            // Every point already coincides with a centroid.
            Err(_) => rng.gen_range(0..points.len()),
        };
        let centroid = points[next];
        for (distance, point) in closest.iter_mut().zip(points.iter()) {
            *distance = distance.min(squared_distance(point, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

/// Labels every point with its nearest centroid, first centroid on ties. Returns the sum of
/// squared distances.
fn assign(points: &[Feature], centroids: &[Feature], labels: &mut [usize]) -> f64 {
    let mut compactness = 0.0;
    for (point, label) in points.iter().zip(labels.iter_mut()) {
        let (nearest, distance) = nearest(point, centroids);
        *label = nearest;
        compactness += distance;
    }
    compactness
}

fn nearest(point: &Feature, centroids: &[Feature]) -> (usize, f64) {
    let mut found = (0, f64::INFINITY);
    for (idx, centroid) in centroids.iter().enumerate() {
        let distance = squared_distance(point, centroid);
        if distance < found.1 {
            found = (idx, distance);
        }
    }
    found
}

/// Mean of every cluster. A cluster that lost all its points takes over the point farthest
/// from its current centroid.
fn update_centroids(points: &[Feature], labels: &[usize], previous: &[Feature]) -> Vec<Feature> {
    let k = previous.len();
    let mut sums = vec![[0.0; 4]; k];
    let mut counts = vec![0usize; k];
    for (point, label) in points.iter().zip(labels.iter()) {
        counts[*label] += 1;
        for (sum, value) in sums[*label].iter_mut().zip(point.iter()) {
            *sum += value;
        }
    }

    let mut centroids: Vec<Feature> = sums
        .into_iter()
        .zip(counts.iter())
        .zip(previous.iter())
        .map(|((sum, count), old)| {
            if *count == 0 {
                *old
            } else {
                sum.map(|value| value / *count as f64)
            }
        })
        .collect();

    let mut taken: Vec<usize> = Vec::new();
    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        let farthest = points
            .iter()
            .enumerate()
            .filter(|(idx, _)| !taken.contains(idx))
            .map(|(idx, point)| (idx, squared_distance(point, &centroids[labels[idx]])))
            .fold(None, |acc: Option<(usize, f64)>, (idx, distance)| match acc {
                Some((_, max)) if distance <= max => acc,
                _ => Some((idx, distance)),
            });
        if let Some((idx, _)) = farthest {
            taken.push(idx);
            centroids[cluster] = points[idx];
        }
    }
    centroids
}

fn squared_distance(a: &Feature, b: &Feature) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsteer_core::agent::AgentId;

    fn record(x: f64, y: f64, id: u32) -> TelemetryRecord {
        TelemetryRecord::builder()
            .position_x(x)
            .position_y(y)
            .speed(20.0)
            .agent_id(AgentId::from(id))
            .build()
    }

    fn settings(group_count: usize) -> KMeansSettings {
        KMeansSettings {
            group_count,
            max_iterations: 10,
            epsilon: 1.0,
            restarts: 3,
            seed: 7,
        }
    }

    #[test]
    fn consecutive_restarts_seed_different_centroids() {
        let points: Vec<Feature> = (0..40u32)
            .map(|i| {
                let x = ((i * 37) % 101) as f64 * 11.0;
                let y = ((i * 53) % 67) as f64 * 7.0;
                record(x, y, i).features()
            })
            .collect();
        for seed in [7u64, 8u64] {
            let seeds: Vec<Vec<Feature>> = (0..3)
                .map(|restart| seed_centroids(&points, 4, &mut restart_rng(seed, restart)))
                .collect();
            assert_ne!(seeds[0], seeds[1], "seed {}", seed);
            assert_ne!(seeds[1], seeds[2], "seed {}", seed);
        }
    }

    #[test]
    fn first_restart_is_reproducible() {
        let points: Vec<Feature> = (0..20u32)
            .map(|i| record(i as f64 * 13.0, (i % 4) as f64 * 50.0, i).features())
            .collect();
        assert_eq!(
            seed_centroids(&points, 3, &mut restart_rng(0, 0)),
            seed_centroids(&points, 3, &mut restart_rng(0, 0))
        );
    }

    #[test]
    fn fewer_records_than_groups_is_an_error() {
        let partitioner = Partitioner::with_settings(&settings(4));
        let records = vec![record(0.0, 0.0, 1), record(1.0, 0.0, 2)];
        assert_eq!(
            partitioner.partition(&records),
            Err(PartitionError::NotEnoughRecords {
                records: 2,
                groups: 4
            })
        );
    }

    #[test]
    fn separated_blobs_land_in_separate_groups() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record(i as f64, 0.0, 1));
            records.push(record(1000.0 + i as f64, 0.0, 1));
        }
        let partition = Partitioner::with_settings(&settings(2))
            .partition(&records)
            .expect("enough records");
        let sizes: Vec<usize> = partition.groups.iter().map(|g| g.records.len()).collect();
        assert_eq!(sizes, vec![5, 5]);
        for group in partition.groups.iter() {
            let first = group.records[0].position_x < 500.0;
            assert!(group
                .records
                .iter()
                .all(|r| (r.position_x < 500.0) == first));
        }
    }

    #[test]
    fn identical_points_still_yield_every_group() {
        let records: Vec<TelemetryRecord> = (0..6).map(|_| record(3.0, 3.0, 9)).collect();
        let partition = Partitioner::with_settings(&settings(4))
            .partition(&records)
            .expect("enough records");
        assert_eq!(partition.groups.len(), 4);
        assert_eq!(partition.summaries.len(), 4);
        assert_eq!(partition.record_count(), 6);
        assert_eq!(partition.compactness, 0.0);
    }

    #[test]
    fn records_keep_the_reporting_agent() {
        let records: Vec<TelemetryRecord> =
            (0..8).map(|i| record(i as f64 * 10.0, 0.0, 100 + i)).collect();
        let partition = Partitioner::with_settings(&settings(3))
            .partition(&records)
            .expect("enough records");
        let mut ids: Vec<u32> = partition
            .groups
            .iter()
            .flat_map(|g| g.records.iter().map(|r| r.agent_id.as_u32()))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (100..108).collect::<Vec<u32>>());
    }
}
