use serde::Deserialize;
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Position and planar velocity of an agent at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, TypedBuilder)]
pub struct Kinematics {
    pub pos: Point2D,
    #[builder(default)]
    pub velocity: Point2D,
}

impl Kinematics {
    pub fn speed(&self) -> f64 {
        self.velocity.x.hypot(self.velocity.y)
    }
}

/// Where the reporters read the current position and velocity of an agent from.
pub trait MobilitySource {
    fn kinematics_of(&self, agent_id: AgentId, at: TimeMS) -> Option<Kinematics>;
}

/// Straight-line motion from a start position with a fixed velocity.
#[derive(Clone, Copy, Debug, Default, PartialEq, TypedBuilder)]
pub struct ConstantVelocity {
    pub start: Point2D,
    #[builder(default)]
    pub velocity: Point2D,
}

impl ConstantVelocity {
    pub fn at(&self, time: TimeMS) -> Kinematics {
        let elapsed = time.as_secs_f64();
        Kinematics {
            pos: Point2D::new(
                self.start.x + self.velocity.x * elapsed,
                self.start.y + self.velocity.y * elapsed,
            ),
            velocity: self.velocity,
        }
    }
}

/// Index of the collector closest to `position`. Ties go to the first collector encountered.
pub fn nearest_collector(position: &Point2D, collectors: &[Point2D]) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;
    for (idx, collector) in collectors.iter().enumerate() {
        let distance = position.distance(collector);
        match nearest {
            Some((_, min_distance)) if distance >= min_distance => {}
            _ => nearest = Some((idx, distance)),
        }
    }
    nearest.map(|(idx, _)| idx)
}
