use hashbrown::HashMap;
use log::trace;
use typed_builder::TypedBuilder;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::model::BucketModel;
use vsteer_models::device::mobility::{ConstantVelocity, Kinematics, MobilitySource, Point2D};

/// Motion of every placed node. Collectors and the network nodes are placed with zero
/// velocity.
#[derive(Clone, Debug, Default, TypedBuilder)]
pub struct Mapper {
    #[builder(default)]
    paths: HashMap<AgentId, ConstantVelocity>,
    #[builder(default)]
    step: TimeMS,
}

impl Mapper {
    pub fn place(&mut self, agent_id: AgentId, start: Point2D, velocity: Point2D) {
        self.paths.insert(
            agent_id,
            ConstantVelocity::builder()
                .start(start)
                .velocity(velocity)
                .build(),
        );
    }

    pub fn position_of(&self, agent_id: AgentId) -> Option<Point2D> {
        self.kinematics_of(agent_id, self.step).map(|state| state.pos)
    }
}

impl MobilitySource for Mapper {
    fn kinematics_of(&self, agent_id: AgentId, at: TimeMS) -> Option<Kinematics> {
        self.paths.get(&agent_id).map(|path| path.at(at))
    }
}

impl BucketModel for Mapper {
    fn init(&mut self, step: TimeMS) {
        self.step = step;
    }

    fn before_agent_step(&mut self, step: TimeMS) {
        trace!("Mapper moved to {}", step);
        self.step = step;
    }
}
