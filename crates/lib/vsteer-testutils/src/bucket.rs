use vsteer_core::agent::AgentId;
use vsteer_core::bucket::{Bucket, TimeMS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Activated,
    One,
    Two,
    Deactivated,
}

#[derive(Default, Clone)]
pub struct MyBucket {
    pub step: TimeMS,
    pub initialized: bool,
    pub outputs: u32,
    pub events: Vec<(TimeMS, AgentId, Stage)>,
}

impl MyBucket {
    pub fn record(&mut self, agent_id: AgentId, stage: Stage) {
        self.events.push((self.step, agent_id, stage));
    }

    pub fn events_of(&self, agent_id: AgentId) -> Vec<(TimeMS, Stage)> {
        self.events
            .iter()
            .filter(|(_, id, _)| *id == agent_id)
            .map(|(time, _, stage)| (*time, *stage))
            .collect()
    }
}

impl Bucket for MyBucket {
    fn initialize(&mut self, step: TimeMS) {
        self.step = step;
        self.initialized = true;
    }

    fn before_agents(&mut self, step: TimeMS) {
        self.step = step;
    }

    fn after_agents(&mut self) {}

    fn stream_output(&mut self) {
        self.outputs += 1;
    }

    fn terminate(self) {}
}
