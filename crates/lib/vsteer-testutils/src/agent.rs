use vsteer_core::agent::{Activatable, Agent, AgentId, AgentOrder, Orderable};
use vsteer_core::bucket::TimeMS;

use crate::bucket::{MyBucket, Stage};

#[derive(Default, Clone, Debug)]
pub struct TDevice {
    pub id: AgentId,
    pub order: AgentOrder,
    pub start_at: TimeMS,
    pub stop_at: Option<TimeMS>,
    pub active: bool,
    pub activated_once: bool,
}

impl TDevice {
    pub fn make_device(id: u32, order: u32, start_at: u64) -> Self {
        Self {
            id: AgentId::from(id),
            order: AgentOrder::from(order),
            start_at: TimeMS::from(start_at),
            ..Self::default()
        }
    }

    pub fn stopping_at(mut self, stop_at: u64) -> Self {
        self.stop_at = Some(TimeMS::from(stop_at));
        self
    }
}

impl Activatable<MyBucket> for TDevice {
    fn activate(&mut self, bucket: &mut MyBucket) {
        self.active = true;
        self.activated_once = true;
        bucket.record(self.id, Stage::Activated);
    }

    fn deactivate(&mut self, bucket: &mut MyBucket) {
        if !self.active {
            return;
        }
        self.active = false;
        bucket.record(self.id, Stage::Deactivated);
    }

    fn is_deactivated(&self) -> bool {
        !self.active
    }

    fn has_activation(&self) -> bool {
        !self.activated_once
    }

    fn time_of_activation(&mut self) -> TimeMS {
        self.start_at
    }
}

impl Orderable for TDevice {
    fn order(&self) -> AgentOrder {
        self.order
    }
}

impl Agent<MyBucket> for TDevice {
    fn id(&self) -> AgentId {
        self.id
    }

    fn stage_one(&mut self, bucket: &mut MyBucket) {
        bucket.record(self.id, Stage::One);
    }

    fn stage_two_reverse(&mut self, bucket: &mut MyBucket) {
        bucket.record(self.id, Stage::Two);
        if let Some(stop_at) = self.stop_at {
            if bucket.step >= stop_at {
                self.deactivate(bucket);
            }
        }
    }
}
