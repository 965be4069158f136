use keyed_priority_queue::KeyedPriorityQueue;
use log::{debug, warn};
use typed_builder::TypedBuilder;

use crate::agent::{Agent, AgentId, AgentOrder};
use crate::bucket::{Bucket, TimeMS};
use crate::hashbrown::HashMap;

/// A trait used to represent a scheduler. The order of calling the scheduler's functions is
/// important: `initialize` once, then `activate` followed by `trigger` at every step, and
/// `terminate` at the end.
pub trait Scheduler<B: Bucket>: Send {
    fn duration(&self) -> TimeMS;
    fn initialize(&mut self);
    fn activate(&mut self);
    fn trigger(&mut self) -> TimeMS;
    fn active_agents(&self) -> usize;
    fn terminate(self);
}

#[derive(TypedBuilder)]
pub struct DefaultScheduler<A, B>
where
    A: Agent<B>,
    B: Bucket,
{
    pub bucket: B,
    pub agents: HashMap<AgentId, A>,
    pub duration: TimeMS,
    pub step_size: TimeMS,
    pub output_interval: TimeMS,
    #[builder(default)]
    pub agent_cache: HashMap<TimeMS, Vec<AgentId>>,
    #[builder(default)]
    pub agent_queue: KeyedPriorityQueue<AgentId, AgentOrder>,
    #[builder(default = TimeMS::default())]
    pub now: TimeMS,
    #[builder(default = TimeMS::default())]
    pub output_step: TimeMS,
    #[builder(default)]
    pub _marker: std::marker::PhantomData<fn() -> B>,
}

impl<A, B> DefaultScheduler<A, B>
where
    A: Agent<B>,
    B: Bucket,
{
    #[inline]
    fn add_to_queue(&mut self, agent_id: AgentId) {
        if let Some(agent) = self.agents.get(&agent_id) {
            self.agent_queue.push(agent_id, agent.order());
        }
    }

    /// Activation times are aligned to the step grid so that an agent is never skipped.
    fn align(&self, time: TimeMS) -> TimeMS {
        let step = self.step_size.as_u64().max(1);
        TimeMS::from(time.as_u64().div_ceil(step) * step)
    }
}

impl<A, B> Scheduler<B> for DefaultScheduler<A, B>
where
    A: Agent<B>,
    B: Bucket,
{
    fn duration(&self) -> TimeMS {
        self.duration
    }

    fn initialize(&mut self) {
        let mut pending: Vec<(TimeMS, AgentId)> = Vec::with_capacity(self.agents.len());
        for agent in self.agents.values_mut() {
            if agent.has_activation() {
                pending.push((agent.time_of_activation(), agent.id()));
            }
        }
        for (time, agent_id) in pending.into_iter() {
            debug!("Adding agent {} to the scheduler at {}", agent_id, time);
            let aligned = self.align(time);
            self.agent_cache.entry(aligned).or_default().push(agent_id);
        }
        self.bucket.initialize(self.now);
    }

    fn activate(&mut self) {
        let Some(agent_ids) = self.agent_cache.remove(&self.now) else {
            return;
        };
        for agent_id in agent_ids.into_iter() {
            match self.agents.get_mut(&agent_id) {
                Some(agent) => agent.activate(&mut self.bucket),
                None => {
                    warn!("Agent {} is not known to the scheduler", agent_id);
                    continue;
                }
            }
            self.add_to_queue(agent_id);
        }
    }

    fn trigger(&mut self) -> TimeMS {
        self.bucket.before_agents(self.now);

        if self.now == self.output_step {
            self.bucket.stream_output();
            self.output_step += self.output_interval;
        }

        // Early return if the agent queue is empty.
        if self.agent_queue.is_empty() {
            self.bucket.after_agents();
            self.now += self.step_size;
            return self.now;
        }

        // Highest order comes out first.
        let mut agent_ids: Vec<AgentId> = Vec::with_capacity(self.agent_queue.len());
        while let Some((agent_id, _)) = self.agent_queue.pop() {
            agent_ids.push(agent_id);
        }

        agent_ids.iter().rev().for_each(|agent_id| {
            if let Some(agent) = self.agents.get_mut(agent_id) {
                agent.stage_one(&mut self.bucket);
            }
        });
        self.bucket.after_stage_one();

        agent_ids.iter().for_each(|agent_id| {
            if let Some(agent) = self.agents.get_mut(agent_id) {
                agent.stage_two_reverse(&mut self.bucket);
            }
        });

        self.bucket.after_agents();

        for agent_id in agent_ids.into_iter() {
            let Some(agent) = self.agents.get_mut(&agent_id) else {
                continue;
            };
            // Reschedule the agent if not stopped.
            if !agent.is_deactivated() {
                self.add_to_queue(agent_id);
                continue;
            }

            // If agent needs a later activation, add it to cache.
            if agent.has_activation() {
                let next = agent.time_of_activation();
                let aligned = self.align(next);
                self.agent_cache.entry(aligned).or_default().push(agent_id);
            }
        }

        self.now += self.step_size;
        self.now
    }

    fn active_agents(&self) -> usize {
        self.agent_queue.len()
    }

    fn terminate(mut self) {
        // Agents still running at the end get a chance to release what they hold.
        while let Some((agent_id, _)) = self.agent_queue.pop() {
            if let Some(agent) = self.agents.get_mut(&agent_id) {
                agent.deactivate(&mut self.bucket);
            }
        }
        self.bucket.terminate();
    }
}
