use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::hashbrown::HashMap;
use vsteer_core::scheduler::{DefaultScheduler, Scheduler};
use vsteer_testutils::agent::TDevice;
use vsteer_testutils::bucket::{MyBucket, Stage};

fn build_scheduler(devices: Vec<TDevice>) -> DefaultScheduler<TDevice, MyBucket> {
    let agents: HashMap<AgentId, TDevice> = devices.into_iter().map(|d| (d.id, d)).collect();
    DefaultScheduler::builder()
        .bucket(MyBucket::default())
        .agents(agents)
        .duration(TimeMS::from(50))
        .step_size(TimeMS::from(10))
        .output_interval(TimeMS::from(20))
        .build()
}

fn run_to_end(scheduler: &mut DefaultScheduler<TDevice, MyBucket>) {
    scheduler.initialize();
    let mut now = TimeMS::default();
    while now < scheduler.duration() {
        scheduler.activate();
        now = scheduler.trigger();
    }
}

#[test]
fn test_agents_activate_at_their_time() {
    let mut scheduler = build_scheduler(vec![
        TDevice::make_device(1, 1, 0),
        TDevice::make_device(2, 1, 15),
    ]);
    run_to_end(&mut scheduler);
    let first = scheduler.bucket.events_of(AgentId::from(1));
    let second = scheduler.bucket.events_of(AgentId::from(2));
    assert_eq!(first[0], (TimeMS::from(0), Stage::Activated));
    // 15 ms is rounded up to the next step.
    assert_eq!(second[0].1, Stage::Activated);
    assert_eq!(second[1], (TimeMS::from(20), Stage::One));
}

#[test]
fn test_lower_order_runs_first_in_stage_one() {
    let mut scheduler = build_scheduler(vec![
        TDevice::make_device(7, 2, 0),
        TDevice::make_device(3, 1, 0),
    ]);
    scheduler.initialize();
    scheduler.activate();
    scheduler.trigger();
    let stages: Vec<(AgentId, Stage)> = scheduler
        .bucket
        .events
        .iter()
        .filter(|(_, _, stage)| *stage == Stage::One || *stage == Stage::Two)
        .map(|(_, id, stage)| (*id, *stage))
        .collect();
    assert_eq!(
        stages,
        vec![
            (AgentId::from(3), Stage::One),
            (AgentId::from(7), Stage::One),
            (AgentId::from(7), Stage::Two),
            (AgentId::from(3), Stage::Two),
        ]
    );
}

#[test]
fn test_deactivated_agents_are_not_rescheduled() {
    let mut scheduler = build_scheduler(vec![TDevice::make_device(1, 1, 0).stopping_at(20)]);
    run_to_end(&mut scheduler);
    let events = scheduler.bucket.events_of(AgentId::from(1));
    assert_eq!(events.last(), Some(&(TimeMS::from(20), Stage::Deactivated)));
    assert_eq!(scheduler.active_agents(), 0);
    assert_eq!(
        events.iter().filter(|(_, stage)| *stage == Stage::One).count(),
        3
    );
}

#[test]
fn test_output_is_streamed_on_interval() {
    let mut scheduler = build_scheduler(vec![]);
    run_to_end(&mut scheduler);
    // Steps 0, 20 and 40.
    assert_eq!(scheduler.bucket.outputs, 3);
}
