use vsteer_core::agent::{Activatable, Agent, AgentId, AgentOrder, Orderable};
use vsteer_core::bucket::TimeMS;
use vsteer_testutils::agent::TDevice;
use vsteer_testutils::bucket::{MyBucket, Stage};

#[test]
fn test_device_creation() {
    let device_a = TDevice::make_device(1, 1, 0);
    assert_eq!(device_a.id(), AgentId::from(1));
    assert_eq!(device_a.order(), AgentOrder::from(1));
}

#[test]
fn test_device_comparison() {
    let device_a = TDevice::make_device(1, 1, 0);
    let device_b = TDevice::make_device(2, 2, 0);
    assert_ne!(device_a.id(), device_b.id());
    assert!(device_a.order() < device_b.order());
}

#[test]
fn test_deactivation_is_idempotent() {
    let mut device = TDevice::make_device(1, 1, 0);
    let mut bucket = MyBucket::default();
    device.activate(&mut bucket);
    device.deactivate(&mut bucket);
    device.deactivate(&mut bucket);
    assert!(device.is_deactivated());
    assert_eq!(
        bucket.events_of(AgentId::from(1)),
        vec![
            (TimeMS::default(), Stage::Activated),
            (TimeMS::default(), Stage::Deactivated)
        ]
    );
}
