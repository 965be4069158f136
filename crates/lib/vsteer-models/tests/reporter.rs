use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::radio::{DatagramSocket, TransportError};
use vsteer_models::device::mobility::{Kinematics, Point2D};
use vsteer_models::device::reporter::Reporter;
use vsteer_models::net::datagram::{LossyNetwork, LossySocket};
use vsteer_models::telemetry::TelemetryRecord;

fn kinematics(x: f64) -> Kinematics {
    Kinematics::builder()
        .pos(Point2D::new(x, 0.0))
        .velocity(Point2D::new(20.0, 0.0))
        .build()
}

fn reporter() -> Reporter<LossySocket> {
    Reporter::builder()
        .agent_id(AgentId::from(1))
        .collector(AgentId::from(10))
        .interval(TimeMS::from(1000))
        .build()
}

#[test]
fn test_first_report_is_immediate_then_periodic() {
    let network = LossyNetwork::lossless();
    let mut collector = network.bind(AgentId::from(10)).expect("bind");
    let mut reporter = reporter();
    reporter
        .activate(network.bind(AgentId::from(1)).expect("bind"), TimeMS::from(0))
        .expect("collector is bound");

    let mut sent_at = Vec::new();
    for step in (0..3000).step_by(100) {
        let now = TimeMS::from(step as u64);
        if reporter
            .poll(now, &kinematics(step as f64))
            .expect("send")
            .is_some()
        {
            sent_at.push(step);
        }
    }
    assert_eq!(sent_at, vec![0, 1000, 2000]);
    assert_eq!(reporter.sent(), 3);

    let first = collector.recv().expect("first report");
    let record = TelemetryRecord::decode(&first.payload).expect("full record");
    assert_eq!(record.agent_id, AgentId::from(1));
    assert_eq!(record.speed, 20.0);
    assert_eq!(record.position_x, 0.0);
}

#[test]
fn test_deactivation_cancels_pending_reports() {
    let network = LossyNetwork::lossless();
    let mut collector = network.bind(AgentId::from(10)).expect("bind");
    let mut reporter = reporter();
    reporter
        .activate(network.bind(AgentId::from(1)).expect("bind"), TimeMS::from(0))
        .expect("collector is bound");
    reporter
        .poll(TimeMS::from(0), &kinematics(0.0))
        .expect("send");

    reporter.deactivate();
    reporter.deactivate();
    assert!(!reporter.is_active());
    assert!(!network.is_bound(AgentId::from(1)));
    assert_eq!(
        reporter.poll(TimeMS::from(1000), &kinematics(20.0)),
        Ok(None)
    );

    assert!(collector.recv().is_some());
    assert!(collector.recv().is_none());
}

#[test]
fn test_activation_fails_without_a_collector() {
    let network = LossyNetwork::lossless();
    let mut reporter = reporter();
    let result = reporter.activate(network.bind(AgentId::from(1)).expect("bind"), TimeMS::from(0));
    assert_eq!(result, Err(TransportError::Unreachable(AgentId::from(10))));
    assert!(!reporter.is_active());
    // The socket handed in was dropped and released its address.
    assert!(!network.is_bound(AgentId::from(1)));
}
