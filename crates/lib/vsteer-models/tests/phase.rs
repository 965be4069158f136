use vsteer_core::agent::AgentId;
use vsteer_core::model::Model;
use vsteer_core::radio::DatagramSocket;
use vsteer_models::control::advisor::{decode_summaries, FlowAdvisor};
use vsteer_models::device::aggregator::Aggregator;
use vsteer_models::epoch::barrier::EpochBarrier;
use vsteer_models::epoch::phase::{ClusteringPhase, PhaseError};
use vsteer_models::net::datagram::{LossyNetwork, LossySocket};
use vsteer_models::partition::kmeans::{KMeansSettings, PartitionError, Partitioner};
use vsteer_testutils::records::{make_batch, MemorySink};

const CONTROLLER: u32 = 99;

fn phase(network: &LossyNetwork, sink: MemorySink) -> ClusteringPhase<LossySocket> {
    let partitioner = Partitioner::with_settings(&KMeansSettings {
        group_count: 4,
        max_iterations: 10,
        epsilon: 1.0,
        restarts: 3,
        seed: 1,
    });
    let advisor = FlowAdvisor::new(
        network.bind(AgentId::from(50)).expect("bind"),
        AgentId::from(CONTROLLER),
    );
    ClusteringPhase::new(partitioner, advisor, Box::new(sink))
}

#[test]
fn test_three_collectors_one_clustering_run() {
    let network = LossyNetwork::lossless();
    let mut control_plane = network.bind(AgentId::from(CONTROLLER)).expect("bind");
    let sink = MemorySink::default();
    let barrier = EpochBarrier::new(3, phase(&network, sink.clone()));

    let mut outcomes = Vec::new();
    for (idx, origin) in [0.0, 500.0, 1000.0].into_iter().enumerate() {
        let collector_id = AgentId::from(10 + idx as u32);
        let mut aggregator = Aggregator::builder()
            .collector_id(collector_id)
            .socket(network.bind(collector_id).expect("bind"))
            .build();
        let mut vehicle = network.bind(AgentId::from(1)).expect("bind");
        vehicle.connect(collector_id).expect("connect");
        for record in make_batch(origin, idx as u32 * 5, 5) {
            vehicle.send(&record.encode()).expect("send");
        }
        vehicle.close();
        aggregator.receive();
        assert_eq!(aggregator.buffered().len(), 5);
        outcomes.push(aggregator.deactivate(&barrier));
    }

    assert!(outcomes[0].is_none());
    assert!(outcomes[1].is_none());
    let partition = outcomes
        .pop()
        .flatten()
        .expect("third collector fires")
        .expect("clustering succeeds");
    assert_eq!(barrier.inspect(|phase| phase.runs()), 1);
    assert_eq!(partition.summaries.len(), 4);
    assert_eq!(partition.record_count(), 15);

    let runs = sink.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].len(), 4);
    assert_eq!(
        runs[0].iter().map(|group| group.records.len()).sum::<usize>(),
        15
    );

    let summaries = control_plane.recv().expect("summaries datagram");
    assert_eq!(summaries.payload.len(), 4 * 16);
    assert_eq!(decode_summaries(&summaries.payload).len(), 4);
    assert!(control_plane.recv().is_none());
}

#[test]
fn test_too_few_records_fails_the_phase() {
    let network = LossyNetwork::lossless();
    let _control_plane = network.bind(AgentId::from(CONTROLLER)).expect("bind");
    let sink = MemorySink::default();
    let barrier = EpochBarrier::new(1, phase(&network, sink.clone()));

    let outcome = barrier.contribute(make_batch(0.0, 0, 2)).expect("fires");
    assert!(matches!(
        outcome,
        Err(PhaseError::Partition(PartitionError::NotEnoughRecords {
            records: 2,
            groups: 4
        }))
    ));
    assert!(sink.runs().is_empty());
}

#[test]
fn test_unreachable_control_plane_is_reported() {
    let network = LossyNetwork::lossless();
    let sink = MemorySink::default();
    let barrier = EpochBarrier::new(1, phase(&network, sink.clone()));

    let outcome = barrier.contribute(make_batch(0.0, 0, 8)).expect("fires");
    assert!(matches!(outcome, Err(PhaseError::Advise(_))));
    // Groups are persisted before the control plane is contacted.
    assert_eq!(sink.runs().len(), 1);
}
