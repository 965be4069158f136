use std::fs;
use std::path::PathBuf;

use vsteer_core::agent::AgentId;
use vsteer_core::bucket::TimeMS;
use vsteer_core::model::Model;
use vsteer_core::radio::DatagramSocket;
use vsteer_models::control::advisor::FlowAdvisor;
use vsteer_models::device::aggregator::Aggregator;
use vsteer_models::epoch::barrier::EpochBarrier;
use vsteer_models::epoch::phase::ClusteringPhase;
use vsteer_models::net::datagram::LossyNetwork;
use vsteer_models::partition::kmeans::{KMeansSettings, Partitioner};
use vsteer_output::groups::GroupCsvWriter;
use vsteer_output::result::{OutputSettings, OutputType, Outputs, Results};
use vsteer_models::partition::{Group, GroupSink};
use vsteer_testutils::records::{make_batch, make_record};

fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("vsteer-{}-{}", name, std::process::id()));
    if path.exists() {
        fs::remove_dir_all(&path).expect("clear scratch directory");
    }
    path
}

#[test]
fn test_three_collectors_write_four_group_files() {
    let directory = scratch("groups");
    let network = LossyNetwork::lossless();
    let mut control_plane = network.bind(AgentId::from(99)).expect("bind");
    let phase = ClusteringPhase::new(
        Partitioner::with_settings(&KMeansSettings {
            group_count: 4,
            max_iterations: 10,
            epsilon: 1.0,
            restarts: 3,
            seed: 2,
        }),
        FlowAdvisor::new(
            network.bind(AgentId::from(98)).expect("bind"),
            AgentId::from(99),
        ),
        Box::new(GroupCsvWriter::new(directory.clone())),
    );
    let barrier = EpochBarrier::new(3, phase);

    let mut fired = 0;
    for (idx, origin) in [0.0, 300.0, 600.0].into_iter().enumerate() {
        let collector_id = AgentId::from(10 + idx as u32);
        let mut aggregator = Aggregator::builder()
            .collector_id(collector_id)
            .socket(network.bind(collector_id).expect("bind"))
            .build();
        let mut vehicle = network.bind(AgentId::from(1)).expect("bind");
        vehicle.connect(collector_id).expect("connect");
        for record in make_batch(origin, 1 + idx as u32 * 5, 5) {
            vehicle.send(&record.encode()).expect("send");
        }
        vehicle.close();
        aggregator.receive();
        if let Some(outcome) = aggregator.deactivate(&barrier) {
            outcome.expect("clustering succeeds");
            fired += 1;
        }
    }
    assert_eq!(fired, 1);

    let summaries = control_plane.recv().expect("summaries");
    assert_eq!(summaries.payload.len(), 4 * 16);

    let mut lines = 0;
    for n in 1..=4 {
        let content =
            fs::read_to_string(directory.join(format!("cluster{}.csv", n))).expect("group file");
        for line in content.lines() {
            assert_eq!(line.split(',').count(), 4);
            lines += 1;
        }
    }
    assert_eq!(lines, 15);
    fs::remove_dir_all(&directory).expect("cleanup");
}

#[test]
fn test_rx_trace_is_written_as_csv() {
    let base = scratch("rx");
    let settings = OutputSettings {
        output_interval: TimeMS::from(1000),
        output_path: "output".to_string(),
        outputs: vec![Outputs {
            output_type: OutputType::RxTrace,
            output_filename: "rx_trace.csv".to_string(),
        }],
        scenario_id: 1,
    };
    let mut results = Results::new(&base, &settings).expect("results");
    assert!(results.groups_path.ends_with("output/1/groups"));
    let writer = results.rx_trace.as_mut().expect("rx trace requested");
    writer.add_data(TimeMS::from(0), AgentId::from(10), &make_record(1.0, 2.0, 3.0, 4));
    writer.add_data(TimeMS::from(1000), AgentId::from(10), &make_record(5.0, 6.0, 7.0, 4));
    results.write_to_file().expect("write");
    results.close_files().expect("close");

    let content = fs::read_to_string(base.join("output/1/files/rx_trace.csv")).expect("trace");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("time_step,collector_id,agent_id,position_x,position_y,speed")
    );
    assert_eq!(lines.count(), 2);
    fs::remove_dir_all(&base).expect("cleanup");
}

#[test]
fn test_unknown_extension_is_rejected() {
    let base = scratch("ext");
    let settings = OutputSettings {
        output_interval: TimeMS::from(1000),
        output_path: "output".to_string(),
        outputs: vec![Outputs {
            output_type: OutputType::RxTrace,
            output_filename: "rx_trace.txt".to_string(),
        }],
        scenario_id: 1,
    };
    assert!(Results::new(&base, &settings).is_err());
    fs::remove_dir_all(&base).expect("cleanup");
}

#[test]
fn test_rerun_with_fewer_groups_replaces_all_group_files() {
    let directory = scratch("rerun");
    let mut writer = GroupCsvWriter::new(directory.clone());
    let groups_of = |count: usize| -> Vec<Group> {
        (0..count)
            .map(|label| Group {
                label,
                records: vec![make_record(label as f64, 0.0, 20.0, label as u32)],
            })
            .collect()
    };
    writer.persist(&groups_of(5)).expect("first run");
    writer.persist(&groups_of(2)).expect("second run");

    let mut files: Vec<String> = fs::read_dir(&directory)
        .expect("group directory")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["cluster1.csv", "cluster2.csv"]);
    fs::remove_dir_all(&directory).expect("cleanup");
}
