use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use vsteer_core::bucket::TimeMS;
use vsteer_core::scheduler::Scheduler;

use crate::simulation::builder::{DScheduler, SimulationBuilder};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

pub(crate) mod simulation;
pub(crate) mod v2x;

#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
struct CliArgs {
    #[arg(short = 'c', long, value_name = "CONFIG_FILE")]
    config: String,
}

fn run_simulation(mut scheduler: DScheduler) {
    scheduler.initialize();
    let mut now = TimeMS::default();
    while now < scheduler.duration() {
        scheduler.activate();
        now = scheduler.trigger();
    }
    info!(
        "Simulation reached {} with {} agents still active",
        now,
        scheduler.active_agents()
    );
    scheduler.terminate();
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let start = std::time::Instant::now();
    let scheduler = match SimulationBuilder::new(&args.config).and_then(|mut b| b.build()) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Failed to set up the simulation: {}", e);
            error!("Failed to set up the simulation: {}", e);
            return ExitCode::FAILURE;
        }
    };
    run_simulation(scheduler);
    let elapsed = start.elapsed();
    println!("Simulation finished in {} ms.", elapsed.as_millis());
    ExitCode::SUCCESS
}
