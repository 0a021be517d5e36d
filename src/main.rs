use cpusim::{Policy, ProcessSpec, RunConfig, Sim, Workload, core::Ticks};
use rand::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let processes = bernoulli_processes(60, 0.3, 0.4, (2, 3), (6, 2), 4, 0);
    let policies = [
        RunConfig::new(Policy::Fcfs),
        RunConfig::new(Policy::Sjf),
        RunConfig::new(Policy::Srtf),
        RunConfig::round_robin(3),
        RunConfig::new(Policy::priority()),
    ];

    for config in policies {
        let config = config.with_costs(1, 1, 1);
        let policy = config.policy;
        let workload = Workload::new(processes.clone(), config);
        if let Err(err) = workload.validate() {
            warn!(%policy, %err, "skipping invalid workload");
            continue;
        }

        let mut sim = Sim::new(&workload);
        while !sim.all_processes_finished() {
            match sim.step() {
                Ok(events) => {
                    for event in events {
                        debug!(
                            %policy,
                            t = event.time,
                            kind = ?event.kind,
                            process = ?event.process
                        );
                    }
                }
                Err(err) => {
                    warn!(%policy, %err, "simulation aborted");
                    break;
                }
            }
        }

        let longest_wait = sim.processes_map(|p| p.ready_time).max().unwrap_or(0);

        let batch = sim.metrics().batch;
        info!(
            %policy,
            completed = batch.completed,
            mean_turnaround = %format!("{:.2}", batch.mean_turnaround),
            mean_normalized = %format!("{:.2}", batch.mean_normalized_turnaround),
            mean_response = %format!("{:.2}", batch.mean_response_time),
            longest_wait,
            user_pct = %format!("{:.1}", batch.user_pct),
            os_pct = %format!("{:.1}", batch.os_overhead_pct),
            idle_pct = %format!("{:.1}", batch.idle_pct),
            "policy summary"
        );
    }
}

fn bernoulli_processes(
    ticks: Ticks,
    p_arrival: f64,
    p_short: f64,
    short: (u32, Ticks),
    long: (u32, Ticks),
    io: Ticks,
    seed: u64,
) -> Vec<ProcessSpec> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut processes = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            let (bursts, duration) = if rng.random::<f64>() < p_short {
                short
            } else {
                long
            };

            processes.push(
                ProcessSpec::new(format!("P{}", processes.len()), t, bursts, duration)
                    .with_io(io)
                    .with_priority(rng.random_range(1..=100)),
            );
        }
    }

    processes
}
