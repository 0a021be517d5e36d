use average::Mean;
use serde::{Deserialize, Serialize};

use crate::core::{CpuTime, Process, SimulationState, Ticks};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub id: String,
    pub arrival: Ticks,
    pub first_dispatch: Ticks,
    pub termination_end: Ticks,
    pub turnaround: Ticks,
    pub service: Ticks,
    pub normalized_turnaround: f64,
    pub ready_time: Ticks,
    pub response_time: Ticks,
    pub dispatches: u32,
    pub preemptions: u32,
}

impl ProcessMetrics {
    pub fn from_process(process: &Process) -> Option<Self> {
        let termination_end = process.termination_end?;
        let first_dispatch = process.first_dispatch?;
        let turnaround = termination_end - process.arrival;
        let service = process.service_time();

        Some(Self {
            id: process.id.clone(),
            arrival: process.arrival,
            first_dispatch,
            termination_end,
            turnaround,
            service,
            normalized_turnaround: turnaround as f64 / service as f64,
            ready_time: process.ready_time,
            response_time: first_dispatch - process.arrival,
            dispatches: process.dispatches,
            preemptions: process.preemptions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub completed: usize,
    pub batch_turnaround: Ticks,
    pub mean_turnaround: f64,
    pub mean_normalized_turnaround: f64,
    pub mean_ready_time: f64,
    pub mean_response_time: f64,
    pub total_elapsed: Ticks,
    pub cpu: CpuTime,
    pub idle_pct: f64,
    pub os_overhead_pct: f64,
    pub user_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub per_process: Vec<ProcessMetrics>,
    pub batch: BatchMetrics,
}

// Zero rather than NaN when nothing has terminated
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mean: Mean = values.collect();
    if mean.is_empty() { 0.0 } else { mean.mean() }
}

fn percent(part: Ticks, total: Ticks) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn compute(state: &SimulationState) -> Metrics {
        let per_process: Vec<ProcessMetrics> =
            state.iter().filter_map(ProcessMetrics::from_process).collect();

        let earliest_arrival = per_process.iter().map(|m| m.arrival).min();
        let latest_end = per_process.iter().map(|m| m.termination_end).max();
        let batch_turnaround = match (earliest_arrival, latest_end) {
            (Some(start), Some(end)) => end - start,
            _ => 0,
        };

        let total_elapsed = state.now;
        let cpu = state.cpu;

        let batch = BatchMetrics {
            completed: per_process.len(),
            batch_turnaround,
            mean_turnaround: mean(per_process.iter().map(|m| m.turnaround as f64)),
            mean_normalized_turnaround: mean(per_process.iter().map(|m| m.normalized_turnaround)),
            mean_ready_time: mean(per_process.iter().map(|m| m.ready_time as f64)),
            mean_response_time: mean(per_process.iter().map(|m| m.response_time as f64)),
            total_elapsed,
            cpu,
            idle_pct: percent(cpu.idle, total_elapsed),
            os_overhead_pct: percent(cpu.os_overhead, total_elapsed),
            user_pct: percent(cpu.user, total_elapsed),
        };

        Metrics { per_process, batch }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ProcessSpec;

    fn finished(spec: ProcessSpec, dispatch_at: Ticks, end: Ticks) -> Process {
        let mut p = Process::new(&spec);
        p.admit(spec.arrival).unwrap();
        p.finish_admission(spec.arrival).unwrap();
        p.dispatch(dispatch_at, 0).unwrap();
        p.complete_burst(dispatch_at + spec.burst_duration).unwrap();
        p.finish(end).unwrap();
        p
    }

    #[test]
    fn single_burst_round_trip() {
        let p = finished(ProcessSpec::new("A", 2, 1, 4), 5, 10);
        let m = ProcessMetrics::from_process(&p).unwrap();

        assert_eq!(m.turnaround, 8);
        assert_eq!(m.service, 4);
        assert_eq!(m.normalized_turnaround, 8.0 / 4.0);
        assert_eq!(m.ready_time, 3);
        assert_eq!(m.response_time, 3);
    }

    #[test]
    fn unfinished_process_has_no_metrics() {
        let p = Process::new(&ProcessSpec::new("A", 0, 1, 4));
        assert_eq!(ProcessMetrics::from_process(&p), None);
    }

    #[test]
    fn empty_state_yields_zeroes() {
        let state = SimulationState::new(&[ProcessSpec::new("A", 0, 1, 4)]);
        let metrics = MetricsCalculator::compute(&state);

        assert!(metrics.per_process.is_empty());
        assert_eq!(metrics.batch.completed, 0);
        assert_eq!(metrics.batch.batch_turnaround, 0);
        assert_eq!(metrics.batch.mean_turnaround, 0.0);
        assert_eq!(metrics.batch.idle_pct, 0.0);
    }

    #[test]
    fn metrics_without_completions_survive_json() {
        let mut state = SimulationState::new(&[ProcessSpec::new("A", 0, 1, 4)]);
        state.advance_to(3);
        let metrics = MetricsCalculator::compute(&state);

        assert_eq!(metrics, metrics.clone());
        assert_eq!(metrics.batch.mean_normalized_turnaround, 0.0);
        assert_eq!(metrics.batch.mean_response_time, 0.0);

        let json = serde_json::to_string(&metrics).unwrap();
        let back: Metrics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metrics);
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean([2.0, 4.0].into_iter()), 3.0);
        assert_eq!(mean(std::iter::empty()), 0.0);
    }

    #[test]
    fn percentages_follow_cpu_buckets() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(0, 0), 0.0);
    }
}
