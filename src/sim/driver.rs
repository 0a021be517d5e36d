use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    metrics::{Metrics, MetricsCalculator},
    workload::{ValidationError, Workload},
};
use crate::core::{Engine, EngineError, Event, Process, SimulationState, Ticks};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub events: Vec<Event>,
    pub metrics: Metrics,
    pub final_clock: Ticks,
}

/// An aborted run. `partial` holds the log up to the failure and metrics for
/// the processes that had already terminated.
#[derive(Debug, Error)]
#[error("simulation aborted: {error}")]
pub struct RunError {
    #[source]
    pub error: EngineError,
    pub partial: Box<SimulationReport>,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid workload: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Aborted(#[from] RunError),
}

pub struct Sim {
    pub engine: Engine,
}

impl Sim {
    pub fn new(workload: &Workload) -> Self {
        Self {
            engine: Engine::new(workload),
        }
    }

    pub fn step(&mut self) -> Result<Vec<Event>, EngineError> {
        self.engine.step().map(<[Event]>::to_vec)
    }

    pub fn now(&self) -> Ticks {
        self.engine.now()
    }

    pub fn state(&self) -> &SimulationState {
        &self.engine.state
    }

    pub fn all_processes_finished(&self) -> bool {
        self.engine.state.all_finished()
    }

    pub fn processes_map<T>(&self, f: impl Fn(&Process) -> T) -> impl Iterator<Item = T> {
        self.engine.state.iter().map(f)
    }

    pub fn metrics(&self) -> Metrics {
        MetricsCalculator::compute(&self.engine.state)
    }

    pub fn run(mut self) -> Result<SimulationReport, RunError> {
        let outcome = self.engine.run();
        let report = self.into_report();
        match outcome {
            Ok(()) => Ok(report),
            Err(error) => Err(RunError {
                error,
                partial: Box::new(report),
            }),
        }
    }

    fn into_report(self) -> SimulationReport {
        let metrics = self.metrics();
        let state = self.engine.into_state();
        SimulationReport {
            final_clock: state.now,
            events: state.log,
            metrics,
        }
    }
}

pub fn simulate(workload: &Workload) -> Result<SimulationReport, RunError> {
    Sim::new(workload).run()
}

pub fn simulate_validated(workload: &Workload) -> Result<SimulationReport, SimulationError> {
    workload.validate()?;
    Ok(simulate(workload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ProcessSpec, RunConfig};

    #[test]
    fn step_by_step_matches_run() {
        let workload = Workload::new(
            vec![
                ProcessSpec::new("A", 0, 2, 3).with_io(2),
                ProcessSpec::new("B", 1, 1, 4),
            ],
            RunConfig::default().with_costs(1, 1, 1),
        );

        let mut sim = Sim::new(&workload);
        let mut stepped = Vec::new();
        while !sim.all_processes_finished() {
            stepped.extend(sim.step().unwrap());
        }

        let report = simulate(&workload).unwrap();
        assert_eq!(stepped, report.events);
        assert_eq!(sim.now(), report.final_clock);
        assert_eq!(sim.metrics(), report.metrics);
    }

    #[test]
    fn processes_map_follows_workload_order() {
        let workload = Workload::new(
            vec![ProcessSpec::new("Z", 5, 1, 1), ProcessSpec::new("A", 0, 1, 1)],
            RunConfig::default(),
        );
        let sim = Sim::new(&workload);
        let ids: Vec<String> = sim.processes_map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["Z", "A"]);
    }

    #[test]
    fn event_limit_keeps_finished_processes() {
        let workload = Workload::new(
            vec![
                ProcessSpec::new("A", 0, 1, 2),
                ProcessSpec::new("B", 0, 50, 1).with_io(1),
            ],
            RunConfig::default().with_max_events(30),
        );

        let err = simulate(&workload).unwrap_err();
        let at = match err.error {
            EngineError::EventLimitExceeded {
                limit: 30,
                unfinished: 1,
                at,
            } => at,
            ref other => panic!("expected event limit, got {other:?}"),
        };

        let partial = &err.partial;
        assert_eq!(partial.final_clock, at);
        assert_eq!(partial.metrics.batch.completed, 1);
        let ids: Vec<&str> = partial
            .metrics
            .per_process
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A"]);
        assert_eq!(partial.metrics.batch.mean_turnaround, 2.0);
        assert_eq!(partial.metrics.batch.cpu.total(), at);
        assert!(partial.events.iter().any(|e| e.process.as_deref() == Some("B")));
    }

    #[test]
    fn partial_report_with_nothing_finished_round_trips() {
        let workload = Workload::new(
            vec![ProcessSpec::new("A", 0, 50, 1).with_io(1)],
            RunConfig::default().with_max_events(10),
        );

        let err = simulate(&workload).unwrap_err();
        assert!(err.partial.metrics.per_process.is_empty());
        assert_eq!(err.partial.metrics.batch.mean_turnaround, 0.0);

        let json = serde_json::to_string(&*err.partial).unwrap();
        let back: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.events, err.partial.events);
        assert_eq!(back.metrics.batch.cpu, err.partial.metrics.batch.cpu);
        assert_eq!(back.metrics.batch.mean_turnaround, 0.0);
    }

    #[test]
    fn validated_entry_rejects_bad_input() {
        let workload = Workload::new(vec![], RunConfig::default());
        assert!(matches!(
            simulate_validated(&workload),
            Err(SimulationError::Invalid(ValidationError::Empty))
        ));
    }
}
