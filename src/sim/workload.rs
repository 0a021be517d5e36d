use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{core::Ticks, scheduler::Policy};

pub const DEFAULT_PRIORITY: u8 = 1;
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 100;

pub const DEFAULT_MAX_EVENTS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: String,
    pub arrival: Ticks,
    pub burst_count: u32,
    pub burst_duration: Ticks,
    #[serde(default)]
    pub io_duration: Ticks,
    // Higher is more urgent
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

impl ProcessSpec {
    pub fn new(
        id: impl Into<String>,
        arrival: Ticks,
        burst_count: u32,
        burst_duration: Ticks,
    ) -> Self {
        Self {
            id: id.into(),
            arrival,
            burst_count,
            burst_duration,
            io_duration: 0,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_io(mut self, io_duration: Ticks) -> Self {
        self.io_duration = io_duration;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub policy: Policy,
    #[serde(default)]
    pub admission_cost: Ticks,
    #[serde(default)]
    pub termination_cost: Ticks,
    #[serde(default)]
    pub dispatch_cost: Ticks,
    #[serde(default)]
    pub time_slice: Option<Ticks>,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

fn default_max_events() -> usize {
    DEFAULT_MAX_EVENTS
}

impl RunConfig {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn round_robin(quantum: Ticks) -> Self {
        Self::new(Policy::RoundRobin).with_time_slice(quantum)
    }

    pub fn with_admission_cost(mut self, cost: Ticks) -> Self {
        self.admission_cost = cost;
        self
    }

    pub fn with_termination_cost(mut self, cost: Ticks) -> Self {
        self.termination_cost = cost;
        self
    }

    pub fn with_dispatch_cost(mut self, cost: Ticks) -> Self {
        self.dispatch_cost = cost;
        self
    }

    pub fn with_costs(self, admission: Ticks, termination: Ticks, dispatch: Ticks) -> Self {
        self.with_admission_cost(admission)
            .with_termination_cost(termination)
            .with_dispatch_cost(dispatch)
    }

    pub fn with_time_slice(mut self, quantum: Ticks) -> Self {
        self.time_slice = Some(quantum);
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            policy: Policy::Fcfs,
            admission_cost: 0,
            termination_cost: 0,
            dispatch_cost: 0,
            time_slice: None,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub processes: Vec<ProcessSpec>,
    pub config: RunConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workload has no processes; add at least one")]
    Empty,

    #[error("process id {id:?} is invalid; use a letter followed by letters, digits or '_'")]
    InvalidId { id: String },

    #[error("process id {id:?} appears more than once; ids must be unique")]
    DuplicateId { id: String },

    #[error("process {id}: {field} must be {expected}, got {got}")]
    OutOfRange {
        id: String,
        field: &'static str,
        expected: &'static str,
        got: u64,
    },

    #[error("round robin needs a time slice greater than 0; set `time_slice`")]
    MissingTimeSlice,

    #[error(
        "time slice is only meaningful for round robin; remove it or switch policy to round_robin"
    )]
    UnexpectedTimeSlice,
}

fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Workload {
    pub fn new(processes: Vec<ProcessSpec>, config: RunConfig) -> Self {
        Self { processes, config }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.processes.is_empty() {
            return Err(ValidationError::Empty);
        }

        let mut seen = FxHashSet::default();
        for spec in &self.processes {
            if !is_valid_id(&spec.id) {
                return Err(ValidationError::InvalidId { id: spec.id.clone() });
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(ValidationError::DuplicateId { id: spec.id.clone() });
            }

            let out_of_range = |field, expected, got| ValidationError::OutOfRange {
                id: spec.id.clone(),
                field,
                expected,
                got,
            };
            if spec.burst_count == 0 {
                return Err(out_of_range("burst_count", "at least 1", 0));
            }
            if spec.burst_duration == 0 {
                return Err(out_of_range("burst_duration", "greater than 0", 0));
            }
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&spec.priority) {
                return Err(out_of_range(
                    "priority",
                    "between 1 and 100",
                    u64::from(spec.priority),
                ));
            }
        }

        match (self.config.policy.is_round_robin(), self.config.time_slice) {
            (true, None | Some(0)) => Err(ValidationError::MissingTimeSlice),
            (false, Some(_)) => Err(ValidationError::UnexpectedTimeSlice),
            _ => Ok(()),
        }
    }
}
