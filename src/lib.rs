pub mod core;
pub mod scheduler;
pub mod sim;

pub use crate::core::{Engine, EngineError, Event, EventKind, PreemptCause};
pub use scheduler::{Policy, Scheduler};
pub use sim::{
    Metrics, ProcessSpec, RunConfig, RunError, Sim, SimulationError, SimulationReport,
    ValidationError, Workload, simulate, simulate_validated,
};
