pub mod driver;
pub mod metrics;
pub mod workload;

pub use driver::{RunError, Sim, SimulationError, SimulationReport, simulate, simulate_validated};
pub use metrics::{BatchMetrics, Metrics, MetricsCalculator, ProcessMetrics};
pub use workload::{
    DEFAULT_MAX_EVENTS, DEFAULT_PRIORITY, ProcessSpec, RunConfig, ValidationError, Workload,
};
