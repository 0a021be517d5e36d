pub mod driver;
pub mod error;
pub mod event;
pub mod observer;
pub mod queue;
pub mod state;

pub use driver::Engine;
pub use error::{EngineError, TransitionError};
pub use event::{Event, EventKind, PreemptCause};
pub use queue::{EventId, EventQueue};
pub use state::{
    BurstOutcome, CpuTime, Pid, Process, ProcessState, ProcessTable, SimulationState, Ticks,
};
