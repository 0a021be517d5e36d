use thiserror::Error;

use super::{event::EventKind, state::ProcessState, Ticks};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {op} from state {from:?}")]
    IllegalState {
        op: &'static str,
        from: ProcessState,
    },

    #[error("negative remaining time: {elapsed} ticks elapsed with {remaining} remaining")]
    NegativeRemaining { elapsed: Ticks, remaining: Ticks },

    #[error("burst completion after {elapsed} ticks of execution, expected {remaining}")]
    BurstMismatch { elapsed: Ticks, remaining: Ticks },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("process {process} at t={at} while handling {event:?}: {source}")]
    Transition {
        process: String,
        event: EventKind,
        at: Ticks,
        #[source]
        source: TransitionError,
    },

    #[error("dispatch at t={at} while {running} still holds the CPU")]
    CpuOccupied { running: String, at: Ticks },

    #[error("{event:?} for {process} at t={at}, but it does not hold the CPU")]
    NotRunning {
        process: String,
        event: EventKind,
        at: Ticks,
    },

    #[error("event {event:?} at t={at} references an unknown process")]
    UnknownProcess { event: EventKind, at: Ticks },

    #[error("event queue drained at t={at} with {unfinished} process(es) unfinished")]
    Stalled { at: Ticks, unfinished: usize },

    #[error("event limit {limit} exceeded at t={at} with {unfinished} process(es) unfinished")]
    EventLimitExceeded {
        limit: usize,
        at: Ticks,
        unfinished: usize,
    },
}
