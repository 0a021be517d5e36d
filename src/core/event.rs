use serde::{Deserialize, Serialize};

use super::Ticks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreemptCause {
    TimeSlice,
    Policy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Terminate,
    Block,
    Preempt(PreemptCause),
    IoComplete,
    Arrival,
    AdmissionComplete,
    Dispatch,
    TerminationComplete,
}

impl EventKind {
    // Arrival and admission completion share a rank
    pub fn rank(self) -> u8 {
        match self {
            Self::Terminate => 1,
            Self::Block => 2,
            Self::Preempt(_) => 3,
            Self::IoComplete => 4,
            Self::Arrival | Self::AdmissionComplete => 5,
            Self::Dispatch => 6,
            Self::TerminationComplete => 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub time: Ticks,
    pub kind: EventKind,
    pub process: Option<String>,
    pub annotation: Option<String>,
}

impl Event {
    pub fn new(time: Ticks, kind: EventKind, process: impl Into<String>) -> Self {
        Self {
            time,
            kind,
            process: Some(process.into()),
            annotation: None,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn is_policy_preemption(&self) -> bool {
        self.kind == EventKind::Preempt(PreemptCause::Policy)
    }
}
