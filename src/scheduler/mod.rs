pub mod fifo;
pub mod priority;
pub mod round_robin;
pub mod sjf;
pub mod srtf;

use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

use crate::core::{Pid, Process, ProcessTable, Ticks};
pub use fifo::FcfsScheduler;
pub use priority::PriorityScheduler;
pub use round_robin::RoundRobinScheduler;
pub use sjf::SjfScheduler;
pub use srtf::SrtfScheduler;

pub trait Scheduler {
    fn name(&self) -> &'static str;

    fn is_preemptive(&self) -> bool {
        false
    }

    fn time_slice(&self) -> Option<Ticks> {
        None
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        processes: &ProcessTable,
        now: Ticks,
    ) -> Option<Pid>;

    fn should_preempt(&self, _running: &Process, _candidate: &Process, _now: Ticks) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    Fcfs,
    Sjf,
    Srtf,
    RoundRobin,
    Priority {
        #[serde(default = "preemptive_by_default")]
        preemptive: bool,
    },
}

fn preemptive_by_default() -> bool {
    true
}

impl Policy {
    pub fn priority() -> Self {
        Self::Priority { preemptive: true }
    }

    pub fn is_round_robin(&self) -> bool {
        matches!(self, Self::RoundRobin)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fcfs => write!(f, "FCFS"),
            Self::Sjf => write!(f, "SJF"),
            Self::Srtf => write!(f, "SRTF"),
            Self::RoundRobin => write!(f, "RR"),
            Self::Priority { preemptive: true } => write!(f, "Priority"),
            Self::Priority { preemptive: false } => write!(f, "Priority (non-preemptive)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ActivePolicy {
    Fcfs(FcfsScheduler),
    Sjf(SjfScheduler),
    Srtf(SrtfScheduler),
    RoundRobin(RoundRobinScheduler),
    Priority(PriorityScheduler),
}

impl ActivePolicy {
    pub fn new(policy: Policy, time_slice: Option<Ticks>) -> Self {
        match policy {
            Policy::Fcfs => Self::Fcfs(FcfsScheduler),
            Policy::Sjf => Self::Sjf(SjfScheduler),
            Policy::Srtf => Self::Srtf(SrtfScheduler),
            Policy::RoundRobin => {
                debug_assert!(
                    matches!(time_slice, Some(quantum) if quantum > 0),
                    "Round robin needs a positive time slice, got {time_slice:?}"
                );
                Self::RoundRobin(RoundRobinScheduler::new(time_slice.unwrap_or(0)))
            }
            Policy::Priority { preemptive } => Self::Priority(PriorityScheduler { preemptive }),
        }
    }

    fn inner(&self) -> &dyn Scheduler {
        match self {
            Self::Fcfs(s) => s,
            Self::Sjf(s) => s,
            Self::Srtf(s) => s,
            Self::RoundRobin(s) => s,
            Self::Priority(s) => s,
        }
    }
}

impl Scheduler for ActivePolicy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn is_preemptive(&self) -> bool {
        self.inner().is_preemptive()
    }

    fn time_slice(&self) -> Option<Ticks> {
        self.inner().time_slice()
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        processes: &ProcessTable,
        now: Ticks,
    ) -> Option<Pid> {
        self.inner().select_next(ready, processes, now)
    }

    fn should_preempt(&self, running: &Process, candidate: &Process, now: Ticks) -> bool {
        self.inner().should_preempt(running, candidate, now)
    }
}

pub(crate) fn min_by_key_then_arrival<K: Ord>(
    ready: &VecDeque<Pid>,
    processes: &ProcessTable,
    key: impl Fn(&Process) -> K,
) -> Option<Pid> {
    ready
        .iter()
        .copied()
        .min_by(|&a, &b| {
            let (pa, pb) = (&processes[a], &processes[b]);
            key(pa)
                .cmp(&key(pb))
                .then_with(|| pa.arrival.cmp(&pb.arrival))
                .then_with(|| pa.id.cmp(&pb.id))
        })
}
