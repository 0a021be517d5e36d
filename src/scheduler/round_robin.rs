use std::collections::VecDeque;

use super::{Pid, ProcessTable, Scheduler, Ticks};

#[derive(Debug, Clone, Copy)]
pub struct RoundRobinScheduler {
    quantum: Ticks,
}

impl RoundRobinScheduler {
    pub fn new(quantum: Ticks) -> Self {
        Self { quantum }
    }
}

impl Scheduler for RoundRobinScheduler {
    fn name(&self) -> &'static str {
        "RR"
    }

    fn is_preemptive(&self) -> bool {
        true
    }

    fn time_slice(&self) -> Option<Ticks> {
        Some(self.quantum)
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        _processes: &ProcessTable,
        _now: Ticks,
    ) -> Option<Pid> {
        ready.front().copied()
    }
}
