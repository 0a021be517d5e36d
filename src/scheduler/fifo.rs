use std::collections::VecDeque;

use super::{Pid, ProcessTable, Scheduler, Ticks};

#[derive(Debug, Clone, Copy, Default)]
pub struct FcfsScheduler;

impl Scheduler for FcfsScheduler {
    fn name(&self) -> &'static str {
        "FCFS"
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
