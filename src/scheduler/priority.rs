use std::{cmp::Reverse, collections::VecDeque};

use super::{Pid, Process, ProcessTable, Scheduler, Ticks, min_by_key_then_arrival};

#[derive(Debug, Clone, Copy)]
pub struct PriorityScheduler {
    pub preemptive: bool,
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self { preemptive: true }
    }
}

impl Scheduler for PriorityScheduler {
    fn name(&self) -> &'static str {
        "Priority"
    }

    fn is_preemptive(&self) -> bool {
        self.preemptive
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        processes: &ProcessTable,
        _now: Ticks,
    ) -> Option<Pid> {
        min_by_key_then_arrival(ready, processes, |p| Reverse(p.priority))
    }

    fn should_preempt(&self, running: &Process, candidate: &Process, _now: Ticks) -> bool {
        self.preemptive && candidate.priority > running.priority
    }
}
