use std::collections::VecDeque;

use super::{Pid, ProcessTable, Scheduler, Ticks, min_by_key_then_arrival};

#[derive(Debug, Clone, Copy, Default)]
pub struct SjfScheduler;

impl Scheduler for SjfScheduler {
    fn name(&self) -> &'static str {
        "SJF"
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        processes: &ProcessTable,
        _now: Ticks,
    ) -> Option<Pid> {
        min_by_key_then_arrival(ready, processes, |p| p.total_remaining_service())
    }
}
