use std::collections::VecDeque;

use super::{Pid, Process, ProcessTable, Scheduler, Ticks, min_by_key_then_arrival};

#[derive(Debug, Clone, Copy, Default)]
pub struct SrtfScheduler;

impl Scheduler for SrtfScheduler {
    fn name(&self) -> &'static str {
        "SRTF"
    }

    fn is_preemptive(&self) -> bool {
        true
    }

    fn select_next(
        &self,
        ready: &VecDeque<Pid>,
        processes: &ProcessTable,
        now: Ticks,
    ) -> Option<Pid> {
        min_by_key_then_arrival(ready, processes, |p| p.remaining_at(now))
    }

    fn should_preempt(&self, running: &Process, candidate: &Process, now: Ticks) -> bool {
        candidate.remaining_at(now) < running.remaining_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::test_util::{ids, ready_table};
    use crate::sim::ProcessSpec;

    #[test]
    fn ranks_by_current_burst_only() {
        // Lots of total service, but a short current burst.
        let (table, ready) = ready_table(&[
            ProcessSpec::new("Long", 0, 1, 6),
            ProcessSpec::new("Chatty", 0, 10, 2),
        ]);
        assert_eq!(ids(&table, SrtfScheduler.select_next(&ready, &table, 0)), Some("Chatty"));
    }

    #[test]
    fn preempts_only_on_strictly_shorter_remaining() {
        let (mut table, ready) = ready_table(&[
            ProcessSpec::new("P1", 0, 1, 8),
            ProcessSpec::new("P2", 3, 1, 5),
            ProcessSpec::new("P3", 3, 1, 4),
        ]);
        table[ready[0]].dispatch(0, 0).unwrap();
        let (p1, p2, p3) = (&table[ready[0]], &table[ready[1]], &table[ready[2]]);

        // P1 has run 3 of 8 ticks: 5 remain.
        assert!(!SrtfScheduler.should_preempt(p1, p2, 3));
        assert!(SrtfScheduler.should_preempt(p1, p3, 3));
    }
}
