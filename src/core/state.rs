use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};
use std::collections::VecDeque;

use super::{error::TransitionError, event::Event};
use crate::sim::ProcessSpec;

pub type Ticks = u64;
new_key_type! {
    pub struct Pid;
}

pub type ProcessTable = SlotMap<Pid, Process>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstOutcome {
    Blocked,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub id: String,
    pub arrival: Ticks,
    pub burst_count: u32,
    pub burst_duration: Ticks,
    pub io_duration: Ticks,
    pub priority: u8,

    pub state: ProcessState,
    pub bursts_remaining: u32,
    pub remaining_burst: Ticks,
    pub ready_time: Ticks,
    pub ready_since: Option<Ticks>,
    pub last_dispatch: Option<Ticks>,
    pub exec_start: Option<Ticks>,
    pub consumed: Ticks,
    pub dispatches: u32,
    pub preemptions: u32,

    pub admission_start: Option<Ticks>,
    pub admission_end: Option<Ticks>,
    pub first_dispatch: Option<Ticks>,
    pub termination_end: Option<Ticks>,
}

impl Process {
    pub fn new(spec: &ProcessSpec) -> Self {
        Self {
            id: spec.id.clone(),
            arrival: spec.arrival,
            burst_count: spec.burst_count,
            burst_duration: spec.burst_duration,
            io_duration: spec.io_duration,
            priority: spec.priority,
            state: ProcessState::New,
            bursts_remaining: spec.burst_count,
            remaining_burst: spec.burst_duration,
            ready_time: 0,
            ready_since: None,
            last_dispatch: None,
            exec_start: None,
            consumed: 0,
            dispatches: 0,
            preemptions: 0,
            admission_start: None,
            admission_end: None,
            first_dispatch: None,
            termination_end: None,
        }
    }

    fn expect_state(
        &self,
        op: &'static str,
        expected: ProcessState,
    ) -> Result<(), TransitionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TransitionError::IllegalState {
                op,
                from: self.state,
            })
        }
    }

    pub fn admit(&mut self, now: Ticks) -> Result<(), TransitionError> {
        self.expect_state("admit", ProcessState::New)?;
        if self.admission_start.is_some() {
            return Err(TransitionError::IllegalState {
                op: "admit twice",
                from: self.state,
            });
        }
        self.admission_start = Some(now);
        Ok(())
    }

    pub fn finish_admission(&mut self, now: Ticks) -> Result<(), TransitionError> {
        self.expect_state("finish admission", ProcessState::New)?;
        if self.admission_start.is_none() {
            return Err(TransitionError::IllegalState {
                op: "finish admission before admit",
                from: self.state,
            });
        }
        self.state = ProcessState::Ready;
        self.admission_end = Some(now);
        self.ready_since = Some(now);
        Ok(())
    }

    pub fn dispatch(&mut self, now: Ticks, dispatch_cost: Ticks) -> Result<(), TransitionError> {
        self.expect_state("dispatch", ProcessState::Ready)?;
        if let Some(since) = self.ready_since.take() {
            self.ready_time += now.saturating_sub(since);
        }
        self.state = ProcessState::Running;
        self.first_dispatch.get_or_insert(now);
        self.last_dispatch = Some(now);
        self.exec_start = Some(now + dispatch_cost);
        self.dispatches += 1;
        Ok(())
    }

    // Zero while the dispatch cost is still being paid
    fn executed_until(&self, now: Ticks) -> Ticks {
        self.exec_start
            .map_or(0, |start| now.saturating_sub(start))
    }

    pub fn preempt(&mut self, now: Ticks) -> Result<Ticks, TransitionError> {
        self.expect_state("preempt", ProcessState::Running)?;
        let elapsed = self.executed_until(now);
        if elapsed > self.remaining_burst {
            return Err(TransitionError::NegativeRemaining {
                elapsed,
                remaining: self.remaining_burst,
            });
        }

        self.remaining_burst -= elapsed;
        self.consumed += elapsed;
        self.state = ProcessState::Ready;
        self.ready_since = Some(now);
        self.exec_start = None;
        self.preemptions += 1;
        Ok(elapsed)
    }

    pub fn complete_burst(&mut self, now: Ticks) -> Result<BurstOutcome, TransitionError> {
        self.expect_state("complete burst", ProcessState::Running)?;
        let elapsed = self.executed_until(now);
        if elapsed > self.remaining_burst {
            return Err(TransitionError::NegativeRemaining {
                elapsed,
                remaining: self.remaining_burst,
            });
        }
        if elapsed < self.remaining_burst {
            return Err(TransitionError::BurstMismatch {
                elapsed,
                remaining: self.remaining_burst,
            });
        }

        self.consumed += elapsed;
        self.exec_start = None;
        self.bursts_remaining -= 1;
        if self.bursts_remaining == 0 {
            self.remaining_burst = 0;
            self.state = ProcessState::Terminated;
            Ok(BurstOutcome::Terminated)
        } else {
            self.remaining_burst = self.burst_duration;
            self.state = ProcessState::Blocked;
            Ok(BurstOutcome::Blocked)
        }
    }

    pub fn complete_io(&mut self, now: Ticks) -> Result<(), TransitionError> {
        self.expect_state("complete io", ProcessState::Blocked)?;
        self.state = ProcessState::Ready;
        self.ready_since = Some(now);
        Ok(())
    }

    pub fn finish(&mut self, now: Ticks) -> Result<(), TransitionError> {
        self.expect_state("finish", ProcessState::Terminated)?;
        if self.termination_end.is_some() {
            return Err(TransitionError::IllegalState {
                op: "finish twice",
                from: self.state,
            });
        }
        self.termination_end = Some(now);
        Ok(())
    }

    pub fn remaining_at(&self, now: Ticks) -> Ticks {
        if self.state == ProcessState::Running {
            self.remaining_burst
                .saturating_sub(self.executed_until(now))
        } else {
            self.remaining_burst
        }
    }

    pub fn total_remaining_service(&self) -> Ticks {
        Ticks::from(self.bursts_remaining) * self.burst_duration
    }

    pub fn service_time(&self) -> Ticks {
        Ticks::from(self.burst_count) * self.burst_duration
    }

    pub fn is_finished(&self) -> bool {
        self.termination_end.is_some()
    }

    pub fn paying_overhead(&self) -> bool {
        match self.state {
            ProcessState::New => self.admission_start.is_some(),
            ProcessState::Terminated => self.termination_end.is_none(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTime {
    pub idle: Ticks,
    pub os_overhead: Ticks,
    pub user: Ticks,
}

impl CpuTime {
    pub fn total(&self) -> Ticks {
        self.idle + self.os_overhead + self.user
    }
}

#[derive(Debug)]
pub struct SimulationState {
    pub now: Ticks,
    pub processes: ProcessTable,
    pub order: Vec<Pid>,
    pub ready: VecDeque<Pid>,
    pub blocked: FxHashSet<Pid>,
    pub running: Option<Pid>,
    pub cpu: CpuTime,
    pub log: Vec<Event>,

    by_id: FxHashMap<String, Pid>,
}

impl SimulationState {
    pub fn new(specs: &[ProcessSpec]) -> Self {
        let mut processes = SlotMap::with_capacity_and_key(specs.len());
        let mut order = Vec::with_capacity(specs.len());
        let mut by_id = FxHashMap::default();

        for spec in specs {
            let pid = processes.insert(Process::new(spec));
            order.push(pid);
            by_id.insert(spec.id.clone(), pid);
        }

        Self {
            now: 0,
            processes,
            order,
            ready: VecDeque::new(),
            blocked: FxHashSet::default(),
            running: None,
            cpu: CpuTime::default(),
            log: Vec::new(),
            by_id,
        }
    }

    pub fn process(&self, pid: Pid) -> &Process {
        &self.processes[pid]
    }

    pub fn lookup(&self, id: &str) -> Option<&Process> {
        self.by_id.get(id).map(|&pid| self.process(pid))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.order.iter().map(|&pid| self.process(pid))
    }

    pub fn all_finished(&self) -> bool {
        self.processes.values().all(Process::is_finished)
    }

    pub fn unfinished(&self) -> usize {
        self.processes.values().filter(|p| !p.is_finished()).count()
    }

    pub fn cpu_is_idle(&self) -> bool {
        self.running.is_none()
    }

    // A running process may cross from its dispatch window into execution
    // inside one interval
    pub fn advance_to(&mut self, to: Ticks) {
        debug_assert!(to >= self.now, "Clock moved backwards: {} -> {to}", self.now);
        let from = self.now;
        let span = to.saturating_sub(from);

        match self.running.map(|pid| &self.processes[pid]) {
            Some(process) => {
                let exec_start = process.exec_start.unwrap_or(from);
                let overhead = to.min(exec_start).saturating_sub(from);
                self.cpu.os_overhead += overhead;
                self.cpu.user += span - overhead;
            }
            None if self.processes.values().any(Process::paying_overhead) => {
                self.cpu.os_overhead += span;
            }
            None => self.cpu.idle += span,
        }

        self.now = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(bursts: u32, duration: Ticks, io: Ticks) -> ProcessSpec {
        ProcessSpec::new("P1", 0, bursts, duration).with_io(io)
    }

    fn ready_process(bursts: u32, duration: Ticks) -> Process {
        let mut p = Process::new(&spec(bursts, duration, 2));
        p.admit(0).unwrap();
        p.finish_admission(1).unwrap();
        p
    }

    #[test]
    fn ready_time_starts_after_admission() {
        let mut p = Process::new(&spec(1, 5, 0));
        p.admit(0).unwrap();
        p.finish_admission(3).unwrap();
        p.dispatch(7, 1).unwrap();

        assert_eq!(p.ready_time, 4);
        assert_eq!(p.first_dispatch, Some(7));
        assert_eq!(p.exec_start, Some(8));
    }

    #[test]
    fn dispatch_from_new_is_rejected() {
        let mut p = Process::new(&spec(1, 5, 0));
        assert_eq!(
            p.dispatch(0, 0),
            Err(TransitionError::IllegalState {
                op: "dispatch",
                from: ProcessState::New
            })
        );
    }

    #[test]
    fn preempt_excludes_dispatch_cost() {
        let mut p = ready_process(1, 8);
        p.dispatch(1, 2).unwrap();

        assert_eq!(p.remaining_at(6), 5);
        assert_eq!(p.preempt(6).unwrap(), 3);
        assert_eq!(p.remaining_burst, 5);
        assert_eq!(p.state, ProcessState::Ready);
        assert_eq!(p.preemptions, 1);
    }

    #[test]
    fn preempt_inside_dispatch_window_credits_nothing() {
        let mut p = ready_process(1, 8);
        p.dispatch(1, 3).unwrap();

        assert_eq!(p.preempt(2).unwrap(), 0);
        assert_eq!(p.remaining_burst, 8);
    }

    #[test]
    fn burst_completion_blocks_then_terminates() {
        let mut p = ready_process(2, 4);
        p.dispatch(1, 0).unwrap();
        assert_eq!(p.complete_burst(5).unwrap(), BurstOutcome::Blocked);
        assert_eq!(p.remaining_burst, 4);
        assert_eq!(p.bursts_remaining, 1);

        p.complete_io(7).unwrap();
        p.dispatch(7, 0).unwrap();
        assert_eq!(p.complete_burst(11).unwrap(), BurstOutcome::Terminated);
        assert!(p.paying_overhead());

        p.finish(12).unwrap();
        assert!(p.is_finished());
        assert!(!p.paying_overhead());
        assert_eq!(p.consumed, 8);
        assert!(p.finish(13).is_err());
    }

    #[test]
    fn early_burst_completion_is_a_mismatch() {
        let mut p = ready_process(1, 4);
        p.dispatch(1, 0).unwrap();
        assert_eq!(
            p.complete_burst(3),
            Err(TransitionError::BurstMismatch {
                elapsed: 2,
                remaining: 4
            })
        );
    }

    #[test]
    fn late_burst_completion_is_negative_remaining() {
        let mut p = ready_process(1, 4);
        p.dispatch(1, 0).unwrap();
        assert!(matches!(
            p.complete_burst(9),
            Err(TransitionError::NegativeRemaining { .. })
        ));
    }

    #[test]
    fn advance_splits_dispatch_window_from_execution() {
        let mut state = SimulationState::new(&[spec(1, 5, 0)]);
        let pid = state.order[0];
        {
            let p = &mut state.processes[pid];
            p.admit(0).unwrap();
        }
        state.advance_to(1);
        assert_eq!(state.cpu.os_overhead, 1);

        {
            let p = &mut state.processes[pid];
            p.finish_admission(1).unwrap();
            p.dispatch(1, 1).unwrap();
        }
        state.running = Some(pid);
        state.advance_to(7);

        assert_eq!(state.cpu.os_overhead, 2);
        assert_eq!(state.cpu.user, 5);
        assert_eq!(state.cpu.total(), state.now);
    }

    #[test]
    fn idle_before_first_arrival() {
        let mut state = SimulationState::new(&[spec(1, 5, 0)]);
        state.advance_to(4);
        assert_eq!(state.cpu.idle, 4);
        assert_eq!(state.lookup("P1").map(|p| p.state), Some(ProcessState::New));
    }
}
