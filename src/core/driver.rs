use tracing::{debug, info, trace, warn};

use super::{
    error::{EngineError, TransitionError},
    event::{Event, EventKind, PreemptCause},
    observer::Observer,
    queue::{EventId, EventQueue, PendingEvent},
    state::{BurstOutcome, Pid, Process, SimulationState, Ticks},
};
use crate::{
    scheduler::{ActivePolicy, Scheduler},
    sim::{RunConfig, Workload},
};

pub struct Engine {
    pub state: SimulationState,
    policy: ActivePolicy,
    config: RunConfig,
    queue: EventQueue,
    observer: Observer,
    // At most one dispatch evaluation is queued at a time
    dispatch_pending: bool,
    // Burst completion and slice expiry of the current run
    running_events: Vec<EventId>,
    handled: usize,
}

impl Engine {
    pub fn new(workload: &Workload) -> Self {
        let state = SimulationState::new(&workload.processes);
        let mut queue = EventQueue::new();
        for &pid in &state.order {
            queue.push(state.process(pid).arrival, EventKind::Arrival, Some(pid));
        }

        Self {
            state,
            policy: ActivePolicy::new(workload.config.policy, workload.config.time_slice),
            config: workload.config.clone(),
            queue,
            observer: Observer::new(),
            dispatch_pending: false,
            running_events: Vec::new(),
            handled: 0,
        }
    }

    pub fn now(&self) -> Ticks {
        self.state.now
    }

    pub fn policy(&self) -> &ActivePolicy {
        &self.policy
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn events_handled(&self) -> usize {
        self.handled
    }

    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn into_state(self) -> SimulationState {
        self.state
    }

    pub fn step(&mut self) -> Result<&[Event], EngineError> {
        let log_start = self.state.log.len();
        let Some(event) = self.queue.pop() else {
            return Ok(&[]);
        };
        self.handled += 1;
        self.state.advance_to(event.time);

        match event.kind {
            EventKind::Arrival => self.on_arrival(event)?,
            EventKind::AdmissionComplete => self.on_admission_complete(event)?,
            EventKind::Dispatch => self.on_dispatch()?,
            EventKind::Terminate | EventKind::Block => self.on_burst_complete(event)?,
            EventKind::Preempt(_) => self.on_time_slice(event)?,
            EventKind::IoComplete => self.on_io_complete(event)?,
            EventKind::TerminationComplete => self.on_termination_complete(event)?,
        }

        self.observer.observe(&self.state);
        Ok(&self.state.log[log_start..])
    }

    pub fn run(&mut self) -> Result<(), EngineError> {
        info!(
            policy = self.policy.name(),
            processes = self.state.processes.len(),
            "simulation started"
        );

        while !self.state.all_finished() {
            if self.handled >= self.config.max_events {
                let unfinished = self.state.unfinished();
                warn!(
                    limit = self.config.max_events,
                    at = self.state.now,
                    unfinished,
                    "event limit reached"
                );
                return Err(EngineError::EventLimitExceeded {
                    limit: self.config.max_events,
                    at: self.state.now,
                    unfinished,
                });
            }
            if self.queue.is_empty() {
                return Err(EngineError::Stalled {
                    at: self.state.now,
                    unfinished: self.state.unfinished(),
                });
            }
            self.step()?;
        }

        info!(
            policy = self.policy.name(),
            clock = self.state.now,
            events = self.handled,
            "simulation finished"
        );
        Ok(())
    }

    fn pid(event: &PendingEvent) -> Result<Pid, EngineError> {
        event.pid.ok_or(EngineError::UnknownProcess {
            event: event.kind,
            at: event.time,
        })
    }

    fn transition<T>(
        &mut self,
        pid: Pid,
        event: EventKind,
        apply: impl FnOnce(&mut Process) -> Result<T, TransitionError>,
    ) -> Result<T, EngineError> {
        let at = self.state.now;
        let process = self
            .state
            .processes
            .get_mut(pid)
            .ok_or(EngineError::UnknownProcess { event, at })?;
        apply(&mut *process).map_err(|source| EngineError::Transition {
            process: process.id.clone(),
            event,
            at,
            source,
        })
    }

    fn record(&mut self, kind: EventKind, pid: Pid, annotation: Option<String>) {
        let id = self.state.process(pid).id.clone();
        debug!(t = self.state.now, ?kind, process = %id, "event");
        let event = Event::new(self.state.now, kind, id);
        self.state.log.push(match annotation {
            Some(note) => event.with_annotation(note),
            None => event,
        });
    }

    fn request_dispatch(&mut self) {
        if self.state.cpu_is_idle() && !self.state.ready.is_empty() && !self.dispatch_pending {
            self.queue.push(self.state.now, EventKind::Dispatch, None);
            self.dispatch_pending = true;
        }
    }

    fn on_arrival(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        let now = self.state.now;
        self.transition(pid, event.kind, |p| p.admit(now))?;
        self.record(EventKind::Arrival, pid, None);

        self.queue.push(
            now + self.config.admission_cost,
            EventKind::AdmissionComplete,
            Some(pid),
        );
        Ok(())
    }

    fn on_admission_complete(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        let now = self.state.now;
        self.transition(pid, event.kind, |p| p.finish_admission(now))?;
        self.record(EventKind::AdmissionComplete, pid, None);
        self.make_ready(pid)
    }

    fn on_io_complete(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        let now = self.state.now;
        self.transition(pid, event.kind, |p| p.complete_io(now))?;
        self.state.blocked.remove(&pid);
        self.record(EventKind::IoComplete, pid, None);
        self.make_ready(pid)
    }

    fn make_ready(&mut self, pid: Pid) -> Result<(), EngineError> {
        if let Some(running) = self.state.running {
            let now = self.state.now;
            let preempt = self.policy.is_preemptive()
                && self.policy.should_preempt(
                    self.state.process(running),
                    self.state.process(pid),
                    now,
                );
            trace!(
                running = %self.state.process(running).id,
                candidate = %self.state.process(pid).id,
                preempt,
                "preemption check"
            );
            if preempt {
                self.preempt_running(running, PreemptCause::Policy, Some(pid))?;
            }
        }

        self.state.ready.push_back(pid);
        self.request_dispatch();
        Ok(())
    }

    fn preempt_running(
        &mut self,
        pid: Pid,
        cause: PreemptCause,
        by: Option<Pid>,
    ) -> Result<(), EngineError> {
        let kind = EventKind::Preempt(cause);
        if self.state.running != Some(pid) {
            return Err(EngineError::NotRunning {
                process: self.state.process(pid).id.clone(),
                event: kind,
                at: self.state.now,
            });
        }

        for id in self.running_events.drain(..) {
            self.queue.cancel(id);
        }

        let now = self.state.now;
        let elapsed = self.transition(pid, kind, |p| p.preempt(now))?;
        self.state.running = None;

        let remaining = self.state.process(pid).remaining_burst;
        let annotation = match by {
            Some(other) => format!(
                "preempted by {} after {elapsed} ticks, {remaining} remaining",
                self.state.process(other).id
            ),
            None => format!("time slice expired after {elapsed} ticks, {remaining} remaining"),
        };
        self.record(kind, pid, Some(annotation));
        self.state.ready.push_back(pid);
        Ok(())
    }

    fn on_time_slice(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        self.preempt_running(pid, PreemptCause::TimeSlice, None)?;
        self.request_dispatch();
        Ok(())
    }

    fn on_dispatch(&mut self) -> Result<(), EngineError> {
        self.dispatch_pending = false;
        let now = self.state.now;

        if let Some(running) = self.state.running {
            return Err(EngineError::CpuOccupied {
                running: self.state.process(running).id.clone(),
                at: now,
            });
        }

        let Some(pid) = self
            .policy
            .select_next(&self.state.ready, &self.state.processes, now)
        else {
            return Ok(());
        };
        trace!(
            policy = self.policy.name(),
            selected = %self.state.process(pid).id,
            "dispatch decision"
        );
        if let Some(index) = self.state.ready.iter().position(|&p| p == pid) {
            self.state.ready.remove(index);
        }

        let cost = self.config.dispatch_cost;
        self.transition(pid, EventKind::Dispatch, |p| p.dispatch(now, cost))?;
        self.state.running = Some(pid);

        let process = self.state.process(pid);
        let exec_start = now + cost;
        let completion = exec_start + process.remaining_burst;
        let completion_kind = if process.bursts_remaining == 1 {
            EventKind::Terminate
        } else {
            EventKind::Block
        };
        let annotation =
            (cost > 0).then(|| format!("dispatch cost {cost}, runs from t={exec_start}"));
        self.record(EventKind::Dispatch, pid, annotation);

        self.running_events.clear();
        self.running_events
            .push(self.queue.push(completion, completion_kind, Some(pid)));

        // The slice is measured from when execution actually starts
        if let Some(quantum) = self.policy.time_slice() {
            let expiry = exec_start + quantum;
            if expiry < completion {
                self.running_events.push(self.queue.push(
                    expiry,
                    EventKind::Preempt(PreemptCause::TimeSlice),
                    Some(pid),
                ));
            }
        }
        Ok(())
    }

    fn on_burst_complete(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        let now = self.state.now;
        if self.state.running != Some(pid) {
            return Err(EngineError::NotRunning {
                process: self.state.process(pid).id.clone(),
                event: event.kind,
                at: now,
            });
        }

        self.running_events.clear();
        let outcome = self.transition(pid, event.kind, |p| p.complete_burst(now))?;
        self.state.running = None;
        debug_assert_eq!(
            outcome == BurstOutcome::Terminated,
            event.kind == EventKind::Terminate,
            "Burst completion kind disagrees with bursts remaining"
        );

        match outcome {
            BurstOutcome::Blocked => {
                let until = now + self.state.process(pid).io_duration;
                self.record(EventKind::Block, pid, Some(format!("I/O until t={until}")));
                self.state.blocked.insert(pid);
                self.queue.push(until, EventKind::IoComplete, Some(pid));
            }
            BurstOutcome::Terminated => {
                self.record(EventKind::Terminate, pid, None);
                self.queue.push(
                    now + self.config.termination_cost,
                    EventKind::TerminationComplete,
                    Some(pid),
                );
            }
        }

        self.request_dispatch();
        Ok(())
    }

    fn on_termination_complete(&mut self, event: PendingEvent) -> Result<(), EngineError> {
        let pid = Self::pid(&event)?;
        let now = self.state.now;
        self.transition(pid, event.kind, |p| p.finish(now))?;
        self.record(EventKind::TerminationComplete, pid, None);
        Ok(())
    }
}
