use super::state::{ProcessState, SimulationState};

#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, state: &SimulationState) {
        self.step += 1;

        debug_assert_eq!(
            state.cpu.total(),
            state.now,
            "CPU time buckets {:?} must cover the clock at step {}",
            state.cpu,
            self.step
        );

        if let Some(pid) = state.running {
            let process = state.process(pid);
            debug_assert_eq!(
                process.state,
                ProcessState::Running,
                "Running process {} must be Running",
                process.id
            );
            debug_assert!(
                !state.ready.contains(&pid) && !state.blocked.contains(&pid),
                "Running process {} must not be queued",
                process.id
            );
        }

        for (index, &pid) in state.ready.iter().enumerate() {
            let process = state.process(pid);
            debug_assert_eq!(
                process.state,
                ProcessState::Ready,
                "Process {} in ready queue must be Ready",
                process.id
            );
            debug_assert!(
                !state.ready.iter().skip(index + 1).any(|&other| other == pid),
                "Process {} appears twice in the ready queue",
                process.id
            );
        }

        for &pid in &state.blocked {
            let process = state.process(pid);
            debug_assert_eq!(
                process.state,
                ProcessState::Blocked,
                "Process {} in blocked set must be Blocked",
                process.id
            );
        }

        for (pid, process) in &state.processes {
            match process.state {
                ProcessState::Ready => debug_assert!(
                    state.ready.contains(&pid),
                    "Ready process {} missing from ready queue",
                    process.id
                ),
                ProcessState::Blocked => debug_assert!(
                    state.blocked.contains(&pid),
                    "Blocked process {} missing from blocked set",
                    process.id
                ),
                ProcessState::Running => debug_assert_eq!(
                    state.running,
                    Some(pid),
                    "Process {} is Running without holding the CPU",
                    process.id
                ),
                ProcessState::New | ProcessState::Terminated => {}
            }
        }
    }
}
