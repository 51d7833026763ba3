use crate::admission::Arrivals;
use crate::clock::Clock;
use crate::{
    InvariantError, Pid, ProcessRecord, ProcessRow, SchedulerPolicy, Selection, Snapshot, Stats,
    Task, Time, Timeline, Workload,
};

use std::collections::{HashMap, VecDeque};

/// Outcome of a single [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Simulated time moved forward.
    Advanced,
    /// Every process has completed; nothing left to do.
    Finished,
}

/// A single run of the scheduler over its own copy of a process set.
///
/// Each [`step`](Self::step) admits arrived processes, lets the policy select who holds the
/// CPU, and then performs one discrete unit of work: one time unit, a round-robin slice, or a
/// jump over idle time to the next arrival.
pub struct Simulation {
    processes: Vec<ProcessRecord>,
    index: HashMap<Pid, usize>,
    arrivals: Arrivals,
    ready: VecDeque<usize>,
    running: Option<usize>,
    slice_left: Time,
    completed: usize,
    clock: Clock,
    timeline: Timeline,
    policy: Box<dyn SchedulerPolicy>,
}

impl Simulation {
    /// Prepares a fresh run of `workload` under its configured policy.
    #[must_use]
    pub fn new(workload: &Workload) -> Self {
        Self::with_policy(workload, workload.policy().build(workload.quantum()))
    }

    /// Prepares a fresh run of `workload` under a custom policy.
    #[must_use]
    pub fn with_policy(workload: &Workload, policy: Box<dyn SchedulerPolicy>) -> Self {
        let processes: Vec<ProcessRecord> = workload
            .processes()
            .iter()
            .copied()
            .map(ProcessRecord::from)
            .collect();
        let index = processes
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.pid(), idx))
            .collect();
        Self {
            arrivals: Arrivals::new(&processes),
            processes,
            index,
            ready: VecDeque::new(),
            running: None,
            slice_left: 0,
            completed: 0,
            clock: Clock::default(),
            timeline: Timeline::default(),
            policy,
        }
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> Time {
        self.clock.now()
    }

    /// Whether every process has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed == self.processes.len()
    }

    /// All processes in input order.
    #[must_use]
    pub fn processes(&self) -> &[ProcessRecord] {
        &self.processes
    }

    /// Looks up a process by its ID.
    #[must_use]
    pub fn process(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.index.get(&pid).map(|&idx| &self.processes[idx])
    }

    /// The process holding the CPU, if any.
    #[must_use]
    pub fn running(&self) -> Option<&ProcessRecord> {
        self.running.map(|idx| &self.processes[idx])
    }

    /// Execution trace so far.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Averages over processes completed so far.
    #[must_use]
    pub fn stats(&self) -> Option<Stats> {
        Stats::from_records(&self.processes)
    }

    /// Copies the current state for an observer.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time(),
            timeline: self.timeline.segments().to_vec(),
            processes: self.processes.iter().map(ProcessRow::from).collect(),
            stats: self.stats(),
            finished: self.is_finished(),
        }
    }

    /// Runs until every process has completed.
    ///
    /// # Errors
    ///
    /// Fails if any internal invariant is broken along the way.
    pub fn run_to_completion(&mut self) -> Result<(), InvariantError> {
        while self.step(false)? == Step::Advanced {}
        Ok(())
    }

    /// Performs one discrete unit of simulated work.
    ///
    /// If `unit_steps` is set, a round-robin slice is carried out one time unit per step, so
    /// that its progress can be observed; otherwise the whole slice is executed at once.
    /// Both produce the same trace.
    ///
    /// # Errors
    ///
    /// Fails if any internal invariant is broken. The simulation must not be stepped again
    /// after an error.
    pub fn step(&mut self, unit_steps: bool) -> Result<Step, InvariantError> {
        if self.is_finished() {
            return Ok(Step::Finished);
        }
        self.admit()?;
        match self
            .policy
            .select_next(&self.ready, self.running, &self.processes)
        {
            Selection::Continue => {
                if self.running.is_none() {
                    return Err(InvariantError::InconsistentDecision {
                        decision: "continue",
                        cpu: "idle",
                    });
                }
            }
            Selection::Dispatch(position) => {
                if self.running.is_some() {
                    return Err(InvariantError::InconsistentDecision {
                        decision: "dispatch without preemption",
                        cpu: "busy",
                    });
                }
                let idx = self.take_ready(position)?;
                self.dispatch(idx)?;
            }
            Selection::Preempt(position) => {
                let preempted = self.running.ok_or(InvariantError::InconsistentDecision {
                    decision: "preempt",
                    cpu: "idle",
                })?;
                let idx = self.take_ready(position)?;
                self.processes[preempted].preempt()?;
                log::debug!(
                    "[{}] P{} preempted by P{}",
                    self.time(),
                    self.processes[preempted].pid(),
                    self.processes[idx].pid()
                );
                self.ready.push_back(preempted);
                self.running = None;
                self.dispatch(idx)?;
            }
            Selection::Idle => {
                if self.running.is_some() {
                    return Err(InvariantError::InconsistentDecision {
                        decision: "idle",
                        cpu: "busy",
                    });
                }
                return self.idle();
            }
        }
        self.execute(unit_steps)?;
        Ok(Step::Advanced)
    }

    fn admit(&mut self) -> Result<usize, InvariantError> {
        self.arrivals
            .admit(self.clock.now(), &mut self.processes, &mut self.ready)
    }

    fn take_ready(&mut self, position: usize) -> Result<usize, InvariantError> {
        let len = self.ready.len();
        self.ready
            .remove(position)
            .ok_or(InvariantError::InvalidSelection { position, len })
    }

    fn dispatch(&mut self, idx: usize) -> Result<(), InvariantError> {
        let process = &mut self.processes[idx];
        process.dispatch(self.clock.now())?;
        log::debug!("[{}] P{} dispatched", self.clock.now(), process.pid());
        if let Some(quantum) = self.policy.quantum() {
            self.slice_left = quantum.min(process.remaining());
        }
        self.running = Some(idx);
        Ok(())
    }

    /// Jumps the clock to the next arrival, recording the gap as idle time.
    fn idle(&mut self) -> Result<Step, InvariantError> {
        let start = self.clock.now();
        let target = self
            .arrivals
            .next_arrival(&self.processes)
            .ok_or(InvariantError::Stalled {
                time: start,
                incomplete: self.processes.len() - self.completed,
            })?;
        let gap = self.clock.jump_to(target)?;
        self.timeline.record(Task::Idle, start, gap)?;
        log::debug!("[{}] CPU idle until {}", start, target);
        Ok(Step::Advanced)
    }

    /// Runs the process holding the CPU for one unit, or for the rest of its round-robin slice.
    fn execute(&mut self, unit_steps: bool) -> Result<(), InvariantError> {
        let idx = self.running.ok_or(InvariantError::InconsistentDecision {
            decision: "execute",
            cpu: "idle",
        })?;
        let sliced = self.policy.quantum().is_some();
        let units = if sliced && !unit_steps {
            self.slice_left
        } else {
            1
        };
        let start = self.clock.now();
        let pid = self.processes[idx].pid();
        self.clock.advance(units)?;
        self.processes[idx].run_for(units)?;
        self.timeline.record(Task::Process(pid), start, units)?;
        log::trace!("[{}] P{} ran for {}", start, pid, units);
        if sliced {
            self.slice_left = self.slice_left.saturating_sub(units);
            // Arrivals during the slice queue up ahead of the process that used it.
            self.admit()?;
        }
        let now = self.clock.now();
        if self.processes[idx].remaining() == 0 {
            self.processes[idx].complete(now)?;
            log::debug!("[{}] P{} completed", now, pid);
            self.completed += 1;
            self.running = None;
            self.slice_left = 0;
        } else if sliced && self.slice_left == 0 {
            self.processes[idx].preempt()?;
            log::debug!("[{}] P{} used up its quantum", now, pid);
            self.ready.push_back(idx);
            self.running = None;
        }
        Ok(())
    }
}
