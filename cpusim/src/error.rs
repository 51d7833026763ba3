use crate::{Pid, PolicyKind, Status, Time};

/// Rejected input. Raised before a run begins; the run never starts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Nothing to simulate.
    #[error("No processes to simulate.")]
    EmptyWorkload,
    /// Two definitions share the same PID.
    #[error("Process with PID {0} already exists.")]
    DuplicatePid(Pid),
    /// Arrival time must be at least 0.
    #[error("Process {pid} has negative arrival time {arrival}.")]
    NegativeArrival {
        /// Offending process.
        pid: Pid,
        /// Supplied arrival time.
        arrival: i64,
    },
    /// Burst time must be greater than 0.
    #[error("Process {pid} has non-positive burst time {burst}.")]
    NonPositiveBurst {
        /// Offending process.
        pid: Pid,
        /// Supplied burst time.
        burst: i64,
    },
    /// The selected policy orders by priority but the process has none.
    #[error("Process {pid} has no priority, which is required by {policy}.")]
    MissingPriority {
        /// Offending process.
        pid: Pid,
        /// Selected policy.
        policy: PolicyKind,
    },
    /// Priorities are non-negative.
    #[error("Process {pid} has negative priority {priority}.")]
    NegativePriority {
        /// Offending process.
        pid: Pid,
        /// Supplied priority.
        priority: i64,
    },
    /// Round robin without a quantum.
    #[error("Quantum is required for round robin.")]
    MissingQuantum,
    /// Round robin with a quantum of 0 or less.
    #[error("Quantum must be a positive integer, got {0}.")]
    NonPositiveQuantum(i64),
}

/// Control surface misuse. Rejected without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConcurrencyError {
    /// A run is still active.
    #[error("Simulation is already running.")]
    AlreadyRunning,
    /// There is no run to pause or resume.
    #[error("Simulation is not running.")]
    NotRunning,
}

/// An internal invariant broke during a run. Fatal to that run only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    /// A process was asked to run for longer than its remaining time.
    #[error("Process {pid} cannot run {units} units with only {remaining} remaining.")]
    RemainingUnderflow {
        /// Process.
        pid: Pid,
        /// Remaining service time.
        remaining: Time,
        /// Requested units.
        units: Time,
    },
    /// A state transition was requested from the wrong state.
    #[error("Process {pid} cannot become {to} while {from}.")]
    InvalidTransition {
        /// Process.
        pid: Pid,
        /// Current status.
        from: Status,
        /// Requested status.
        to: Status,
    },
    /// Completion requested while service time is still owed.
    #[error("Process {pid} completed with {remaining} units remaining.")]
    PrematureCompletion {
        /// Process.
        pid: Pid,
        /// Remaining service time.
        remaining: Time,
    },
    /// Derived wait time would be negative.
    #[error("Process {0} finished before it could have been served.")]
    NegativeWait(Pid),
    /// The policy selected a position outside of the ready set.
    #[error("Selected position {position} is outside of the ready set of size {len}.")]
    InvalidSelection {
        /// Selected position.
        position: usize,
        /// Size of the ready set.
        len: usize,
    },
    /// The policy decision does not agree with the CPU state.
    #[error("Cannot {decision} while the CPU is {cpu}.")]
    InconsistentDecision {
        /// What the policy decided.
        decision: &'static str,
        /// Whether the CPU is busy or idle.
        cpu: &'static str,
    },
    /// The clock was asked to move backwards.
    #[error("Clock cannot move from {now} back to {target}.")]
    ClockRewind {
        /// Current time.
        now: Time,
        /// Requested time.
        target: Time,
    },
    /// Advancing the clock would exceed the largest representable time.
    #[error("Clock cannot advance by {units} units from {now} without overflowing.")]
    ClockOverflow {
        /// Current time.
        now: Time,
        /// Requested units.
        units: Time,
    },
    /// The worker thread panicked in the middle of a run.
    #[error("Simulation worker panicked at time {time}.")]
    WorkerPanicked {
        /// Last time reached before the panic.
        time: Time,
    },
    /// A timeline segment does not start where the previous one ended.
    #[error("Segment starting at {start} does not continue the timeline ending at {end}.")]
    DetachedSegment {
        /// Segment start.
        start: Time,
        /// Current end of the timeline.
        end: Time,
    },
    /// Nothing can run and nothing will arrive, yet some processes are not done.
    #[error("Simulation stalled at time {time} with {incomplete} incomplete processes.")]
    Stalled {
        /// Time of the stall.
        time: Time,
        /// Number of processes that have not completed.
        incomplete: usize,
    },
}

/// Any error surfaced by the library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`ConcurrencyError`].
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),
    /// See [`InvariantError`].
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}
