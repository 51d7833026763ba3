use crate::{InvariantError, Pid, Time};

use delegate::delegate;
use serde::{Deserialize, Serialize};

/// Lifecycle of a simulated process.
///
/// `Waiting → Ready → Running ⇄ Ready → Completed`, where `Completed` is terminal.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, strum::Display, strum::EnumString, Serialize, Deserialize,
)]
pub enum Status {
    /// Has not arrived yet.
    Waiting,
    /// Arrived and waiting for the CPU.
    Ready,
    /// Holds the CPU.
    Running,
    /// All service time delivered.
    Completed,
}

/// Process definition as supplied by the caller, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    /// Unique process ID.
    pub pid: Pid,
    /// Time at which the process becomes eligible to run.
    pub arrival: i64,
    /// Total service time required.
    pub burst: i64,
    /// Scheduling priority; lower value means more urgent.
    #[serde(default)]
    pub priority: Option<i64>,
}

impl ProcessSpec {
    /// Constructs a process definition without a priority.
    #[must_use]
    pub fn new(pid: usize, arrival: i64, burst: i64) -> Self {
        Self {
            pid: Pid::from(pid),
            arrival,
            burst,
            priority: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Validated, immutable process definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessDef {
    pid: Pid,
    arrival: Time,
    burst: Time,
    priority: Option<u64>,
}

impl ProcessDef {
    pub(crate) fn new(pid: Pid, arrival: Time, burst: Time, priority: Option<u64>) -> Self {
        Self {
            pid,
            arrival,
            burst,
            priority,
        }
    }

    /// Process ID.
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Arrival time.
    #[must_use]
    pub fn arrival(&self) -> Time {
        self.arrival
    }

    /// Total service time.
    #[must_use]
    pub fn burst(&self) -> Time {
        self.burst
    }

    /// Priority, if any. Lower is more urgent.
    #[must_use]
    pub fn priority(&self) -> Option<u64> {
        self.priority
    }
}

/// One simulated process together with its run-time state.
///
/// Records are only ever created fresh from a [`ProcessDef`], so every run starts from
/// `remaining = burst` and `Waiting`, regardless of what happened to earlier runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    def: ProcessDef,
    remaining: Time,
    start_time: Option<Time>,
    finish_time: Option<Time>,
    wait_time: Option<Time>,
    turnaround_time: Option<Time>,
    status: Status,
}

impl From<ProcessDef> for ProcessRecord {
    fn from(def: ProcessDef) -> Self {
        Self {
            def,
            remaining: def.burst(),
            start_time: None,
            finish_time: None,
            wait_time: None,
            turnaround_time: None,
            status: Status::Waiting,
        }
    }
}

impl ProcessRecord {
    delegate! {
        to self.def {
            /// Process ID.
            #[must_use]
            pub fn pid(&self) -> Pid;
            /// Arrival time.
            #[must_use]
            pub fn arrival(&self) -> Time;
            /// Total service time.
            #[must_use]
            pub fn burst(&self) -> Time;
            /// Priority, if any. Lower is more urgent.
            #[must_use]
            pub fn priority(&self) -> Option<u64>;
        }
    }

    /// Service time still owed.
    #[must_use]
    pub fn remaining(&self) -> Time {
        self.remaining
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// First time the process was dispatched.
    #[must_use]
    pub fn start_time(&self) -> Option<Time> {
        self.start_time
    }

    /// Time at which the process completed.
    #[must_use]
    pub fn finish_time(&self) -> Option<Time> {
        self.finish_time
    }

    /// Time spent ready but not running. Only known once completed.
    #[must_use]
    pub fn wait_time(&self) -> Option<Time> {
        self.wait_time
    }

    /// Time from arrival to completion. Only known once completed.
    #[must_use]
    pub fn turnaround_time(&self) -> Option<Time> {
        self.turnaround_time
    }

    /// Whether the process is done.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    fn transition(&mut self, from: Status, to: Status) -> Result<(), InvariantError> {
        if self.status == from {
            self.status = to;
            Ok(())
        } else {
            Err(InvariantError::InvalidTransition {
                pid: self.pid(),
                from: self.status,
                to,
            })
        }
    }

    pub(crate) fn admit(&mut self) -> Result<(), InvariantError> {
        self.transition(Status::Waiting, Status::Ready)
    }

    pub(crate) fn dispatch(&mut self, now: Time) -> Result<(), InvariantError> {
        self.transition(Status::Ready, Status::Running)?;
        self.start_time.get_or_insert(now);
        Ok(())
    }

    pub(crate) fn preempt(&mut self) -> Result<(), InvariantError> {
        self.transition(Status::Running, Status::Ready)
    }

    pub(crate) fn run_for(&mut self, units: Time) -> Result<(), InvariantError> {
        if self.status != Status::Running {
            return Err(InvariantError::InvalidTransition {
                pid: self.pid(),
                from: self.status,
                to: Status::Running,
            });
        }
        self.remaining = self.remaining.checked_sub(units).ok_or_else(|| {
            InvariantError::RemainingUnderflow {
                pid: self.pid(),
                remaining: self.remaining,
                units,
            }
        })?;
        Ok(())
    }

    pub(crate) fn complete(&mut self, now: Time) -> Result<(), InvariantError> {
        if self.remaining > 0 {
            return Err(InvariantError::PrematureCompletion {
                pid: self.pid(),
                remaining: self.remaining,
            });
        }
        let turnaround = now
            .checked_sub(self.arrival())
            .ok_or_else(|| InvariantError::NegativeWait(self.pid()))?;
        let wait = turnaround
            .checked_sub(self.burst())
            .ok_or_else(|| InvariantError::NegativeWait(self.pid()))?;
        self.transition(Status::Running, Status::Completed)?;
        self.finish_time = Some(now);
        self.turnaround_time = Some(turnaround);
        self.wait_time = Some(wait);
        Ok(())
    }
}
