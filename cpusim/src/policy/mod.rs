//! Scheduling policies.
//!
//! A policy looks at the ready set and the running process (if any) before every unit of work
//! and decides who should hold the CPU next. Policies never mutate the simulation: they only
//! return a [`Selection`], which the simulation then carries out.

use crate::{ProcessRecord, Time};

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

mod fcfs;
pub use fcfs::FirstComeFirstServed;

mod priority;
pub use priority::PriorityFirst;

mod round_robin;
pub use round_robin::RoundRobin;

mod shortest_job;
pub use shortest_job::ShortestJobFirst;

/// Decision returned by a [`SchedulerPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Keep the running process on the CPU.
    Continue,
    /// The CPU is free: run the process at this position of the ready set.
    Dispatch(usize),
    /// Push the running process back to the ready set and run the process at this position
    /// of the ready set (position taken before the running process is requeued).
    Preempt(usize),
    /// Nothing to run.
    Idle,
}

/// Implementors are scheduling policies selecting the next process to run.
pub trait SchedulerPolicy: Send {
    /// Selects the process that should hold the CPU for the next unit of work.
    ///
    /// `ready` holds indices into `processes` in the order they entered the ready set, and
    /// `running` is the index of the process currently holding the CPU.
    fn select_next(
        &self,
        ready: &VecDeque<usize>,
        running: Option<usize>,
        processes: &[ProcessRecord],
    ) -> Selection;

    /// Maximum number of units a process may run once dispatched, or `None` if it may run
    /// until it is preempted or completes.
    fn quantum(&self) -> Option<Time> {
        None
    }
}

/// The supported policies.
#[derive(
    Debug,
    PartialEq,
    Eq,
    Clone,
    Copy,
    Hash,
    strum::EnumString,
    strum::Display,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// First come, first served. See [`FirstComeFirstServed`].
    Fcfs,
    /// Shortest original burst first, never preempted. See [`ShortestJobFirst`].
    SjfNonPreemptive,
    /// Shortest remaining time first. See [`ShortestJobFirst`].
    SjfPreemptive,
    /// Most urgent priority first, never preempted. See [`PriorityFirst`].
    PriorityNonPreemptive,
    /// Most urgent priority first, re-evaluated every unit. See [`PriorityFirst`].
    PriorityPreemptive,
    /// FIFO with a fixed time slice. See [`RoundRobin`].
    RoundRobin,
}

impl PolicyKind {
    /// Whether every process must carry a priority under this policy.
    #[must_use]
    pub fn requires_priority(self) -> bool {
        matches!(self, Self::PriorityNonPreemptive | Self::PriorityPreemptive)
    }

    /// Whether this policy needs a quantum.
    #[must_use]
    pub fn requires_quantum(self) -> bool {
        self == Self::RoundRobin
    }

    /// Whether a running process may lose the CPU before it completes.
    #[must_use]
    pub fn is_preemptive(self) -> bool {
        matches!(
            self,
            Self::SjfPreemptive | Self::PriorityPreemptive | Self::RoundRobin
        )
    }

    /// Constructs the policy. `quantum` is only used by round robin, which falls back to a
    /// single unit if none is given.
    #[must_use]
    pub fn build(self, quantum: Option<Time>) -> Box<dyn SchedulerPolicy> {
        match self {
            Self::Fcfs => Box::new(FirstComeFirstServed),
            Self::SjfNonPreemptive => Box::new(ShortestJobFirst::non_preemptive()),
            Self::SjfPreemptive => Box::new(ShortestJobFirst::preemptive()),
            Self::PriorityNonPreemptive => Box::new(PriorityFirst::non_preemptive()),
            Self::PriorityPreemptive => Box::new(PriorityFirst::preemptive()),
            Self::RoundRobin => Box::new(RoundRobin::new(quantum.unwrap_or(1))),
        }
    }
}

/// Finds the ready process with the smallest `key`, breaking ties by arrival and then PID.
/// Returns its position in the ready set and its key.
fn best_candidate<K, F>(
    ready: &VecDeque<usize>,
    processes: &[ProcessRecord],
    key: F,
) -> Option<(usize, K)>
where
    K: Ord + Copy,
    F: Fn(&ProcessRecord) -> K,
{
    ready
        .iter()
        .enumerate()
        .min_by_key(|&(_, &idx)| {
            let process = &processes[idx];
            (key(process), process.arrival(), process.pid())
        })
        .map(|(position, &idx)| (position, key(&processes[idx])))
}

/// Selection shared by non-preemptive policies: the running process always keeps the CPU.
fn select_non_preemptive<K, F>(
    ready: &VecDeque<usize>,
    running: Option<usize>,
    processes: &[ProcessRecord],
    key: F,
) -> Selection
where
    K: Ord + Copy,
    F: Fn(&ProcessRecord) -> K,
{
    if running.is_some() {
        return Selection::Continue;
    }
    best_candidate(ready, processes, key).map_or(Selection::Idle, |(position, _)| {
        Selection::Dispatch(position)
    })
}

/// Selection shared by preemptive policies: the running process is replaced only by a ready
/// process with a strictly smaller key, so on an exact tie it keeps the CPU.
fn select_preemptive<K, F>(
    ready: &VecDeque<usize>,
    running: Option<usize>,
    processes: &[ProcessRecord],
    key: F,
) -> Selection
where
    K: Ord + Copy,
    F: Fn(&ProcessRecord) -> K,
{
    match (best_candidate(ready, processes, &key), running) {
        (None, None) => Selection::Idle,
        (None, Some(_)) => Selection::Continue,
        (Some((position, _)), None) => Selection::Dispatch(position),
        (Some((position, best)), Some(running)) => {
            if key(&processes[running]) <= best {
                Selection::Continue
            } else {
                Selection::Preempt(position)
            }
        }
    }
}
