use super::{select_non_preemptive, select_preemptive, SchedulerPolicy, Selection};
use crate::ProcessRecord;

use std::collections::VecDeque;

/// Priority scheduling, where a lower value means more urgent.
///
/// Ties are broken by arrival, then PID. The preemptive variant re-evaluates before every unit,
/// and the running process keeps the CPU on an exact priority tie.
pub struct PriorityFirst {
    preemptive: bool,
}

impl PriorityFirst {
    /// Constructs the non-preemptive variant.
    #[must_use]
    pub fn non_preemptive() -> Self {
        Self { preemptive: false }
    }

    /// Constructs the preemptive variant.
    #[must_use]
    pub fn preemptive() -> Self {
        Self { preemptive: true }
    }
}

// Priorities are validated to be present before a run starts.
fn priority(process: &ProcessRecord) -> u64 {
    process.priority().unwrap_or(u64::MAX)
}

impl SchedulerPolicy for PriorityFirst {
    fn select_next(
        &self,
        ready: &VecDeque<usize>,
        running: Option<usize>,
        processes: &[ProcessRecord],
    ) -> Selection {
        if self.preemptive {
            select_preemptive(ready, running, processes, priority)
        } else {
            select_non_preemptive(ready, running, processes, priority)
        }
    }
}
