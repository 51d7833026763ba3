use crate::{InvariantError, ProcessRecord, Time};

use std::collections::VecDeque;

/// Processes that have not arrived yet, in the order they will be admitted.
///
/// Admission order is by arrival time, and by input order among simultaneous arrivals.
#[derive(Debug, Clone)]
pub(crate) struct Arrivals {
    pending: VecDeque<usize>,
}

impl Arrivals {
    pub(crate) fn new(processes: &[ProcessRecord]) -> Self {
        let mut pending: Vec<usize> = (0..processes.len()).collect();
        pending.sort_by_key(|&idx| processes[idx].arrival());
        Self {
            pending: pending.into(),
        }
    }

    /// Moves every process that has arrived by `now` from `Waiting` into `ready`.
    /// Returns the number of admitted processes.
    pub(crate) fn admit(
        &mut self,
        now: Time,
        processes: &mut [ProcessRecord],
        ready: &mut VecDeque<usize>,
    ) -> Result<usize, InvariantError> {
        let mut admitted = 0;
        while let Some(&idx) = self.pending.front() {
            if processes[idx].arrival() > now {
                break;
            }
            self.pending.pop_front();
            processes[idx].admit()?;
            log::trace!("[{}] P{} admitted", now, processes[idx].pid());
            ready.push_back(idx);
            admitted += 1;
        }
        Ok(admitted)
    }

    /// Earliest arrival among processes not admitted yet.
    pub(crate) fn next_arrival(&self, processes: &[ProcessRecord]) -> Option<Time> {
        self.pending.front().map(|&idx| processes[idx].arrival())
    }
}
