use super::{SchedulerPolicy, Selection};
use crate::{ProcessRecord, Time};

use std::collections::VecDeque;

/// Serves the ready set in strict FIFO order, granting each dispatch at most `quantum` units.
///
/// A process that does not finish within its slice goes to the back of the ready set, behind
/// any process that arrived during the slice.
pub struct RoundRobin {
    quantum: Time,
}

impl RoundRobin {
    /// Constructs a round-robin policy with the given time slice.
    #[must_use]
    pub fn new(quantum: Time) -> Self {
        Self { quantum }
    }
}

impl SchedulerPolicy for RoundRobin {
    fn select_next(
        &self,
        ready: &VecDeque<usize>,
        running: Option<usize>,
        _: &[ProcessRecord],
    ) -> Selection {
        if running.is_some() {
            Selection::Continue
        } else if ready.is_empty() {
            Selection::Idle
        } else {
            Selection::Dispatch(0)
        }
    }

    fn quantum(&self) -> Option<Time> {
        Some(self.quantum)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::test::{admit, records, run};

    #[test]
    fn test_fifo_regardless_of_burst() {
        let mut processes = records(&[(0, 9, None), (0, 1, None)]);
        let ready = admit(&mut processes, &[0, 1]);
        assert_eq!(
            RoundRobin::new(2).select_next(&ready, None, &processes),
            Selection::Dispatch(0)
        );
    }

    #[test]
    fn test_slice_is_not_interrupted() {
        let mut processes = records(&[(0, 9, None), (0, 1, None)]);
        run(&mut processes, 0, 1);
        let ready = admit(&mut processes, &[1]);
        assert_eq!(
            RoundRobin::new(2).select_next(&ready, Some(0), &processes),
            Selection::Continue
        );
    }
}
