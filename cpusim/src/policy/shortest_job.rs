use super::{select_non_preemptive, select_preemptive, SchedulerPolicy, Selection};
use crate::ProcessRecord;

use std::collections::VecDeque;

/// Shortest job first.
///
/// The non-preemptive variant orders the ready set by original burst time and lets the chosen
/// process run to completion. The preemptive variant (shortest remaining time first) orders by
/// remaining time and re-evaluates before every unit; on an exact tie the running process
/// keeps the CPU. Remaining ties are broken by arrival, then PID.
pub struct ShortestJobFirst {
    preemptive: bool,
}

impl ShortestJobFirst {
    /// Constructs the non-preemptive variant.
    #[must_use]
    pub fn non_preemptive() -> Self {
        Self { preemptive: false }
    }

    /// Constructs the preemptive (SRTF) variant.
    #[must_use]
    pub fn preemptive() -> Self {
        Self { preemptive: true }
    }
}

impl SchedulerPolicy for ShortestJobFirst {
    fn select_next(
        &self,
        ready: &VecDeque<usize>,
        running: Option<usize>,
        processes: &[ProcessRecord],
    ) -> Selection {
        if self.preemptive {
            select_preemptive(ready, running, processes, ProcessRecord::remaining)
        } else {
            select_non_preemptive(ready, running, processes, ProcessRecord::burst)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::test::{admit, records, run};

    #[test]
    fn test_shortest_burst_first() {
        let mut processes = records(&[(0, 4, None), (1, 2, None), (2, 3, None)]);
        let ready = admit(&mut processes, &[0, 1, 2]);
        assert_eq!(
            ShortestJobFirst::non_preemptive().select_next(&ready, None, &processes),
            Selection::Dispatch(1)
        );
    }

    #[test]
    fn test_burst_tie_broken_by_arrival_then_pid() {
        let mut processes = records(&[(3, 2, None), (1, 2, None), (1, 2, None)]);
        let ready = admit(&mut processes, &[0, 2, 1]);
        assert_eq!(
            ShortestJobFirst::non_preemptive().select_next(&ready, None, &processes),
            Selection::Dispatch(2)
        );
    }

    #[test]
    fn test_non_preemptive_keeps_running() {
        let mut processes = records(&[(0, 8, None), (1, 1, None)]);
        run(&mut processes, 0, 1);
        let ready = admit(&mut processes, &[1]);
        assert_eq!(
            ShortestJobFirst::non_preemptive().select_next(&ready, Some(0), &processes),
            Selection::Continue
        );
    }

    #[test]
    fn test_non_preemptive_uses_original_burst() {
        let mut processes = records(&[(0, 5, None), (0, 4, None)]);
        run(&mut processes, 0, 3);
        processes[0].preempt().unwrap();
        let ready: VecDeque<usize> = vec![0, 1].into();
        processes[1].admit().unwrap();
        assert_eq!(
            ShortestJobFirst::non_preemptive().select_next(&ready, None, &processes),
            Selection::Dispatch(1)
        );
        assert_eq!(
            ShortestJobFirst::preemptive().select_next(&ready, None, &processes),
            Selection::Dispatch(0)
        );
    }

    #[test]
    fn test_preempts_on_shorter_remaining() {
        let mut processes = records(&[(0, 8, None), (1, 4, None)]);
        run(&mut processes, 0, 1);
        let ready = admit(&mut processes, &[1]);
        assert_eq!(
            ShortestJobFirst::preemptive().select_next(&ready, Some(0), &processes),
            Selection::Preempt(0)
        );
    }

    #[test]
    fn test_running_keeps_cpu_on_tie() {
        let mut processes = records(&[(0, 5, None), (0, 4, None)]);
        run(&mut processes, 0, 1);
        let ready = admit(&mut processes, &[1]);
        assert_eq!(
            ShortestJobFirst::preemptive().select_next(&ready, Some(0), &processes),
            Selection::Continue
        );
    }
}
