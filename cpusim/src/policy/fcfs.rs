use super::{select_non_preemptive, SchedulerPolicy, Selection};
use crate::ProcessRecord;

use std::collections::VecDeque;

/// Runs processes to completion in order of arrival, breaking ties by PID.
pub struct FirstComeFirstServed;

impl SchedulerPolicy for FirstComeFirstServed {
    fn select_next(
        &self,
        ready: &VecDeque<usize>,
        running: Option<usize>,
        processes: &[ProcessRecord],
    ) -> Selection {
        select_non_preemptive(ready, running, processes, ProcessRecord::arrival)
    }
}
