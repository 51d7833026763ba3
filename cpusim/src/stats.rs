use crate::ProcessRecord;

use std::fmt;

use serde::Serialize;

/// Average wait and turnaround times over completed processes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    /// Mean wait time.
    pub avg_wait: f64,
    /// Mean turnaround time.
    pub avg_turnaround: f64,
    /// Number of completed processes the averages are taken over.
    pub completed: usize,
}

impl Stats {
    /// Summarizes the completed processes among `records`.
    ///
    /// Returns `None` if none of them has completed, in which case the statistics are
    /// unavailable.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records<'a, I>(records: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ProcessRecord>,
    {
        let (completed, total_wait, total_turnaround) = records
            .into_iter()
            .filter_map(|p| Some((p.wait_time()?, p.turnaround_time()?)))
            .fold((0_usize, 0_u128, 0_u128), |(n, wait, turnaround), (w, t)| {
                (n + 1, wait + u128::from(w), turnaround + u128::from(t))
            });
        if completed == 0 {
            None
        } else {
            Some(Self {
                avg_wait: total_wait as f64 / completed as f64,
                avg_turnaround: total_turnaround as f64 / completed as f64,
                completed,
            })
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Avg Waiting Time: {:.2} | Avg Turnaround Time: {:.2}",
            self.avg_wait, self.avg_turnaround
        )
    }
}
