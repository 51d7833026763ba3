use crate::{InvariantError, Pid, Time};

use std::fmt;

use serde::{Serialize, Serializer};

/// What occupied the CPU during a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// A process was running.
    Process(Pid),
    /// Nothing was running.
    Idle,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process(pid) => write!(f, "P{}", pid),
            Self::Idle => write!(f, "idle"),
        }
    }
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A contiguous stretch of time occupied by a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Task that held the CPU.
    pub task: Task,
    /// Start of the segment.
    pub start: Time,
    /// Length of the segment.
    pub duration: Time,
}

impl Segment {
    /// End of the segment (exclusive).
    #[must_use]
    pub fn end(&self) -> Time {
        self.start.saturating_add(self.duration)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.task, self.start, self.end())
    }
}

/// Execution trace of a run.
///
/// Segments tile `[0, end)` with no gaps or overlaps, and no two neighboring segments belong
/// to the same task: work that continues the last segment's task extends it instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Records that `task` occupied the CPU for `duration` units starting at `start`.
    ///
    /// # Errors
    ///
    /// Fails if `start` does not coincide with the current end of the timeline.
    pub fn record(
        &mut self,
        task: Task,
        start: Time,
        duration: Time,
    ) -> Result<(), InvariantError> {
        let end = self.end();
        if start != end {
            return Err(InvariantError::DetachedSegment { start, end });
        }
        if duration == 0 {
            return Ok(());
        }
        match self.segments.last_mut() {
            Some(last) if last.task == task => last.duration += duration,
            _ => self.segments.push(Segment {
                task,
                start,
                duration,
            }),
        }
        Ok(())
    }

    /// End of the last segment, or 0 if nothing has been recorded.
    #[must_use]
    pub fn end(&self) -> Time {
        self.segments.last().map_or(0, Segment::end)
    }

    /// All recorded segments in time order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total time spent idle.
    #[must_use]
    pub fn idle_time(&self) -> Time {
        self.segments
            .iter()
            .filter(|s| s.task == Task::Idle)
            .map(|s| s.duration)
            .sum()
    }
}
