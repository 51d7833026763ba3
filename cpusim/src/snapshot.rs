use crate::{Pid, ProcessRecord, Segment, Stats, Status, Time};

use std::io::Write;

use itertools::Itertools;
use serde::Serialize;

/// One row of the process table.
///
/// Wait and turnaround times are only present once the process has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRow {
    /// Process ID.
    pub pid: Pid,
    /// Arrival time.
    pub arrival: Time,
    /// Total service time.
    pub burst: Time,
    /// Priority, if any.
    pub priority: Option<u64>,
    /// Service time still owed.
    pub remaining: Time,
    /// Lifecycle status.
    pub status: Status,
    /// First dispatch time.
    pub start: Option<Time>,
    /// Completion time.
    pub finish: Option<Time>,
    /// Wait time.
    pub wait: Option<Time>,
    /// Turnaround time.
    pub turnaround: Option<Time>,
}

impl From<&ProcessRecord> for ProcessRow {
    fn from(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid(),
            arrival: record.arrival(),
            burst: record.burst(),
            priority: record.priority(),
            remaining: record.remaining(),
            status: record.status(),
            start: record.start_time(),
            finish: record.finish_time(),
            wait: record.wait_time(),
            turnaround: record.turnaround_time(),
        }
    }
}

fn cell(value: Option<u64>) -> String {
    value.map_or_else(|| String::from("-"), |v| v.to_string())
}

impl ProcessRow {
    /// Column names matching [`ProcessRow::cells`].
    #[must_use]
    pub fn csv_header() -> [&'static str; 10] {
        [
            "pid",
            "arrival",
            "burst",
            "priority",
            "remaining",
            "status",
            "start",
            "finish",
            "wait",
            "turnaround",
        ]
    }

    /// Renders the row as text cells, with `-` standing for absent values.
    #[must_use]
    pub fn cells(&self) -> [String; 10] {
        [
            self.pid.to_string(),
            self.arrival.to_string(),
            self.burst.to_string(),
            cell(self.priority),
            self.remaining.to_string(),
            self.status.to_string(),
            cell(self.start),
            cell(self.finish),
            cell(self.wait),
            cell(self.turnaround),
        ]
    }
}

/// Read-only view of a simulation at one point in time, as handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Current simulation time.
    pub time: Time,
    /// Execution trace covering `[0, time)`.
    pub timeline: Vec<Segment>,
    /// One row per process, in input order.
    pub processes: Vec<ProcessRow>,
    /// Averages over processes completed so far; `None` if none has.
    pub stats: Option<Stats>,
    /// Whether every process has completed.
    pub finished: bool,
}

impl Snapshot {
    /// Row of the process with the given ID.
    #[must_use]
    pub fn process(&self, pid: Pid) -> Option<&ProcessRow> {
        self.processes.iter().find(|row| row.pid == pid)
    }

    /// Rows ordered by PID, as they are typically displayed.
    pub fn rows_by_pid(&self) -> impl Iterator<Item = &ProcessRow> {
        self.processes.iter().sorted_by_key(|row| row.pid)
    }

    /// Timeline rendered as `P1:0-5 P2:5-8 ...`.
    #[must_use]
    pub fn timeline_string(&self) -> String {
        self.timeline.iter().join(" ")
    }

    /// Writes the process table in CSV format, ordered by PID.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `writer` fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&ProcessRow::csv_header())?;
        for row in self.rows_by_pid() {
            writer.write_record(&row.cells())?;
        }
        writer.flush()?;
        Ok(())
    }
}
