//! CPU scheduling simulation.
//!
//! A single-CPU scheduler is simulated over an abstract integer time unit under one of six
//! classical policies (see [`PolicyKind`]). Each run produces a time-ordered execution trace
//! ([`Timeline`]) together with per-process metrics and their averages ([`Stats`]).
//!
//! The simulation can run directly on the calling thread via [`simulate`], or on a dedicated
//! worker controlled through an [`Engine`], which supports live (paced, observable) and static
//! (batch) modes as well as cooperative pause, resume, and cancellation.
//!
//! ```
//! # use cpusim::*;
//! # fn main() -> Result<(), Error> {
//! let processes = vec![
//!     ProcessSpec::new(1, 0, 5),
//!     ProcessSpec::new(2, 1, 3),
//! ];
//! let config = SchedulerConfig::new(PolicyKind::Fcfs);
//! let snapshot = simulate(&processes, &config)?;
//! assert_eq!(snapshot.time, 8);
//! assert_eq!(snapshot.timeline[1].to_string(), "P2:5-8");
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::inline_always
)]

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

mod admission;
mod clock;

pub mod config;
pub use config::{SchedulerConfig, Workload};

mod controller;
pub use controller::{Engine, Mode, RunEvent};

mod error;
pub use error::{ConcurrencyError, Error, InvariantError, ValidationError};

mod process;
pub use process::{ProcessDef, ProcessRecord, ProcessSpec, Status};

pub mod policy;
pub use policy::{PolicyKind, SchedulerPolicy, Selection};

mod simulation;
pub use simulation::{Simulation, Step};

mod snapshot;
pub use snapshot::{ProcessRow, Snapshot};

mod stats;
pub use stats::Stats;

mod timeline;
pub use timeline::{Segment, Task, Timeline};

/// Process ID.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct Pid(usize);

/// Simulated time, in abstract units.
pub type Time = u64;

/// Validates `processes` against `config` and runs the whole simulation on the calling thread.
///
/// The input is never modified: the simulation works on its own copy of the process set.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the input is rejected, or [`Error::Invariant`] if the run
/// reaches an inconsistent state.
pub fn simulate(processes: &[ProcessSpec], config: &SchedulerConfig) -> Result<Snapshot, Error> {
    let workload = Workload::new(processes, config)?;
    let mut simulation = Simulation::new(&workload);
    simulation.run_to_completion()?;
    Ok(simulation.snapshot())
}
