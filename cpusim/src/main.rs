//! CPU scheduling simulation application.
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

use std::convert::TryFrom;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use humantime::parse_duration;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;

use cpusim::config::read_processes;
use cpusim::{
    Engine, Mode, PolicyKind, ProcessRow, ProcessSpec, RunEvent, SchedulerConfig, Snapshot,
};

struct DurationArg(Duration);

impl std::str::FromStr for DurationArg {
    type Err = humantime::DurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(DurationArg)
    }
}

/// Runs CPU scheduling simulation.
#[derive(Parser)]
#[clap(version, author)]
struct Opt {
    /// Path to a file containing process definitions, one JSON object per line, e.g.,
    /// `{"pid": 1, "arrival": 0, "burst": 5, "priority": 2}`.
    #[clap(long)]
    processes: PathBuf,

    /// Scheduling policy: fcfs, sjf_non_preemptive, sjf_preemptive, priority_non_preemptive,
    /// priority_preemptive, or round_robin.
    #[clap(short, long)]
    policy: PolicyKind,

    /// Time slice for round robin.
    #[clap(short, long)]
    quantum: Option<i64>,

    /// Show the run as it progresses. Type `p` and Enter to pause or resume, `s` and Enter to
    /// stop.
    #[clap(long)]
    live: bool,

    /// Delay after each step of a live run.
    #[clap(long, default_value = "1s")]
    delay: DurationArg,

    /// Write the final process table to this file in CSV format.
    #[clap(long)]
    table_output: Option<PathBuf>,

    /// Write the final snapshot to this file in JSON format.
    #[clap(long)]
    snapshot_output: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    no_stderr: bool,
}

struct RunConfig {
    processes: Vec<ProcessSpec>,
    scheduler: SchedulerConfig,
    mode: Mode,
    table_output: Option<PathBuf>,
    snapshot_output: Option<PathBuf>,
}

impl TryFrom<Opt> for RunConfig {
    type Error = eyre::Error;
    fn try_from(opt: Opt) -> eyre::Result<Self> {
        let file = File::open(&opt.processes).wrap_err_with(|| {
            format!(
                "unable to open process file: {}",
                opt.processes.display()
            )
        })?;
        let processes = read_processes(io::BufReader::new(file))
            .wrap_err("unable to parse process definitions")?;
        Ok(Self {
            processes,
            scheduler: SchedulerConfig {
                policy: opt.policy,
                quantum: opt.quantum,
            },
            mode: if opt.live {
                Mode::Live(opt.delay.0)
            } else {
                Mode::Static
            },
            table_output: opt.table_output,
            snapshot_output: opt.snapshot_output,
        })
    }
}

impl RunConfig {
    /// Runs the simulation and reports its outcome.
    fn run(&self) -> eyre::Result<()> {
        let engine = Arc::new(Engine::new());
        let events = engine
            .start(&self.processes, &self.scheduler, self.mode)
            .wrap_err("unable to start simulation")?;
        let pb = match self.mode {
            Mode::Live(_) => {
                listen_for_commands(Arc::clone(&engine));
                let pb = ProgressBar::new(engine.snapshot().map_or(0, |s| horizon(&s)));
                pb.set_style(
                    ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos}/{len} {msg}"),
                );
                pb
            }
            Mode::Static => ProgressBar::hidden(),
        };
        let event = loop {
            match events.recv().wrap_err("simulation worker disconnected")? {
                RunEvent::Progress(snapshot) => {
                    pb.set_position(snapshot.time);
                    if let Some(segment) = snapshot.timeline.last() {
                        pb.set_message(&segment.to_string());
                    }
                }
                event => break event,
            }
        };
        pb.finish_and_clear();
        engine.join();

        let snapshot = event.snapshot().clone();
        self.report(&snapshot)?;
        match event {
            RunEvent::Failed { error, .. } => Err(error).wrap_err("simulation aborted"),
            RunEvent::Cancelled(_) => {
                println!("Simulation stopped at time {}", snapshot.time);
                Ok(())
            }
            _ => {
                println!("Simulation finished at time {}", snapshot.time);
                Ok(())
            }
        }
    }

    /// Prints the trace, process table, and statistics, and writes the requested outputs.
    fn report(&self, snapshot: &Snapshot) -> eyre::Result<()> {
        println!("{}", snapshot.timeline_string());
        println!(
            "{}",
            ProcessRow::csv_header()
                .iter()
                .map(|h| format!("{:>11}", h))
                .join("")
        );
        for row in snapshot.rows_by_pid() {
            println!("{}", row.cells().iter().map(|c| format!("{:>11}", c)).join(""));
        }
        match snapshot.stats {
            Some(stats) => println!("{}", stats),
            None => println!("Stats unavailable: no process has completed"),
        }
        if let Some(path) = &self.table_output {
            let file = File::create(path)
                .wrap_err_with(|| format!("unable to create table output: {}", path.display()))?;
            snapshot
                .write_csv(io::BufWriter::new(file))
                .wrap_err("unable to write process table")?;
        }
        if let Some(path) = &self.snapshot_output {
            let file = File::create(path).wrap_err_with(|| {
                format!("unable to create snapshot output: {}", path.display())
            })?;
            serde_json::to_writer_pretty(io::BufWriter::new(file), snapshot)
                .wrap_err("unable to write snapshot")?;
        }
        Ok(())
    }
}

/// Latest time the run can possibly reach.
fn horizon(snapshot: &Snapshot) -> u64 {
    let last_arrival = snapshot.processes.iter().map(|p| p.arrival).max();
    snapshot
        .processes
        .iter()
        .map(|p| p.burst)
        .fold(last_arrival.unwrap_or(0), u64::saturating_add)
}

/// Reads pause and stop commands from the standard input for as long as the run is active.
fn listen_for_commands(engine: Arc<Engine>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let result = match line.as_ref().map(|l| l.trim()) {
                Ok("p") => engine.toggle_pause().map(|paused| {
                    log::info!("{}", if paused { "Paused" } else { "Resumed" });
                }),
                Ok("s") => engine.stop(),
                Ok(other) => {
                    log::warn!("Unknown command: {:?}", other);
                    Ok(())
                }
                Err(_) => return,
            };
            if result.is_err() {
                return;
            }
        }
    });
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    if opt.quantum.is_some() && opt.policy != PolicyKind::RoundRobin {
        log::warn!("Quantum is only used by round robin; ignoring it");
    }
    let conf = RunConfig::try_from(opt)?;
    conf.run()
}
