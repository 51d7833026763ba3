//! Runs simulations on a dedicated worker thread.

use crate::{
    ConcurrencyError, Error, InvariantError, ProcessSpec, SchedulerConfig, Simulation, Snapshot,
    Step, Workload,
};

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How a run is presented to its observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Publish a snapshot after every unit of work, waiting the given delay after each.
    Live(Duration),
    /// Compute the whole run without pacing and publish only the terminal snapshot.
    Static,
}

/// Message sent from the worker to the observer of a run.
///
/// A run emits any number of `Progress` events (none in static mode) in time order, followed by
/// exactly one terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// State after a unit of work in a live run.
    Progress(Snapshot),
    /// Every process has completed.
    Finished(Snapshot),
    /// The run was stopped; carries the last state reached.
    Cancelled(Snapshot),
    /// The run aborted on a broken invariant; carries the state at the time of failure.
    Failed {
        /// What went wrong.
        error: InvariantError,
        /// Last state reached.
        snapshot: Snapshot,
    },
}

impl RunEvent {
    /// The snapshot carried by this event.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        match self {
            Self::Progress(snapshot) | Self::Finished(snapshot) | Self::Cancelled(snapshot) => {
                snapshot
            }
            Self::Failed { snapshot, .. } => snapshot,
        }
    }

    /// Whether this is the last event of a run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

#[derive(Debug, Default)]
struct ControlState {
    running: bool,
    paused: bool,
    cancelled: bool,
}

/// Flags shared between the engine and its worker.
#[derive(Debug, Default)]
struct Control {
    state: Mutex<ControlState>,
    signal: Condvar,
}

impl Control {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks while paused. Returns `false` if the run has been cancelled.
    fn checkpoint(&self) -> bool {
        let mut state = self.lock();
        while state.paused && !state.cancelled {
            state = self
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.cancelled
    }

    /// Sleeps for `duration` unless cancelled first. Returns `false` if cancelled.
    fn delay(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut state = self.lock();
        loop {
            if state.cancelled {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            state = self
                .signal
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Runs `f` on the state of an active run.
    fn update<T, F>(&self, f: F) -> Result<T, ConcurrencyError>
    where
        F: FnOnce(&mut ControlState) -> T,
    {
        let mut state = self.lock();
        if !state.running {
            return Err(ConcurrencyError::NotRunning);
        }
        let result = f(&mut state);
        self.signal.notify_all();
        Ok(result)
    }
}

/// Controls simulation runs: one at a time, each on its own worker thread.
///
/// All methods take `&self`, so an engine can be shared between the thread driving it and the
/// thread observing its runs.
///
/// ```
/// # use cpusim::*;
/// # fn main() -> Result<(), Error> {
/// let engine = Engine::new();
/// let events = engine.start(
///     &[ProcessSpec::new(1, 0, 5), ProcessSpec::new(2, 1, 3)],
///     &SchedulerConfig::new(PolicyKind::RoundRobin).with_quantum(2),
///     Mode::Static,
/// )?;
/// match events.recv() {
///     Ok(RunEvent::Finished(snapshot)) => assert_eq!(snapshot.time, 8),
///     other => panic!("unexpected event: {:?}", other),
/// }
/// engine.join();
/// assert!(!engine.is_running());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    control: Arc<Control>,
    latest: Arc<Mutex<Option<Snapshot>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Constructs an idle engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new run over a fresh copy of `processes` and returns the channel its events
    /// are delivered to.
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::AlreadyRunning`] if a run is active, or a
    /// [`ValidationError`](crate::ValidationError) if the input is rejected. In both cases,
    /// nothing is started and the engine state is left untouched.
    pub fn start(
        &self,
        processes: &[ProcessSpec],
        config: &SchedulerConfig,
        mode: Mode,
    ) -> Result<Receiver<RunEvent>, Error> {
        let mut state = self.control.lock();
        if state.running {
            return Err(ConcurrencyError::AlreadyRunning.into());
        }
        let workload = Workload::new(processes, config)?;
        // The previous worker has already published its terminal event.
        self.join();
        let simulation = Simulation::new(&workload);
        *lock(&self.latest) = Some(simulation.snapshot());
        *state = ControlState {
            running: true,
            ..ControlState::default()
        };
        drop(state);

        log::info!(
            "Starting {} run of {} processes under {}",
            if let Mode::Live(_) = mode { "live" } else { "static" },
            workload.processes().len(),
            workload.policy()
        );
        let (sender, receiver) = mpsc::channel();
        let worker = Worker {
            simulation,
            mode,
            control: Arc::clone(&self.control),
            latest: Arc::clone(&self.latest),
            events: sender,
        };
        *lock(&self.worker) = Some(thread::spawn(move || worker.run()));
        Ok(receiver)
    }

    /// Suspends the active run at its next suspension point.
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::NotRunning`] if no run is active.
    pub fn pause(&self) -> Result<(), ConcurrencyError> {
        self.control.update(|state| state.paused = true)
    }

    /// Resumes a paused run.
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::NotRunning`] if no run is active.
    pub fn resume(&self) -> Result<(), ConcurrencyError> {
        self.control.update(|state| state.paused = false)
    }

    /// Pauses a running or resumes a paused run, and returns whether it is now paused.
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::NotRunning`] if no run is active.
    pub fn toggle_pause(&self) -> Result<bool, ConcurrencyError> {
        self.control.update(|state| {
            state.paused = !state.paused;
            state.paused
        })
    }

    /// Cancels the active run and waits for its worker to exit. The run's last state is
    /// delivered as a [`RunEvent::Cancelled`] event.
    ///
    /// # Errors
    ///
    /// Returns [`ConcurrencyError::NotRunning`] if no run is active.
    pub fn stop(&self) -> Result<(), ConcurrencyError> {
        self.control.update(|state| state.cancelled = true)?;
        self.join();
        Ok(())
    }

    /// Stops any active run and discards its last state.
    pub fn reset(&self) {
        if self.stop().is_ok() {
            log::debug!("Stopped active run on reset");
        }
        self.join();
        *lock(&self.latest) = None;
    }

    /// Blocks until the current worker, if any, has exited.
    pub fn join(&self) {
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Simulation worker panicked");
            }
        }
    }

    /// Whether a run is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.control.lock().running
    }

    /// Whether the active run is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        let state = self.control.lock();
        state.running && state.paused
    }

    /// The most recently published state, if any run has been started since the last reset.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        lock(&self.latest).clone()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.control.update(|state| state.cancelled = true);
        self.join();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Worker {
    simulation: Simulation,
    mode: Mode,
    control: Arc<Control>,
    latest: Arc<Mutex<Option<Snapshot>>>,
    events: Sender<RunEvent>,
}

impl Worker {
    fn run(mut self) {
        let delay = match self.mode {
            Mode::Live(delay) => Some(delay),
            Mode::Static => None,
        };
        loop {
            if !self.control.checkpoint() {
                log::info!("Run cancelled at time {}", self.simulation.time());
                let snapshot = self.simulation.snapshot();
                return self.finish(RunEvent::Cancelled(snapshot));
            }
            match self.simulation.step(delay.is_some()) {
                Ok(Step::Advanced) if !self.simulation.is_finished() => {
                    if let Some(delay) = delay {
                        self.publish(self.simulation.snapshot());
                        self.control.delay(delay);
                    }
                }
                Ok(_) => {
                    log::info!("Run finished at time {}", self.simulation.time());
                    let snapshot = self.simulation.snapshot();
                    return self.finish(RunEvent::Finished(snapshot));
                }
                Err(error) => {
                    log::warn!("Run aborted at time {}: {}", self.simulation.time(), error);
                    let snapshot = self.simulation.snapshot();
                    return self.finish(RunEvent::Failed { error, snapshot });
                }
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        *lock(&self.latest) = Some(snapshot.clone());
        // The observer may have gone away; the run goes on regardless.
        let _ = self.events.send(RunEvent::Progress(snapshot));
    }

    /// Publishes the terminal event and clears the running flag in one critical section.
    fn finish(&self, event: RunEvent) {
        let mut state = self.control.lock();
        *lock(&self.latest) = Some(event.snapshot().clone());
        let _ = self.events.send(event);
        *state = ControlState::default();
        self.control.signal.notify_all();
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if thread::panicking() {
            let time = self.simulation.time();
            log::error!("Simulation worker panicked at time {}", time);
            let snapshot = self.simulation.snapshot();
            self.finish(RunEvent::Failed {
                error: InvariantError::WorkerPanicked { time },
                snapshot,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{PolicyKind, ProcessRecord, SchedulerPolicy, Selection};

    use std::collections::VecDeque;

    struct Faulty;

    impl SchedulerPolicy for Faulty {
        fn select_next(
            &self,
            _: &VecDeque<usize>,
            _: Option<usize>,
            _: &[ProcessRecord],
        ) -> Selection {
            panic!("policy failure")
        }
    }

    #[test]
    fn test_panicking_worker_ends_the_run() {
        let workload = Workload::new(
            &[ProcessSpec::new(1, 0, 2)],
            &SchedulerConfig::new(PolicyKind::Fcfs),
        )
        .unwrap();
        let control = Arc::new(Control::default());
        control.lock().running = true;
        let latest = Arc::new(Mutex::new(None));
        let (sender, receiver) = mpsc::channel();
        let worker = Worker {
            simulation: Simulation::with_policy(&workload, Box::new(Faulty)),
            mode: Mode::Static,
            control: Arc::clone(&control),
            latest: Arc::clone(&latest),
            events: sender,
        };
        assert!(thread::spawn(move || worker.run()).join().is_err());
        assert!(!control.lock().running);
        let events: Vec<_> = receiver.iter().collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RunEvent::Failed { error, snapshot } => {
                assert_eq!(error, &InvariantError::WorkerPanicked { time: 0 });
                assert_eq!(lock(&latest).as_ref(), Some(snapshot));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_checkpoint_returns_after_cancel() {
        let control = Arc::new(Control::default());
        control.lock().paused = true;
        let waiting = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.checkpoint())
        };
        thread::sleep(Duration::from_millis(20));
        control.lock().cancelled = true;
        control.signal.notify_all();
        assert!(!waiting.join().unwrap());
    }

    #[test]
    fn test_delay_interrupted_by_cancel() {
        let control = Arc::new(Control::default());
        let waiting = {
            let control = Arc::clone(&control);
            thread::spawn(move || control.delay(Duration::from_secs(60)))
        };
        thread::sleep(Duration::from_millis(20));
        control.lock().cancelled = true;
        control.signal.notify_all();
        assert!(!waiting.join().unwrap());
        assert!(Control::default().delay(Duration::from_millis(1)));
    }

    #[test]
    fn test_update_requires_running() {
        let control = Control::default();
        assert_eq!(
            control.update(|state| state.paused = true),
            Err(ConcurrencyError::NotRunning)
        );
        assert!(!control.lock().paused);
    }

    #[test]
    fn test_event_accessors() {
        let snapshot = crate::simulate(
            &[ProcessSpec::new(1, 0, 1)],
            &SchedulerConfig::new(PolicyKind::Fcfs),
        )
        .unwrap();
        let progress = RunEvent::Progress(snapshot.clone());
        assert!(!progress.is_terminal());
        let failed = RunEvent::Failed {
            error: InvariantError::NegativeWait(crate::Pid::from(1)),
            snapshot: snapshot.clone(),
        };
        assert!(failed.is_terminal());
        assert_eq!(failed.snapshot(), &snapshot);
    }
}
