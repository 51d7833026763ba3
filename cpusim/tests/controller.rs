use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};

use cpusim::{
    simulate, ConcurrencyError, Engine, Error, InvariantError, Mode, PolicyKind, ProcessSpec,
    RunEvent, SchedulerConfig, Status, ValidationError,
};

#[fixture]
fn processes() -> Vec<ProcessSpec> {
    vec![ProcessSpec::new(1, 0, 5), ProcessSpec::new(2, 1, 3)]
}

/// A single process long enough to still be running when the test inspects it.
#[fixture]
fn long_running() -> Vec<ProcessSpec> {
    vec![ProcessSpec::new(1, 0, 100_000)]
}

fn fcfs() -> SchedulerConfig {
    SchedulerConfig::new(PolicyKind::Fcfs)
}

fn live(millis: u64) -> Mode {
    Mode::Live(Duration::from_millis(millis))
}

fn wait_for_progress(engine: &Engine) {
    while engine.snapshot().map_or(true, |s| s.time == 0) {
        thread::sleep(Duration::from_millis(1));
    }
}

fn drain(events: Receiver<RunEvent>) -> Vec<RunEvent> {
    events.iter().collect()
}

#[rstest]
fn test_static_run_publishes_only_final_state(processes: Vec<ProcessSpec>) {
    let engine = Engine::new();
    let events = engine.start(&processes, &fcfs(), Mode::Static).unwrap();
    let events = drain(events);
    assert_eq!(events.len(), 1);
    match &events[0] {
        RunEvent::Finished(snapshot) => {
            assert_eq!(snapshot.time, 8);
            assert!(snapshot.finished);
            assert_eq!(snapshot.timeline_string(), "P1:0-5 P2:5-8");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    engine.join();
    assert!(!engine.is_running());
    assert_eq!(engine.snapshot().as_ref(), Some(events[0].snapshot()));
}

#[rstest]
#[case(PolicyKind::Fcfs, None)]
#[case(PolicyKind::SjfPreemptive, None)]
#[case(PolicyKind::RoundRobin, Some(2))]
fn test_live_run_publishes_every_unit_in_order(
    processes: Vec<ProcessSpec>,
    #[case] policy: PolicyKind,
    #[case] quantum: Option<i64>,
) {
    let engine = Engine::new();
    let config = SchedulerConfig { policy, quantum };
    let events = drain(engine.start(&processes, &config, live(1)).unwrap());
    let (last, progress) = events.split_last().unwrap();
    let times: Vec<_> = progress.iter().map(|e| e.snapshot().time).collect();
    assert_eq!(times, (1..8).collect::<Vec<_>>());
    assert!(progress.iter().all(|e| !e.is_terminal()));
    match last {
        RunEvent::Finished(snapshot) => assert_eq!(snapshot.time, 8),
        other => panic!("unexpected event: {:?}", other),
    }
    let static_events = drain(engine.start(&processes, &config, Mode::Static).unwrap());
    assert_eq!(static_events, vec![last.clone()]);
}

#[test]
fn test_live_run_jumps_over_idle_time() {
    let engine = Engine::new();
    let events = engine
        .start(
            &[ProcessSpec::new(1, 0, 1), ProcessSpec::new(2, 10, 1)],
            &fcfs(),
            live(1),
        )
        .unwrap();
    let times: Vec<_> = drain(events).iter().map(|e| e.snapshot().time).collect();
    assert_eq!(times, vec![1, 10, 11]);
}

#[rstest]
fn test_start_while_running_is_rejected(
    processes: Vec<ProcessSpec>,
    long_running: Vec<ProcessSpec>,
) {
    let engine = Engine::new();
    let events = engine.start(&long_running, &fcfs(), live(1)).unwrap();
    wait_for_progress(&engine);
    assert_eq!(
        engine.start(&processes, &fcfs(), Mode::Static).err(),
        Some(Error::Concurrency(ConcurrencyError::AlreadyRunning))
    );
    assert!(engine.is_running());
    assert_eq!(
        engine.snapshot().unwrap().process(1.into()).unwrap().burst,
        100_000
    );
    engine.stop().unwrap();
    assert!(matches!(drain(events).last(), Some(RunEvent::Cancelled(_))));
}

#[test]
fn test_controls_require_active_run() {
    let engine = Engine::new();
    assert_eq!(engine.pause(), Err(ConcurrencyError::NotRunning));
    assert_eq!(engine.resume(), Err(ConcurrencyError::NotRunning));
    assert_eq!(engine.toggle_pause(), Err(ConcurrencyError::NotRunning));
    assert_eq!(engine.stop(), Err(ConcurrencyError::NotRunning));
    assert!(!engine.is_paused());
}

#[rstest]
fn test_pause_suspends_progress(long_running: Vec<ProcessSpec>) {
    let engine = Engine::new();
    let events = engine.start(&long_running, &fcfs(), live(1)).unwrap();
    wait_for_progress(&engine);
    engine.pause().unwrap();
    assert!(engine.is_paused());
    thread::sleep(Duration::from_millis(30));
    let paused_at = engine.snapshot().unwrap().time;
    thread::sleep(Duration::from_millis(30));
    assert_eq!(engine.snapshot().unwrap().time, paused_at);
    assert!(engine.is_running());

    assert_eq!(engine.toggle_pause(), Ok(false));
    thread::sleep(Duration::from_millis(30));
    assert!(engine.snapshot().unwrap().time > paused_at);

    assert_eq!(engine.toggle_pause(), Ok(true));
    engine.stop().unwrap();
    assert!(!engine.is_running());
    assert!(!engine.is_paused());
    let events = drain(events);
    let times: Vec<_> = events.iter().map(|e| e.snapshot().time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    match events.last() {
        Some(RunEvent::Cancelled(snapshot)) => {
            assert!(!snapshot.finished);
            assert_eq!(snapshot.processes[0].status, Status::Running);
            assert_eq!(snapshot.stats, None);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[rstest]
fn test_stop_interrupts_delay(processes: Vec<ProcessSpec>) {
    let engine = Engine::new();
    let events = engine
        .start(&processes, &fcfs(), Mode::Live(Duration::from_secs(3600)))
        .unwrap();
    wait_for_progress(&engine);
    engine.stop().unwrap();
    assert!(!engine.is_running());
    let events = drain(events);
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], RunEvent::Cancelled(events[0].snapshot().clone()));
    assert_eq!(engine.snapshot().unwrap().time, 1);
}

#[rstest]
fn test_engine_is_reusable(processes: Vec<ProcessSpec>, long_running: Vec<ProcessSpec>) {
    let engine = Engine::new();
    let events = engine.start(&long_running, &fcfs(), live(1)).unwrap();
    wait_for_progress(&engine);
    engine.stop().unwrap();
    drain(events);
    let events = drain(engine.start(&processes, &fcfs(), Mode::Static).unwrap());
    assert!(matches!(events.as_slice(), [RunEvent::Finished(_)]));
}

#[rstest]
fn test_invalid_input_is_rejected(processes: Vec<ProcessSpec>) {
    let engine = Engine::new();
    assert_eq!(
        engine.start(&[], &fcfs(), Mode::Static).err(),
        Some(Error::Validation(ValidationError::EmptyWorkload))
    );
    assert_eq!(
        engine
            .start(
                &processes,
                &SchedulerConfig::new(PolicyKind::RoundRobin).with_quantum(0),
                Mode::Static
            )
            .err(),
        Some(Error::Validation(ValidationError::NonPositiveQuantum(0)))
    );
    assert!(!engine.is_running());
    assert_eq!(engine.snapshot(), None);
    assert_eq!(processes, vec![ProcessSpec::new(1, 0, 5), ProcessSpec::new(2, 1, 3)]);
}

#[rstest]
fn test_reset(processes: Vec<ProcessSpec>, long_running: Vec<ProcessSpec>) {
    let engine = Engine::new();
    drain(engine.start(&processes, &fcfs(), Mode::Static).unwrap());
    assert!(engine.snapshot().is_some());
    engine.reset();
    assert_eq!(engine.snapshot(), None);

    let events = engine.start(&long_running, &fcfs(), live(1)).unwrap();
    wait_for_progress(&engine);
    engine.reset();
    assert!(!engine.is_running());
    assert_eq!(engine.snapshot(), None);
    assert!(matches!(drain(events).last(), Some(RunEvent::Cancelled(_))));
}

/// Three maximal bursts under a quantum that lets each run to completion in one slice.
fn overflowing() -> (Vec<ProcessSpec>, SchedulerConfig) {
    let processes = (1..=3).map(|pid| ProcessSpec::new(pid, 0, i64::MAX)).collect();
    let config = SchedulerConfig::new(PolicyKind::RoundRobin).with_quantum(i64::MAX);
    (processes, config)
}

#[test]
fn test_clock_overflow_is_reported() {
    let (processes, config) = overflowing();
    let half = u64::MAX / 2;
    assert_eq!(
        simulate(&processes, &config).err(),
        Some(Error::Invariant(InvariantError::ClockOverflow {
            now: half * 2,
            units: half
        }))
    );
}

#[rstest]
fn test_failed_run_releases_engine(processes: Vec<ProcessSpec>) {
    let engine = Engine::new();
    let (overflowing, config) = overflowing();
    let events = drain(engine.start(&overflowing, &config, Mode::Static).unwrap());
    assert_eq!(events.len(), 1);
    match &events[0] {
        RunEvent::Failed { error, snapshot } => {
            assert!(matches!(error, InvariantError::ClockOverflow { .. }));
            assert!(!snapshot.finished);
            assert_eq!(snapshot.processes[2].status, Status::Running);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    engine.join();
    assert!(!engine.is_running());
    assert_eq!(engine.snapshot().as_ref(), Some(events[0].snapshot()));

    let events = drain(engine.start(&processes, &fcfs(), Mode::Static).unwrap());
    assert!(matches!(events.as_slice(), [RunEvent::Finished(_)]));
}
