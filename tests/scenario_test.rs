//! End-to-end sampling scenarios on a simulated clock.

use std::{
    sync::{Arc, atomic::{AtomicBool, AtomicU64, Ordering}},
    time::{Duration, Instant},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use rts_sampler::{
    AcquisitionError, Clock, PeriodicScheduler, SampleOutcome, SampleWindowBuffer, Sampler,
    SensorMeta, SensorSource, Shutdown, SimulatedClock, Tick,
};

fn meta(name: &str) -> SensorMeta {
    SensorMeta {
        name: name.to_string(),
        label: "u".to_string(),
        min_value: 0.0,
        max_value: 1.0,
    }
}

fn constant_sensor(name: &str, rate: u64, window_s: u64, value: f64) -> SensorSource {
    SensorSource::new(
        meta(name),
        rate,
        window_s,
        Box::new(move || -> Result<f64, AcquisitionError> { Ok(value) }),
    )
    .unwrap()
}

fn fire(s: &mut PeriodicScheduler, clock: &SimulatedClock) -> rts_sampler::Firing {
    match s.run_once_blocking(clock, &Shutdown::new()).unwrap() {
        Tick::Fired(f) => f,
        Tick::Cancelled => panic!("unexpected cancellation"),
    }
}

// ============================================================================
// WINDOW BUFFER
// ============================================================================

#[test]
fn scenario_a_partial_window() {
    let mut buf = SampleWindowBuffer::new(5);
    for v in [1.0, 2.0, 3.0] {
        buf.append(v);
    }
    let view = buf.read_window();
    assert_eq!(view.as_slice(), &[1.0, 2.0, 3.0]);
    assert_eq!(view.end - view.begin, 3);
}

#[test]
fn scenario_b_wrapped_window() {
    let mut buf = SampleWindowBuffer::new(3);
    for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
        buf.append(v);
    }
    assert_eq!(buf.read_window().as_slice(), &[3.0, 4.0, 5.0]);
}

#[test]
fn buffer_behaves_as_bounded_fifo() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let w = rng.random_range(1..40usize);
        let k = rng.random_range(0..(3 * w + 5));
        let values: Vec<f64> = (0..k).map(|_| rng.random_range(-1e3..1e3)).collect();

        let mut buf = SampleWindowBuffer::new(w);
        for (i, v) in values.iter().enumerate() {
            buf.append(*v);
            assert_eq!(buf.valid_count(), (i + 1).min(w));
        }

        let view = buf.read_window();
        let expected = &values[k.saturating_sub(w)..];
        assert_eq!(view.as_slice(), expected, "w={w} k={k}");
        assert_eq!(view.len(), k.min(w));
        assert!(view.begin <= w);
        assert!(view.end < 2 * w);
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

#[test]
fn scenario_c_ten_hz_and_one_hz() {
    let clock = SimulatedClock::default();
    let t0 = clock.now();
    let mut s = PeriodicScheduler::new();
    s.register(0, 10, t0).unwrap();
    s.register(1, 1, t0).unwrap();

    let horizon = t0 + Duration::from_secs(1);
    let mut fired = Vec::new();
    while s.peek_next().is_some_and(|(_, due)| due < horizon) {
        fired.push(fire(&mut s, &clock));
    }

    let fast: Vec<_> = fired.iter().filter(|f| f.source == 0).collect();
    let slow: Vec<_> = fired.iter().filter(|f| f.source == 1).collect();
    assert_eq!(fast.len(), 10);
    assert_eq!(slow.len(), 1);

    // tie at t0 goes to the first registered source
    assert_eq!(fired[0].source, 0);
    assert_eq!(fired[1].source, 1);
    assert!(fast.iter().all(|f| f.due < horizon));
    assert_eq!(s.next_due(1), Some(horizon));

    // due times never go backwards
    for pair in fired.windows(2) {
        assert!(pair[0].due <= pair[1].due);
    }
}

#[test]
fn fairness_over_interval() {
    let clock = SimulatedClock::default();
    let t0 = clock.now();
    let rates = [50u64, 7, 3, 1];
    let mut s = PeriodicScheduler::new();
    for (id, rate) in rates.iter().enumerate() {
        s.register(id, *rate, t0).unwrap();
    }

    let observe = Duration::from_millis(4_300);
    let mut counts = [0u64; 4];
    while s.peek_next().is_some_and(|(_, due)| due < t0 + observe) {
        counts[fire(&mut s, &clock).source] += 1;
    }

    for (id, rate) in rates.iter().enumerate() {
        let period = Duration::from_nanos(1_000_000_000 / rate);
        let expected = (observe.as_nanos() / period.as_nanos()) as i64;
        let diff = counts[id] as i64 - expected;
        assert!(diff.abs() <= 1, "source {id}: {} vs {expected}", counts[id]);
    }
}

#[test]
fn no_drift_under_slow_sampling() {
    let clock = SimulatedClock::default();
    let start = clock.now();
    let slow_clock = clock.clone();
    let sensor = SensorSource::new(
        meta("slow"),
        20,
        1,
        Box::new(move || -> Result<f64, AcquisitionError> {
            // acquisition takes three periods
            slow_clock.advance(Duration::from_millis(150));
            Ok(1.0)
        }),
    )
    .unwrap();

    let mut sampler = Sampler::with_clock(vec![sensor], clock, start).unwrap();
    let mut dues = Vec::new();
    for _ in 0..8 {
        let report = sampler.step(&Shutdown::new()).unwrap().unwrap();
        assert_eq!(report.firing.next_due - report.firing.due, Duration::from_millis(50));
        dues.push(report.firing.due);
    }
    for (i, due) in dues.iter().enumerate() {
        assert_eq!(*due, start + Duration::from_millis(50) * i as u32);
    }

    let metrics = sampler.metrics();
    let m = metrics.lock();
    assert_eq!(m.sensors[0].overruns, 8);
    assert!(m.sensors[0].late_wakeups > 0);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn scenario_d_failure_keeps_buffer_and_grid() {
    let clock = SimulatedClock::default();
    let start = clock.now();
    let fail_next = Arc::new(AtomicBool::new(false));
    let counter = Arc::new(AtomicU64::new(0));

    let (flag, n) = (fail_next.clone(), counter.clone());
    let sensor = SensorSource::new(
        meta("flaky"),
        4,
        1,
        Box::new(move || -> Result<f64, AcquisitionError> {
            if flag.swap(false, Ordering::SeqCst) {
                return Err(AcquisitionError::Device("bus timeout".into()));
            }
            Ok(n.fetch_add(1, Ordering::SeqCst) as f64)
        }),
    )
    .unwrap();
    let other = constant_sensor("steady", 4, 1, 9.0);

    let mut sampler = Sampler::with_clock(vec![sensor, other], clock, start).unwrap();
    let shutdown = Shutdown::new();

    // two good rounds for both sensors
    sampler.run_for_firings(&shutdown, 4).unwrap();
    let before = sampler.sensor(0).unwrap().lock().snapshot();
    let due_before = sampler.scheduler().next_due(0).unwrap();

    fail_next.store(true, Ordering::SeqCst);
    let report = sampler.step(&shutdown).unwrap().unwrap();
    assert_eq!(report.firing.source, 0);
    assert!(matches!(report.outcome, SampleOutcome::Failed(_)));
    assert_eq!(report.firing.due, due_before);
    assert_eq!(report.firing.next_due, due_before + Duration::from_millis(250));

    let after = sampler.sensor(0).unwrap().lock().snapshot();
    assert_eq!(after.samples, before.samples);
    assert_eq!(sampler.scheduler().next_due(0), Some(due_before + Duration::from_millis(250)));

    // the other sensor is still sampled on time
    let report = sampler.step(&shutdown).unwrap().unwrap();
    assert_eq!(report.firing.source, 1);
    assert_eq!(report.outcome, SampleOutcome::Acquired(9.0));

    let status = sampler.run_for_firings(&shutdown, 4).unwrap();
    assert_eq!(status.acquisition_failures, 0);
    assert_eq!(sampler.metrics().lock().sensors[0].acquisition_failures, 1);
    assert_eq!(sampler.sensor(0).unwrap().lock().valid_count(), 4);
}

#[test]
fn cancellation_stops_loop_between_firings() {
    let clock = SimulatedClock::default();
    let start = clock.now();
    let shutdown = Shutdown::new();
    let stop = shutdown.clone();
    let fired = Arc::new(AtomicU64::new(0));
    let seen = fired.clone();

    let sensor = SensorSource::new(
        meta("stopper"),
        10,
        1,
        Box::new(move || -> Result<f64, AcquisitionError> {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 == 5 {
                stop.trigger();
            }
            Ok(0.0)
        }),
    )
    .unwrap();

    let mut sampler = Sampler::with_clock(vec![sensor], clock, start).unwrap();
    let status = sampler.run(&shutdown).unwrap();
    assert!(status.cancelled);
    assert_eq!(status.firings, 5);
    assert_eq!(fired.load(Ordering::SeqCst), 5);
}

#[test]
fn simulated_clock_reaches_start_instant() {
    let clock = SimulatedClock::new(Instant::now());
    let start = clock.now() + Duration::from_millis(100);
    let mut sampler =
        Sampler::with_clock(vec![constant_sensor("c", 2, 1, 1.0)], clock, start).unwrap();
    sampler.step(&Shutdown::new()).unwrap();
    assert_eq!(sampler.clock().now(), start);
}

// ============================================================================
// EXPORT
// ============================================================================

#[test]
fn export_keeps_one_window_per_source() {
    let dir = tempfile::tempdir().unwrap();
    let clock = SimulatedClock::default();
    let start = clock.now();
    let sensors = vec![
        constant_sensor("CPU", 1, 1, 1.0),
        constant_sensor("CPU", 1, 1, 2.0),
        constant_sensor("summary", 1, 1, 3.0),
    ];
    let mut sampler = Sampler::with_clock(sensors, clock, start).unwrap();
    sampler.run_for_firings(&Shutdown::new(), 3).unwrap();

    let target = sampler.export_target(dir.path());
    assert_eq!(target.export_once().unwrap(), 3);

    let mut windows: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".csv") && n != "summary.csv" && n != "events.csv")
        .collect();
    windows.sort();
    assert_eq!(windows, vec!["00_CPU.csv", "01_CPU.csv", "02_summary.csv"]);

    for (file, value) in windows.iter().zip(["1.0", "2.0", "3.0"]) {
        let text = std::fs::read_to_string(dir.path().join(file)).unwrap();
        assert_eq!(text, format!("index,t_offset_s,value\n0,0.0,{value}\n"));
    }

    let mut summary = csv::Reader::from_path(dir.path().join("summary.csv")).unwrap();
    assert_eq!(summary.records().count(), 3);
}
