/*
Scheduler overhead and wake-up jitter.

`fire_earliest` is the per-tick bookkeeping cost (heap reposition) for growing numbers of
sensors. The jitter group runs a 5 ms grid on the real clock, comparing plain thread::sleep
against SystemClock (SpinSleeper), measured as deviation from the fixed grid.
*/

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use std::{
    hint::black_box,
    thread,
    time::{Duration, Instant},
};

use rts_sampler::{Clock, PeriodicScheduler, Shutdown, SimulatedClock, SystemClock};

const TARGET_PERIOD: Duration = Duration::from_millis(5);

// Enough ticks to expose jitter without making each iteration take seconds
const TICKS: usize = 200;

fn bench_fire_earliest(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_fire_earliest");

    for sources in [1usize, 8, 64, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(sources), &sources, |b, &n| {
            let t0 = Instant::now();
            let mut s = PeriodicScheduler::new();
            for id in 0..n {
                // mixed rates so the heap actually reorders
                s.register(id, 1 + (id as u64 % 50) * 20, t0).unwrap();
            }
            b.iter(|| black_box(s.fire_earliest().unwrap()));
        });
    }
    group.finish();
}

fn bench_simulated_tick(c: &mut Criterion) {
    c.bench_function("scheduler_run_once_simulated", |b| {
        let clock = SimulatedClock::default();
        let shutdown = Shutdown::new();
        let mut s = PeriodicScheduler::new();
        s.register(0, 1_000, clock.now()).unwrap();
        s.register(1, 333, clock.now()).unwrap();
        b.iter(|| black_box(s.run_once_blocking(&clock, &shutdown).unwrap()));
    });
}

fn bench_grid_jitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_grid_jitter");
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("thread_sleep", "5ms"), |b| {
        b.iter(|| {
            let mut jitter = Vec::with_capacity(TICKS);
            let mut due = Instant::now() + TARGET_PERIOD;
            for _ in 0..TICKS {
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
                jitter.push(Instant::now().saturating_duration_since(due));
                due += TARGET_PERIOD;
            }
            black_box(jitter);
        });
    });

    group.bench_function(BenchmarkId::new("system_clock", "5ms"), |b| {
        let clock = SystemClock::default();
        let shutdown = Shutdown::new();
        b.iter(|| {
            let mut jitter = Vec::with_capacity(TICKS);
            let mut s = PeriodicScheduler::new();
            s.register_period(0, TARGET_PERIOD, clock.now() + TARGET_PERIOD).unwrap();
            for _ in 0..TICKS {
                let rts_sampler::Tick::Fired(f) = s.run_once_blocking(&clock, &shutdown).unwrap()
                else {
                    break;
                };
                jitter.push(clock.now().saturating_duration_since(f.due));
            }
            black_box(jitter);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fire_earliest, bench_simulated_tick, bench_grid_jitter);
criterion_main!(benches);
