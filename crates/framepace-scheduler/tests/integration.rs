//! Integration tests for the frame scheduler crate.

use framepace_scheduler::{
    AnomalyKind, CONTROL_STEPS, CountingSink, FrameScheduler, FrameTiming, MAX_FRAME_DELTA,
    ManualClock, SchedulerConfig, SchedulerResult, VarianceTracker, WallClock,
};

const TPS: u32 = 60;
const TICK: f64 = 1.0 / 60.0;

fn counting_scheduler(config: SchedulerConfig) -> SchedulerResult<FrameScheduler<CountingSink>> {
    let mut scheduler = FrameScheduler::with_sink(config, CountingSink::new())?;
    scheduler.init(0);
    Ok(scheduler)
}

fn run_deltas(
    scheduler: &mut FrameScheduler<CountingSink>,
    deltas: impl IntoIterator<Item = f64>,
) -> Vec<FrameTiming> {
    deltas
        .into_iter()
        .map(|delta| scheduler.advance_delta(TICK, TPS, delta))
        .collect()
}

fn window_sums(ticks: &[u32], window: usize) -> impl Iterator<Item = u32> + '_ {
    ticks.windows(window).map(|frames| frames.iter().sum())
}

#[test]
fn test_steady_60hz_from_microsecond_samples() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;

    // 0, 16667, 33333, 50000, ... microseconds
    let frames: Vec<FrameTiming> = (1..400u64)
        .map(|frame| {
            scheduler.set_wall_clock_sample((frame * 1_000_000 + 30) / 60);
            scheduler.advance(TICK, TPS)
        })
        .collect();

    let settled = frames.get(CONTROL_STEPS..).unwrap_or_default();
    assert!(!settled.is_empty());
    for (index, frame) in settled.iter().enumerate() {
        assert_eq!(frame.tick_count, 1, "frame {}", index + CONTROL_STEPS);
    }

    // Interpolation settles instead of wandering across the tick.
    let (low, high) = settled.iter().fold((f64::MAX, f64::MIN), |(low, high), frame| {
        (
            low.min(frame.interpolation_fraction),
            high.max(frame.interpolation_fraction),
        )
    });
    assert!(high - low < 0.05, "fraction spread {low}..{high}");
    Ok(())
}

#[test]
fn test_jitter_absorption() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    let deltas = (0..400).map(|frame| if frame % 2 == 0 { TICK * 0.9 } else { TICK * 1.1 });

    let ticks: Vec<u32> = run_deltas(&mut scheduler, deltas)
        .iter()
        .map(|frame| frame.tick_count)
        .collect();
    let settled = ticks.get(30..).unwrap_or_default();

    for window in 1..=CONTROL_STEPS {
        let ideal = window as i64;
        for sum in window_sums(settled, window) {
            assert!(
                (i64::from(sum) - ideal).abs() <= 1,
                "window {window}: {sum} ticks"
            );
        }
    }
    Ok(())
}

#[test]
fn test_bounded_drift_under_jitter() -> SchedulerResult {
    let config = SchedulerConfig::default();
    let max_deviation = config.jitter_tolerance * TICK + 1e-9;
    let mut scheduler = counting_scheduler(config)?;

    for frame in 0..400 {
        let raw = if frame % 2 == 0 { TICK * 0.9 } else { TICK * 1.1 };
        let timing = scheduler.advance_delta(TICK, TPS, raw);

        if frame >= 30 {
            assert!((timing.idle_delta - raw).abs() <= max_deviation);
            assert!(scheduler.time_deficit().abs() <= max_deviation);
        }
    }
    Ok(())
}

#[test]
fn test_extreme_stall_is_spread() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    run_deltas(&mut scheduler, std::iter::repeat_n(TICK, 100));

    let stall = scheduler.advance_delta(TICK, TPS, 2.0);
    let after = scheduler.advance_delta(TICK, TPS, TICK);

    // Half of the stall now, the rest on the next frame.
    assert!((30..=70).contains(&stall.tick_count), "stall frame: {}", stall.tick_count);
    assert!((30..=70).contains(&after.tick_count), "next frame: {}", after.tick_count);
    let combined = stall.tick_count + after.tick_count;
    assert!((117..=123).contains(&combined), "combined: {combined}");

    let recovery = run_deltas(&mut scheduler, std::iter::repeat_n(TICK, 40));
    assert!(recovery.iter().all(|frame| frame.tick_count <= 2));
    assert!(
        recovery
            .get(CONTROL_STEPS..)
            .unwrap_or_default()
            .iter()
            .all(|frame| frame.tick_count == 1)
    );
    Ok(())
}

#[test]
fn test_absurd_delta_is_capped() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    run_deltas(&mut scheduler, std::iter::repeat_n(TICK, 20));

    let stall = scheduler.advance_delta(TICK, TPS, 1e20);
    let after = scheduler.advance_delta(TICK, TPS, TICK);
    assert!(stall.idle_delta.is_finite());
    assert_eq!(
        scheduler.anomalies().count(AnomalyKind::DeltaOutOfRange),
        1
    );

    // One capped hour of physics, released in two halves.
    let expected = MAX_FRAME_DELTA * f64::from(TPS);
    let combined = f64::from(stall.tick_count) + f64::from(after.tick_count);
    assert!((combined - expected).abs() <= 10.0, "combined: {combined}");

    let recovery = run_deltas(&mut scheduler, std::iter::repeat_n(TICK, 40));
    assert!(
        recovery
            .get(CONTROL_STEPS..)
            .unwrap_or_default()
            .iter()
            .all(|frame| frame.tick_count == 1)
    );
    Ok(())
}

#[test]
fn test_fixed_fps_30() -> SchedulerResult {
    let config = SchedulerConfig::default().with_fixed_fps(Some(30));
    let mut scheduler = counting_scheduler(config)?;

    let deltas = [TICK, 0.001, 0.25, TICK * 3.0, 0.0];
    let frames = run_deltas(&mut scheduler, deltas.iter().copied().cycle().take(60));

    for frame in &frames {
        assert!((frame.idle_delta - 1.0 / 30.0).abs() < 1e-12);
    }
    let total: u32 = frames.iter().map(|frame| frame.tick_count).sum();
    assert!((119..=121).contains(&total), "total ticks {total}");
    Ok(())
}

#[test]
fn test_render_faster_than_physics() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    let frames = run_deltas(&mut scheduler, std::iter::repeat_n(1.0 / 144.0, 1440));
    let ticks: Vec<u32> = frames.iter().map(|frame| frame.tick_count).collect();

    // Ten seconds of 144 Hz rendering over 60 Hz physics.
    let total: u32 = ticks.iter().sum();
    assert!((598..=602).contains(&total), "total ticks {total}");

    let settled = ticks.get(24..).unwrap_or_default();
    assert!(settled.iter().all(|&count| count <= 1));
    for sum in window_sums(settled, CONTROL_STEPS) {
        assert!((4..=6).contains(&sum), "12-frame window: {sum}");
    }
    Ok(())
}

#[test]
fn test_physics_rate_change_self_heals() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    run_deltas(&mut scheduler, std::iter::repeat_n(TICK, 100));

    scheduler.set_physics_rate(120)?;
    let tick_period = scheduler.config().tick_period();
    let frames: Vec<FrameTiming> = (0..120)
        .map(|_| scheduler.advance_delta(tick_period, 120, TICK))
        .collect();

    // Healed within one window's worth of frames.
    let healed = frames.get(CONTROL_STEPS..).unwrap_or_default();
    for (index, frame) in healed.iter().enumerate() {
        assert_eq!(frame.tick_count, 2, "frame {}", index + CONTROL_STEPS);
    }

    let tail = frames.get(60..).unwrap_or_default();
    let total: u32 = tail.iter().map(|frame| frame.tick_count).sum();
    assert!((118..=122).contains(&total), "ticks over one second: {total}");
    Ok(())
}

#[test]
fn test_clock_running_backwards() -> SchedulerResult {
    let clock = ManualClock::new(1_000_000);
    let mut scheduler =
        FrameScheduler::with_sink(SchedulerConfig::default(), CountingSink::new())?;
    scheduler.init(clock.now_usec());

    for _ in 0..30 {
        clock.advance(16_667);
        scheduler.advance_from_clock(&clock);
    }

    clock.set(500_000);
    let frame = scheduler.advance_from_clock(&clock);
    assert!(frame.idle_delta >= 0.0);
    assert!((0.0..=1.0).contains(&frame.interpolation_fraction));

    let anomalies = scheduler.anomalies();
    assert_eq!(anomalies.count(AnomalyKind::ClockWentBackwards), 1);
    Ok(())
}

#[test]
fn test_advance_before_init() -> SchedulerResult {
    let mut scheduler =
        FrameScheduler::with_sink(SchedulerConfig::default(), CountingSink::new())?;
    scheduler.set_wall_clock_sample(42_000_000);

    let first = scheduler.advance_with_config();
    assert!(scheduler.is_initialized());
    assert_eq!(first.tick_count, 0);

    scheduler.set_wall_clock_sample(42_016_667);
    let second = scheduler.advance_with_config();
    assert!(second.tick_count <= 1);
    Ok(())
}

#[test]
fn test_default_sink_counts_anomalies() -> SchedulerResult {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut scheduler = FrameScheduler::new(SchedulerConfig::default())?;
    scheduler.init(0);
    for _ in 0..5 {
        scheduler.advance(TICK, TPS);
    }

    // Logged once, counted every time.
    assert_eq!(scheduler.anomalies().count(AnomalyKind::NonPositiveDelta), 5);
    Ok(())
}

#[test]
fn test_config_from_json_drives_scheduler() -> SchedulerResult {
    let config = SchedulerConfig::from_json(
        r#"{ "physics_ticks_per_second": 120, "jitter_tolerance": 0.25 }"#,
    )?;
    let mut scheduler = counting_scheduler(config)?;

    let mut now = 0;
    let mut total = 0;
    for _ in 0..120 {
        now += 16_667;
        scheduler.set_wall_clock_sample(now);
        total += scheduler.advance_with_config().tick_count;
    }

    // Two seconds at 120 Hz.
    assert!((238..=242).contains(&total), "total ticks {total}");
    Ok(())
}

#[test]
fn test_variance_tracker_fed_from_scheduler() -> SchedulerResult {
    let mut scheduler = counting_scheduler(SchedulerConfig::default())?;
    let mut steady = VarianceTracker::new();
    let mut jittery = VarianceTracker::new();

    for _ in 0..120 {
        scheduler.advance_delta(TICK, TPS, TICK);
        steady.collect(TICK, scheduler.time_deficit(), TICK);
    }

    for frame in 0..120 {
        let raw = if frame % 2 == 0 { TICK * 0.8 } else { TICK * 1.2 };
        scheduler.advance_delta(TICK, TPS, raw);
        jittery.collect(raw, scheduler.time_deficit(), TICK);
    }

    assert!(steady.variance() < jittery.variance());
    assert!(jittery.variance() <= TICK);
    assert!(jittery.variance() >= TICK * 0.4 - 1e-9);
    Ok(())
}
