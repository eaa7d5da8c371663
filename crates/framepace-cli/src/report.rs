//! Replays a wall-clock trace through the scheduler and summarizes the result.

use framepace_scheduler::{CountingSink, FrameScheduler, SchedulerConfig, VarianceTracker};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::CliError;

const USEC_PER_SEC: f64 = 1_000_000.0;

/// Scheduler decision for one frame of the trace
#[derive(Debug, Clone, Serialize)]
pub struct FrameRow {
    pub frame: usize,
    pub raw_delta: f64,
    pub idle_delta: f64,
    pub tick_count: u32,
    pub interpolation_fraction: f64,
    pub time_deficit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub frames: usize,
    pub physics_ticks_per_second: u32,
    pub elapsed_seconds: f64,
    pub total_ticks: u64,
    pub expected_ticks: f64,
    pub max_ticks_per_frame: u32,
    pub tick_histogram: BTreeMap<u32, u64>,
    pub anomalies: BTreeMap<String, u64>,
    pub variance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub rows: Vec<FrameRow>,
}

fn usec_to_seconds(usec: u64) -> f64 {
    usec as f64 / USEC_PER_SEC
}

/// Drive a fresh scheduler with `samples`; the first sample initializes it.
pub fn run_trace(config: SchedulerConfig, samples: &[u64]) -> Result<Report, CliError> {
    let Some((&first, rest)) = samples.split_first() else {
        return Err(CliError::InvalidTrace("trace is empty".to_string()));
    };

    let tick_period = config.tick_period();
    let ticks_per_second = config.physics_ticks_per_second;
    let mut scheduler = FrameScheduler::with_sink(config, CountingSink::new())?;
    scheduler.init(first);

    info!(
        frames = rest.len(),
        physics_ticks_per_second = ticks_per_second,
        "Replaying trace"
    );

    let mut variance = VarianceTracker::new();
    let mut histogram = BTreeMap::new();
    let mut rows = Vec::with_capacity(rest.len());
    let mut previous = first;

    for (frame, &sample) in rest.iter().enumerate() {
        let raw_delta = usec_to_seconds(sample.saturating_sub(previous));
        previous = sample;

        scheduler.set_wall_clock_sample(sample);
        let timing = scheduler.advance_with_config();
        variance.collect(raw_delta, scheduler.time_deficit(), tick_period);

        *histogram.entry(timing.tick_count).or_insert(0u64) += 1;
        rows.push(FrameRow {
            frame,
            raw_delta,
            idle_delta: timing.idle_delta,
            tick_count: timing.tick_count,
            interpolation_fraction: timing.interpolation_fraction,
            time_deficit: scheduler.time_deficit(),
        });
    }

    let elapsed_seconds = usec_to_seconds(previous.saturating_sub(first));
    let total_ticks = rows.iter().map(|row| u64::from(row.tick_count)).sum();
    let anomalies = scheduler
        .anomalies()
        .iter()
        .map(|(kind, count)| (kind.name().to_string(), count))
        .collect();

    let summary = Summary {
        frames: rows.len(),
        physics_ticks_per_second: ticks_per_second,
        elapsed_seconds,
        total_ticks,
        expected_ticks: elapsed_seconds * f64::from(ticks_per_second),
        max_ticks_per_frame: rows.iter().map(|row| row.tick_count).max().unwrap_or(0),
        tick_histogram: histogram,
        anomalies,
        variance: variance.variance(),
    };
    debug!(?summary, "Trace replay finished");

    Ok(Report { summary, rows })
}
