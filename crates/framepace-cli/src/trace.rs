//! Wall-clock traces: synthetic generation and loading from disk.
//!
//! A trace is a list of monotonic microsecond readings, one per rendered
//! frame, starting with the reading taken at scheduler init.

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use crate::error::CliError;

const USEC_PER_SEC: u64 = 1_000_000;

/// Length of the stall injected by [`Pattern::Stall`].
pub const STALL_USEC: u64 = 2_000_000;

/// Synthetic frame timing pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pattern {
    /// Evenly spaced frames at the render rate
    Steady,
    /// Frames displaced by up to ±10% of a frame (vsync jitter)
    Jitter,
    /// Steady frames with one two-second stall halfway through
    Stall,
    /// Steady frames at a render rate unrelated to the physics rate
    Mismatch,
}

impl Pattern {
    /// Render rate used when none is given.
    pub fn default_render_hz(self) -> u32 {
        match self {
            Pattern::Mismatch => 144,
            Pattern::Steady | Pattern::Jitter | Pattern::Stall => 60,
        }
    }
}

/// Generate `frames + 1` samples (the init reading plus one per frame).
pub fn generate(
    pattern: Pattern,
    frames: usize,
    render_hz: u32,
    seed: u64,
) -> Result<Vec<u64>, CliError> {
    if render_hz == 0 {
        return Err(CliError::InvalidTrace(
            "render rate must be positive".to_string(),
        ));
    }

    let rate = u64::from(render_hz);
    let max_displacement = i64::try_from(USEC_PER_SEC / rate / 10).unwrap_or(0);
    let stall_frame = u64::try_from(frames / 2).unwrap_or(u64::MAX);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut samples = Vec::with_capacity(frames.saturating_add(1));
    samples.push(0);

    for frame in (1u64..).take(frames) {
        // Rounded ideal timestamp of this frame.
        let ideal = frame.saturating_mul(USEC_PER_SEC).saturating_add(rate / 2) / rate;

        let sample = match pattern {
            Pattern::Steady | Pattern::Mismatch => ideal,
            Pattern::Jitter => {
                let displacement = rng.random_range(-max_displacement..=max_displacement);
                ideal.saturating_add_signed(displacement)
            }
            Pattern::Stall if frame > stall_frame => ideal.saturating_add(STALL_USEC),
            Pattern::Stall => ideal,
        };
        samples.push(sample);
    }

    Ok(samples)
}

/// Load a trace stored as a JSON array of microsecond readings.
pub fn load_samples(path: &Path) -> Result<Vec<u64>, CliError> {
    let text = std::fs::read_to_string(path)?;
    let samples: Vec<u64> = serde_json::from_str(&text)?;

    if samples.len() < 2 {
        return Err(CliError::InvalidTrace(format!(
            "{} holds {} samples, at least two are needed",
            path.display(),
            samples.len()
        )));
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn deltas(samples: &[u64]) -> Vec<u64> {
        samples
            .windows(2)
            .filter_map(|pair| match pair {
                [earlier, later] => Some(later.saturating_sub(*earlier)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn steady_trace_matches_render_rate() -> TestResult {
        let samples = generate(Pattern::Steady, 6, 60, 0)?;
        assert_eq!(
            samples,
            vec![0, 16_667, 33_333, 50_000, 66_667, 83_333, 100_000]
        );
        Ok(())
    }

    #[test]
    fn jitter_trace_stays_monotonic() -> TestResult {
        let samples = generate(Pattern::Jitter, 500, 60, 7)?;
        assert_eq!(samples.len(), 501);

        for delta in deltas(&samples) {
            assert!((13_000..=20_400).contains(&delta), "delta {delta}");
        }
        Ok(())
    }

    #[test]
    fn jitter_trace_is_reproducible() -> TestResult {
        let first = generate(Pattern::Jitter, 50, 60, 42)?;
        let second = generate(Pattern::Jitter, 50, 60, 42)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn stall_trace_has_one_long_frame() -> TestResult {
        let samples = generate(Pattern::Stall, 100, 60, 0)?;
        let long_frames: Vec<u64> = deltas(&samples)
            .into_iter()
            .filter(|&delta| delta > 100_000)
            .collect();

        assert_eq!(long_frames.len(), 1);
        assert!(long_frames.iter().all(|&delta| delta > STALL_USEC));
        Ok(())
    }

    #[test]
    fn mismatch_defaults_to_144hz() -> TestResult {
        assert_eq!(Pattern::Mismatch.default_render_hz(), 144);
        let samples = generate(Pattern::Mismatch, 144, 144, 0)?;
        assert_eq!(samples.last().copied(), Some(1_000_000));
        Ok(())
    }

    #[test]
    fn zero_render_rate_is_rejected() {
        assert!(matches!(
            generate(Pattern::Steady, 10, 0, 0),
            Err(CliError::InvalidTrace(_))
        ));
    }

    #[test]
    fn load_samples_from_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "[0, 16667, 33333, 50000]")?;

        let samples = load_samples(file.path())?;
        assert_eq!(samples, vec![0, 16_667, 33_333, 50_000]);
        Ok(())
    }

    #[test]
    fn load_samples_rejects_short_trace() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "[0]")?;

        assert!(matches!(
            load_samples(file.path()),
            Err(CliError::InvalidTrace(_))
        ));
        Ok(())
    }

    #[test]
    fn load_samples_rejects_malformed_json() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "[0, -5, \"x\"]")?;

        assert!(matches!(
            load_samples(file.path()),
            Err(CliError::JsonError(_))
        ));
        Ok(())
    }
}
