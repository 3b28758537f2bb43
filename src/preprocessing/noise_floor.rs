//! Per-recording noise floor estimation.
//!
//! Samples are split by sign and each half is summarised by the mean of its
//! loudest and quietest fractions. The noise band starts at the quiet end of
//! each half and extends a fraction of the way toward the loud end.

use crate::domain::entities::{AudioSegment, NoiseBoundaries};
use crate::domain::errors::{AppError, Polarity};
use tracing::debug;

pub const DEFAULT_MAX_PERC: f64 = 0.2;
pub const DEFAULT_MIN_PERC: f64 = 0.2;

/// Populations this small use raw extrema instead of fractional means.
const SMALL_POPULATION: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloor {
    max_perc: f64,
    min_perc: f64,
}

impl Default for NoiseFloor {
    fn default() -> Self {
        NoiseFloor {
            max_perc: DEFAULT_MAX_PERC,
            min_perc: DEFAULT_MIN_PERC,
        }
    }
}

impl NoiseFloor {
    pub fn new(max_perc: f64, min_perc: f64) -> Result<Self, AppError> {
        for (name, value) in [("max_perc", max_perc), ("min_perc", min_perc)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(AppError::invalid(name, format!("{value} is outside (0, 1]")));
            }
        }
        Ok(NoiseFloor { max_perc, min_perc })
    }

    pub fn estimate(&self, segment: &AudioSegment) -> Result<NoiseBoundaries, AppError> {
        let mut positive: Vec<i16> = segment.samples.iter().copied().filter(|&s| s > 0).collect();
        let mut negative: Vec<i16> = segment.samples.iter().copied().filter(|&s| s < 0).collect();
        if positive.is_empty() {
            return Err(AppError::InsufficientSignal { index: None, polarity: Polarity::Positive });
        }
        if negative.is_empty() {
            return Err(AppError::InsufficientSignal { index: None, polarity: Polarity::Negative });
        }
        positive.sort_unstable();
        negative.sort_unstable();

        // Positive half: loud end is the top, quiet end the bottom.
        let max_p = tail_mean(&positive, self.max_perc);
        let min_p = head_mean(&positive, self.min_perc);
        // Negative half: loud end is the bottom, quiet end the top.
        let min_n = head_mean(&negative, self.max_perc);
        let max_n = tail_mean(&negative, self.min_perc);

        let snr_p = max_p - min_p;
        let snr_n = min_n - max_n;
        let bounds = NoiseBoundaries {
            upper: min_p + snr_p * self.max_perc,
            lower: min_n - snr_n * self.min_perc,
        };
        debug!(
            positives = positive.len(),
            negatives = negative.len(),
            upper = bounds.upper,
            lower = bounds.lower,
            "estimated noise boundaries"
        );
        Ok(bounds)
    }
}

pub fn noise_boundaries(segment: &AudioSegment) -> Result<NoiseBoundaries, AppError> {
    NoiseFloor::default().estimate(segment)
}

fn fraction_len(len: usize, perc: f64) -> usize {
    ((len as f64 * perc).floor() as usize).clamp(1, len)
}

/// Mean of the largest `perc` of an ascending, non-empty slice.
fn tail_mean(sorted: &[i16], perc: f64) -> f64 {
    if sorted.len() <= SMALL_POPULATION {
        return f64::from(sorted[sorted.len() - 1]);
    }
    let n = fraction_len(sorted.len(), perc);
    mean(&sorted[sorted.len() - n..])
}

/// Mean of the smallest `perc` of an ascending, non-empty slice.
fn head_mean(sorted: &[i16], perc: f64) -> f64 {
    if sorted.len() <= SMALL_POPULATION {
        return f64::from(sorted[0]);
    }
    let n = fraction_len(sorted.len(), perc);
    mean(&sorted[..n])
}

fn mean(values: &[i16]) -> f64 {
    values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64
}
