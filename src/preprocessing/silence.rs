//! Silence-based splitting on a millisecond grid.
//!
//! A window of `min_silence_ms` is silent when its RMS does not exceed the
//! threshold amplitude. Runs of silent windows become silent ranges, the
//! gaps between them become pieces, and every piece keeps up to
//! `keep_silence_ms` of its surrounding silence.

use crate::domain::entities::AudioSegment;
use crate::domain::errors::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SILENCE_THRESHOLD_DBFS: f64 = -60.0;
pub const DEFAULT_MIN_SILENCE_MS: u32 = 5;
pub const DEFAULT_KEEP_SILENCE_MS: u32 = 100;

const FULL_SCALE: f64 = 32768.0;

/// Half-open millisecond range `[start, end)`.
pub type MsRange = (u64, u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceParams {
    pub threshold_dbfs: f64,
    pub min_silence_ms: u32,
    pub keep_silence_ms: u32,
}

impl Default for SilenceParams {
    fn default() -> Self {
        SilenceParams {
            threshold_dbfs: DEFAULT_SILENCE_THRESHOLD_DBFS,
            min_silence_ms: DEFAULT_MIN_SILENCE_MS,
            keep_silence_ms: DEFAULT_KEEP_SILENCE_MS,
        }
    }
}

pub fn db_to_amplitude(dbfs: f64) -> f64 {
    10f64.powf(dbfs / 20.0) * FULL_SCALE
}

pub struct SilenceSplitter {
    params: SilenceParams,
    threshold: f64,
}

impl SilenceSplitter {
    pub fn new(params: SilenceParams) -> Result<Self, AppError> {
        if params.min_silence_ms == 0 {
            return Err(AppError::invalid("min_silence_ms", "must be at least 1 ms"));
        }
        if !params.threshold_dbfs.is_finite() || params.threshold_dbfs > 0.0 {
            return Err(AppError::invalid(
                "silence_threshold_dbfs",
                format!("{} is not a finite value at or below 0 dBFS", params.threshold_dbfs),
            ));
        }
        Ok(SilenceSplitter {
            threshold: db_to_amplitude(params.threshold_dbfs),
            params,
        })
    }

    pub fn params(&self) -> &SilenceParams {
        &self.params
    }

    /// Silent ranges in milliseconds, merged and in order.
    pub fn detect_silence(&self, segment: &AudioSegment) -> Vec<MsRange> {
        let grid = MsGrid::new(segment);
        let min_len = u64::from(self.params.min_silence_ms);
        if grid.len_ms < min_len {
            return Vec::new();
        }

        let mut starts = (0..=grid.len_ms - min_len)
            .filter(|&ms| grid.window_rms(ms, ms + min_len) <= self.threshold);
        let Some(first) = starts.next() else {
            return Vec::new();
        };

        let mut ranges = Vec::new();
        let mut range_start = first;
        let mut prev = first;
        for start in starts {
            let continuous = start == prev + 1;
            let has_gap = start > prev + min_len;
            if !continuous && has_gap {
                ranges.push((range_start, prev + min_len));
                range_start = start;
            }
            prev = start;
        }
        ranges.push((range_start, prev + min_len));
        ranges
    }

    /// Complement of [`detect_silence`](Self::detect_silence).
    pub fn detect_nonsilent(&self, segment: &AudioSegment) -> Vec<MsRange> {
        let len_ms = MsGrid::new(segment).len_ms;
        let silent = self.detect_silence(segment);
        if silent.is_empty() {
            return vec![(0, len_ms)];
        }
        if silent[0] == (0, len_ms) {
            return Vec::new();
        }

        let mut ranges = Vec::with_capacity(silent.len() + 1);
        let mut prev_end = 0;
        for &(start, end) in &silent {
            ranges.push((prev_end, start));
            prev_end = end;
        }
        if prev_end != len_ms {
            ranges.push((prev_end, len_ms));
        }
        if ranges.first() == Some(&(0, 0)) {
            ranges.remove(0);
        }
        ranges
    }

    /// Splits `segment` into the pieces between silences. The input is not
    /// modified; each piece is an owned copy.
    pub fn split(&self, segment: &AudioSegment) -> Vec<AudioSegment> {
        let grid = MsGrid::new(segment);
        let keep = i64::from(self.params.keep_silence_ms);
        let mut padded: Vec<(i64, i64)> = self
            .detect_nonsilent(segment)
            .into_iter()
            .map(|(start, end)| (start as i64 - keep, end as i64 + keep))
            .collect();

        // Neighbours whose kept silence overlaps meet halfway.
        for i in 1..padded.len() {
            let last_end = padded[i - 1].1;
            let next_start = padded[i].0;
            if next_start < last_end {
                let mid = (last_end + next_start).div_euclid(2);
                padded[i - 1].1 = mid;
                padded[i].0 = mid;
            }
        }

        let len_ms = grid.len_ms as i64;
        let pieces: Vec<AudioSegment> = padded
            .into_iter()
            .map(|(start, end)| {
                let from = grid.index(start.clamp(0, len_ms) as u64);
                let to = grid.index(end.clamp(0, len_ms) as u64).max(from);
                AudioSegment::new(segment.samples[from..to].to_vec(), segment.sample_rate)
            })
            .collect();
        debug!(pieces = pieces.len(), len_ms = grid.len_ms, "split on silence");
        pieces
    }
}

/// Maps milliseconds onto sample indices and answers window RMS queries
/// from a prefix sum of squares.
struct MsGrid {
    sample_rate: u64,
    len_ms: u64,
    squares: Vec<u64>,
}

impl MsGrid {
    fn new(segment: &AudioSegment) -> Self {
        let sample_rate = u64::from(segment.sample_rate);
        let len = segment.samples.len() as u64;
        let len_ms = if sample_rate == 0 {
            0
        } else {
            (len * 1000 + sample_rate / 2) / sample_rate
        };
        let mut squares = Vec::with_capacity(segment.samples.len() + 1);
        squares.push(0u64);
        let mut acc = 0u64;
        for &s in &segment.samples {
            let v = i64::from(s);
            acc += (v * v) as u64;
            squares.push(acc);
        }
        MsGrid { sample_rate, len_ms, squares }
    }

    fn sample_count(&self) -> usize {
        self.squares.len() - 1
    }

    fn index(&self, ms: u64) -> usize {
        let idx = (ms * self.sample_rate / 1000) as usize;
        idx.min(self.sample_count())
    }

    /// Integer RMS of `[from_ms, to_ms)`; empty windows read as zero.
    fn window_rms(&self, from_ms: u64, to_ms: u64) -> f64 {
        let from = self.index(from_ms);
        let to = self.index(to_ms);
        if to <= from {
            return 0.0;
        }
        let energy = self.squares[to] - self.squares[from];
        (energy as f64 / (to - from) as f64).sqrt().floor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn tone(ms: usize, amplitude: f64) -> Vec<i16> {
        (0..ms * RATE as usize / 1000)
            .map(|n| (amplitude * (std::f64::consts::PI * n as f64 / 10.0).sin()) as i16)
            .collect()
    }

    fn hush(ms: usize) -> Vec<i16> {
        (0..ms * RATE as usize / 1000)
            .map(|n| if n % 2 == 0 { 3 } else { -3 })
            .collect()
    }

    fn splitter() -> SilenceSplitter {
        SilenceSplitter::new(SilenceParams::default()).unwrap()
    }

    fn two_words() -> AudioSegment {
        let mut samples = hush(300);
        samples.extend(tone(200, 8000.0));
        samples.extend(hush(300));
        samples.extend(tone(200, 8000.0));
        samples.extend(hush(300));
        AudioSegment::new(samples, RATE)
    }

    #[test]
    fn threshold_follows_dbfs() {
        assert!((db_to_amplitude(0.0) - 32768.0).abs() < 1e-9);
        assert!((db_to_amplitude(-60.0) - 32.768).abs() < 1e-9);
    }

    #[test]
    fn silent_ranges_cover_the_gaps() {
        let ranges = splitter().detect_silence(&two_words());
        assert_eq!(ranges, vec![(0, 300), (500, 800), (1000, 1300)]);
    }

    #[test]
    fn nonsilent_ranges_cover_the_tones() {
        let ranges = splitter().detect_nonsilent(&two_words());
        assert_eq!(ranges, vec![(300, 500), (800, 1000)]);
    }

    #[test]
    fn pieces_keep_surrounding_silence() {
        let pieces = splitter().split(&two_words());
        assert_eq!(pieces.len(), 2);
        // 200..600 ms and 700..1100 ms at 8 samples per ms
        assert_eq!(pieces[0].len(), 3200);
        assert_eq!(pieces[1].len(), 3200);
        assert_eq!(pieces[0].samples[..], two_words().samples[1600..4800]);
    }

    #[test]
    fn overlapping_padding_meets_halfway() {
        let mut samples = tone(100, 8000.0);
        samples.extend(hush(50));
        samples.extend(tone(100, 8000.0));
        let segment = AudioSegment::new(samples, RATE);
        let pieces = splitter().split(&segment);
        assert_eq!(pieces.len(), 2);
        // silence 100..150 ms, padded ranges meet at 125 ms
        assert_eq!(pieces[0].len(), 125 * 8);
        assert_eq!(pieces[1].len(), 125 * 8);
    }

    #[test]
    fn loud_buffer_is_one_piece() {
        let segment = AudioSegment::new(tone(100, 8000.0), RATE);
        let pieces = splitter().split(&segment);
        assert_eq!(pieces, vec![segment]);
    }

    #[test]
    fn silent_buffer_has_no_pieces() {
        let segment = AudioSegment::new(hush(100), RATE);
        assert!(splitter().split(&segment).is_empty());
    }

    #[test]
    fn buffer_shorter_than_min_silence_is_never_silent() {
        let segment = AudioSegment::new(hush(3), RATE);
        assert!(splitter().detect_silence(&segment).is_empty());
        assert_eq!(splitter().split(&segment).len(), 1);
    }

    #[test]
    fn zero_min_silence_is_rejected() {
        let params = SilenceParams { min_silence_ms: 0, ..SilenceParams::default() };
        assert!(matches!(
            SilenceSplitter::new(params),
            Err(AppError::InvalidParameter { name: "min_silence_ms", .. })
        ));
    }

    #[test]
    fn positive_threshold_is_rejected() {
        let params = SilenceParams { threshold_dbfs: 3.0, ..SilenceParams::default() };
        assert!(SilenceSplitter::new(params).is_err());
    }
}
