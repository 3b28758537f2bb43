use crate::domain::entities::{AudioSegment, NoiseBoundaries, WordList};
use crate::domain::errors::AppError;
use crate::preprocessing::noise_floor::NoiseFloor;
use crate::preprocessing::silence::{SilenceParams, SilenceSplitter};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// A trailing fragment must be longer than this to count as a word.
pub const MIN_WORD_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    pub sample_rate: u32,
    pub silence_threshold_dbfs: f64,
    pub min_silence_ms: u32,
    pub keep_silence_ms: u32,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        let silence = SilenceParams::default();
        SegmentationParams {
            sample_rate: DEFAULT_SAMPLE_RATE,
            silence_threshold_dbfs: silence.threshold_dbfs,
            min_silence_ms: silence.min_silence_ms,
            keep_silence_ms: silence.keep_silence_ms,
        }
    }
}

impl SegmentationParams {
    pub fn silence(&self) -> SilenceParams {
        SilenceParams {
            threshold_dbfs: self.silence_threshold_dbfs,
            min_silence_ms: self.min_silence_ms,
            keep_silence_ms: self.keep_silence_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    InNoise,
    InWord,
}

/// Folds silence-split pieces into words.
///
/// Quiet pieces before a word are carried into it and the first quiet piece
/// after a word closes it, so each word keeps a little silence on both
/// sides. A loud piece directly after another loud piece starts a new word.
pub fn merge_words(pieces: &[AudioSegment], bounds: &NoiseBoundaries) -> WordList {
    let Some(sample_rate) = pieces.first().map(|p| p.sample_rate) else {
        return Vec::new();
    };

    let mut words = Vec::new();
    let mut state = MergeState::InNoise;
    let mut current = AudioSegment::new(Vec::new(), sample_rate);

    for piece in pieces.iter().filter(|p| !p.is_empty()) {
        let quiet = bounds.is_quiet(piece);
        state = match (quiet, state) {
            (true, MergeState::InNoise) => {
                current = piece.clone();
                MergeState::InNoise
            }
            (true, MergeState::InWord) => {
                current.append(piece);
                words.push(std::mem::replace(&mut current, AudioSegment::new(Vec::new(), sample_rate)));
                MergeState::InNoise
            }
            (false, MergeState::InNoise) => {
                current.append(piece);
                MergeState::InWord
            }
            (false, MergeState::InWord) => {
                words.push(std::mem::replace(&mut current, piece.clone()));
                MergeState::InWord
            }
        };
    }

    if state == MergeState::InWord {
        if current.len() > MIN_WORD_SAMPLES {
            words.push(current);
        } else {
            debug!(samples = current.len(), "dropped trailing fragment");
        }
    }
    words
}

pub struct Segmenter {
    params: SegmentationParams,
    splitter: SilenceSplitter,
    noise_floor: NoiseFloor,
}

impl Segmenter {
    pub fn new(params: SegmentationParams) -> Result<Self, AppError> {
        if params.sample_rate == 0 {
            return Err(AppError::invalid("sample_rate", "must be positive"));
        }
        Ok(Segmenter {
            splitter: SilenceSplitter::new(params.silence())?,
            noise_floor: NoiseFloor::default(),
            params,
        })
    }

    pub fn with_noise_floor(mut self, noise_floor: NoiseFloor) -> Self {
        self.noise_floor = noise_floor;
        self
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    pub fn word_segments(&self, audio: &AudioSegment) -> Result<WordList, AppError> {
        let bounds = self.noise_floor.estimate(audio)?;
        let pieces = self.splitter.split(audio);
        let words = merge_words(&pieces, &bounds);
        info!(
            samples = audio.len(),
            pieces = pieces.len(),
            words = words.len(),
            "segmented recording"
        );
        Ok(words)
    }

    /// Drops silence, joins what is left and cuts it into consecutive chunks
    /// of exactly `segment_ms`. A short remainder is discarded.
    pub fn fixed_length_segments(
        &self,
        audio: &AudioSegment,
        segment_ms: u32,
    ) -> Result<Vec<AudioSegment>, AppError> {
        if segment_ms == 0 {
            return Err(AppError::invalid("segment_ms", "must be at least 1 ms"));
        }
        let mut voiced = AudioSegment::new(Vec::new(), audio.sample_rate);
        for piece in self.splitter.split(audio) {
            voiced.append(&piece);
        }

        let segment_length = (u64::from(segment_ms) * u64::from(audio.sample_rate) / 1000) as usize;
        if segment_length == 0 {
            return Err(AppError::invalid(
                "segment_ms",
                format!("{segment_ms} ms is shorter than one sample at {} Hz", audio.sample_rate),
            ));
        }
        let segments: Vec<AudioSegment> = voiced
            .samples
            .chunks_exact(segment_length)
            .map(|chunk| AudioSegment::new(chunk.to_vec(), audio.sample_rate))
            .collect();
        info!(voiced = voiced.len(), chunks = segments.len(), "cut fixed-length segments");
        Ok(segments)
    }
}
