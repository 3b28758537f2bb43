use std::path::PathBuf;

use crate::domain::errors::AppError;

/// Full-scale magnitude of a signed 16-bit sample.
pub const PCM16_SCALE: f32 = 32768.0;

/// Mono 16-bit PCM buffer. Every stage of the pipeline passes audio around
/// in this form, whatever the source format was.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AudioSegment {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        AudioSegment { samples, sample_rate }
    }

    /// Converts float samples in [-1.0, 1.0] with [`float_to_pcm16`].
    pub fn from_float(samples: &[f32], sample_rate: u32) -> Self {
        AudioSegment::new(samples.iter().copied().map(float_to_pcm16).collect(), sample_rate)
    }

    /// A run of zero-valued samples lasting `len` samples.
    pub fn silence(len: usize, sample_rate: u32) -> Self {
        AudioSegment::new(vec![0; len], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn peak_max(&self) -> Option<i16> {
        self.samples.iter().copied().max()
    }

    pub fn peak_min(&self) -> Option<i16> {
        self.samples.iter().copied().min()
    }

    pub fn append(&mut self, other: &AudioSegment) {
        self.samples.extend_from_slice(&other.samples);
    }
}

/// Scales a float sample by 2^15 and truncates toward zero. Values at or
/// beyond full scale saturate instead of wrapping; NaN maps to zero.
pub fn float_to_pcm16(sample: f32) -> i16 {
    let scaled = (sample * PCM16_SCALE).trunc();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Amplitude range classified as background noise for one recording.
/// A piece is noise when every sample lies within `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBoundaries {
    pub upper: f64,
    pub lower: f64,
}

impl NoiseBoundaries {
    pub fn is_quiet(&self, piece: &AudioSegment) -> bool {
        match (piece.peak_max(), piece.peak_min()) {
            (Some(max), Some(min)) => f64::from(max) <= self.upper && f64::from(min) >= self.lower,
            _ => true,
        }
    }
}

/// The merged word segments of one recording, in source order.
pub type WordList = Vec<AudioSegment>;

/// One reordering of a word list, interleaved with silence.
pub type Permutation = AudioSegment;

/// Sample payload of an in-memory buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSamples {
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl RawSamples {
    fn kind(&self) -> &'static str {
        match self {
            RawSamples::Int16(_) => "int16",
            RawSamples::Float32(_) => "float32",
        }
    }

    fn len(&self) -> usize {
        match self {
            RawSamples::Int16(v) => v.len(),
            RawSamples::Float32(v) => v.len(),
        }
    }
}

/// Caller-supplied audio, possibly interleaved across several channels.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAudio {
    pub samples: RawSamples,
    pub channels: usize,
}

impl RawAudio {
    pub fn mono_i16(samples: Vec<i16>) -> Self {
        RawAudio { samples: RawSamples::Int16(samples), channels: 1 }
    }

    pub fn mono_f32(samples: Vec<f32>) -> Self {
        RawAudio { samples: RawSamples::Float32(samples), channels: 1 }
    }

    pub fn interleaved(samples: RawSamples, channels: usize) -> Self {
        RawAudio { samples, channels }
    }

    /// Keeps the first channel and converts to 16-bit PCM.
    pub fn into_segment(self, sample_rate: u32) -> Result<AudioSegment, AppError> {
        if self.channels == 0 {
            return Err(AppError::type_mismatch("buffer declares zero channels"));
        }
        if self.samples.len() % self.channels != 0 {
            return Err(AppError::type_mismatch(format!(
                "{} buffer of {} samples is not divisible into {} channels",
                self.samples.kind(),
                self.samples.len(),
                self.channels
            )));
        }
        let step = self.channels;
        let samples = match self.samples {
            RawSamples::Int16(v) => v.into_iter().step_by(step).collect(),
            RawSamples::Float32(v) => v.into_iter().step_by(step).map(float_to_pcm16).collect(),
        };
        Ok(AudioSegment::new(samples, sample_rate))
    }
}

/// One element of a caller-assembled batch before it is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    Path(PathBuf),
    Buffer(RawAudio),
}

impl InputItem {
    fn kind(&self) -> &'static str {
        match self {
            InputItem::Path(_) => "file path",
            InputItem::Buffer(_) => "sample buffer",
        }
    }
}

/// Everything the pipeline accepts, resolved once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioInput {
    Path(PathBuf),
    Buffer(RawAudio),
    PathList(Vec<PathBuf>),
    BufferList(Vec<RawAudio>),
}

impl AudioInput {
    /// Builds a batch from loosely typed items. All items must share one
    /// representation; the first item decides which.
    pub fn batch(items: Vec<InputItem>) -> Result<Self, AppError> {
        let Some(first) = items.first() else {
            return Err(AppError::type_mismatch("empty input list"));
        };
        let expected = first.kind();
        if let Some((index, item)) = items.iter().enumerate().find(|(_, i)| i.kind() != expected) {
            return Err(AppError::MalformedBatch {
                index,
                expected,
                found: item.kind(),
            });
        }

        let mut paths = Vec::new();
        let mut buffers = Vec::new();
        for item in items {
            match item {
                InputItem::Path(p) => paths.push(p),
                InputItem::Buffer(b) => buffers.push(b),
            }
        }
        if paths.is_empty() {
            Ok(AudioInput::BufferList(buffers))
        } else {
            Ok(AudioInput::PathList(paths))
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, AudioInput::PathList(_) | AudioInput::BufferList(_))
    }
}

/// A result shaped like the input that produced it: a bare value for a
/// single input, a list for a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Batched<T> {
    Single(T),
    Many(Vec<T>),
}

impl<T> Batched<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Batched::Single(item) => vec![item],
            Batched::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Batched::Single(_) => 1,
            Batched::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single(self) -> Option<T> {
        match self {
            Batched::Single(item) => Some(item),
            Batched::Many(_) => None,
        }
    }

    pub fn many(self) -> Option<Vec<T>> {
        match self {
            Batched::Single(_) => None,
            Batched::Many(items) => Some(items),
        }
    }

    /// Applies `f` to each element, failing the whole batch on the first
    /// error. Errors from a list element are tagged with its index.
    pub fn try_map<U>(
        self,
        mut f: impl FnMut(usize, T) -> Result<U, AppError>,
    ) -> Result<Batched<U>, AppError> {
        match self {
            Batched::Single(item) => f(0, item).map(Batched::Single),
            Batched::Many(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| f(i, item).map_err(|e| e.at_index(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Batched::Many),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_conversion_truncates_toward_zero() {
        assert_eq!(float_to_pcm16(0.5), 16384);
        assert_eq!(float_to_pcm16(-0.5), -16384);
        // 0.00004 * 32768 = 1.31
        assert_eq!(float_to_pcm16(0.00004), 1);
        assert_eq!(float_to_pcm16(-0.00004), -1);
    }

    #[test]
    fn float_conversion_saturates_at_full_scale() {
        assert_eq!(float_to_pcm16(1.0), i16::MAX);
        assert_eq!(float_to_pcm16(-1.0), i16::MIN);
        assert_eq!(float_to_pcm16(3.0), i16::MAX);
        assert_eq!(float_to_pcm16(f32::NAN), 0);
    }

    #[test]
    fn interleaved_buffer_keeps_first_channel() {
        let raw = RawAudio::interleaved(RawSamples::Int16(vec![1, 100, 2, 200, 3, 300]), 2);
        let segment = raw.into_segment(8000).unwrap();
        assert_eq!(segment.samples, vec![1, 2, 3]);
        assert_eq!(segment.sample_rate, 8000);
    }

    #[test]
    fn float_buffer_is_converted() {
        let segment = RawAudio::mono_f32(vec![0.123, 0.14, 0.0, 0.8]).into_segment(22050).unwrap();
        assert_eq!(segment.samples, vec![4030, 4587, 0, 26214]);
    }

    #[test]
    fn ragged_interleaving_is_rejected() {
        let raw = RawAudio::interleaved(RawSamples::Float32(vec![0.0; 5]), 2);
        assert!(matches!(raw.into_segment(8000), Err(AppError::TypeMismatch { .. })));
    }

    #[test]
    fn mixed_batch_is_rejected_at_first_offender() {
        let items = vec![
            InputItem::Path("a.wav".into()),
            InputItem::Path("b.wav".into()),
            InputItem::Buffer(RawAudio::mono_i16(vec![1, 2, 3])),
        ];
        match AudioInput::batch(items) {
            Err(AppError::MalformedBatch { index, expected, found }) => {
                assert_eq!(index, 2);
                assert_eq!(expected, "file path");
                assert_eq!(found, "sample buffer");
            }
            other => panic!("expected malformed batch, got {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_a_type_mismatch() {
        assert!(matches!(AudioInput::batch(Vec::new()), Err(AppError::TypeMismatch { .. })));
    }

    #[test]
    fn homogeneous_batch_resolves() {
        let input = AudioInput::batch(vec![
            InputItem::Buffer(RawAudio::mono_i16(vec![1])),
            InputItem::Buffer(RawAudio::mono_f32(vec![0.5])),
        ])
        .unwrap();
        assert!(matches!(input, AudioInput::BufferList(ref b) if b.len() == 2));
        assert!(input.is_batch());
    }

    #[test]
    fn quiet_piece_must_fit_both_bounds() {
        let bounds = NoiseBoundaries { upper: 10.0, lower: -10.0 };
        assert!(bounds.is_quiet(&AudioSegment::new(vec![10, -10, 0], 8000)));
        assert!(!bounds.is_quiet(&AudioSegment::new(vec![11, 0], 8000)));
        assert!(!bounds.is_quiet(&AudioSegment::new(vec![-11, 0], 8000)));
    }

    #[test]
    fn try_map_tags_batch_errors() {
        let batch = Batched::Many(vec![1, 2, 3]);
        let err = batch
            .try_map(|_, v| {
                if v == 2 {
                    Err(AppError::type_mismatch("two"))
                } else {
                    Ok(v)
                }
            })
            .unwrap_err();
        assert!(matches!(err, AppError::TypeMismatch { index: Some(1), .. }));
    }
}
