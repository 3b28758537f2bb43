//! Fans single and batched inputs out over the segmenter and permuter and
//! hands results back in the caller's shape.

use crate::domain::entities::{AudioInput, AudioSegment, Batched, Permutation, WordList};
use crate::domain::errors::AppError;
use crate::infrastructure::audio_io::decode;
use crate::preprocessing::permutation::{PermutationParams, Permuter};
use crate::preprocessing::segmenter::{SegmentationParams, Segmenter};
use tracing::info;

/// Loads every input as mono 16-bit PCM at `sample_rate`. In-memory buffers
/// are taken to already be at that rate.
pub fn load(input: AudioInput, sample_rate: u32) -> Result<Batched<AudioSegment>, AppError> {
    match input {
        AudioInput::Path(path) => Batched::Single(path).try_map(|_, p| decode(&p, sample_rate)),
        AudioInput::Buffer(raw) => Batched::Single(raw).try_map(|_, r| r.into_segment(sample_rate)),
        AudioInput::PathList(paths) => {
            if paths.is_empty() {
                return Err(AppError::type_mismatch("empty input list"));
            }
            Batched::Many(paths).try_map(|_, p| decode(&p, sample_rate))
        }
        AudioInput::BufferList(buffers) => {
            if buffers.is_empty() {
                return Err(AppError::type_mismatch("empty input list"));
            }
            Batched::Many(buffers).try_map(|_, r| r.into_segment(sample_rate))
        }
    }
}

/// Splits every input into words.
pub fn segment(input: AudioInput, params: &SegmentationParams) -> Result<Batched<WordList>, AppError> {
    segment_each(input, params, |_, _| {})
}

/// Like [`segment`], calling `observe` after each input is segmented.
pub fn segment_each(
    input: AudioInput,
    params: &SegmentationParams,
    mut observe: impl FnMut(usize, &WordList),
) -> Result<Batched<WordList>, AppError> {
    let segmenter = Segmenter::new(*params)?;
    let audio = load(input, params.sample_rate)?;
    let batch = audio.len();
    let words = audio.try_map(|i, segment| {
        let words = segmenter.word_segments(&segment)?;
        observe(i, &words);
        Ok(words)
    })?;
    info!(inputs = batch, "segmentation finished");
    Ok(words)
}

/// Builds permutations for every word list.
pub fn permute(
    words: Batched<WordList>,
    sample_rate: u32,
    params: &PermutationParams,
) -> Result<Batched<Vec<Permutation>>, AppError> {
    permute_each(words, sample_rate, params, |_, _| {})
}

/// Like [`permute`], calling `observe` after each word list is permuted.
pub fn permute_each(
    words: Batched<WordList>,
    sample_rate: u32,
    params: &PermutationParams,
    mut observe: impl FnMut(usize, &[Permutation]),
) -> Result<Batched<Vec<Permutation>>, AppError> {
    let permuter = Permuter::new(sample_rate, *params)?;
    words.try_map(|i, list| {
        let perms = permuter.permute(&list)?;
        observe(i, &perms);
        Ok(perms)
    })
}

/// Cuts every input into silence-free chunks of `segment_ms`.
pub fn chunk_each(
    input: AudioInput,
    params: &SegmentationParams,
    segment_ms: u32,
    mut observe: impl FnMut(usize, &[AudioSegment]),
) -> Result<Batched<Vec<AudioSegment>>, AppError> {
    let segmenter = Segmenter::new(*params)?;
    let audio = load(input, params.sample_rate)?;
    audio.try_map(|i, segment| {
        let chunks = segmenter.fixed_length_segments(&segment, segment_ms)?;
        observe(i, &chunks);
        Ok(chunks)
    })
}
