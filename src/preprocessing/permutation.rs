//! Reorderings of a word list.
//!
//! Orderings are enumerated lexicographically starting from the identity,
//! so for three words the sequence is `012, 021, 102, 120, 201, 210`.
//! Buffers are only built for the orderings actually requested.

use crate::domain::entities::{AudioSegment, Permutation};
use crate::domain::errors::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_N_PERMUTATIONS: usize = 1;
pub const DEFAULT_INTERM_SILENCE_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermutationParams {
    pub n_permutations: usize,
    pub interm_silence_ms: u32,
}

impl Default for PermutationParams {
    fn default() -> Self {
        PermutationParams {
            n_permutations: DEFAULT_N_PERMUTATIONS,
            interm_silence_ms: DEFAULT_INTERM_SILENCE_MS,
        }
    }
}

/// Number of zero samples in a pad of `interm_silence_ms`, rounded to the
/// nearest sample.
pub fn pad_length(sample_rate: u32, interm_silence_ms: u32) -> usize {
    ((u64::from(sample_rate) * u64::from(interm_silence_ms) + 500) / 1000) as usize
}

/// `k!`, or `None` once it no longer fits in a `usize`.
pub fn distinct_orderings(k: usize) -> Option<usize> {
    (1..=k).try_fold(1usize, |acc, n| acc.checked_mul(n))
}

/// Advances `order` to the next lexicographic permutation in place.
/// Returns `false` and leaves `order` untouched when it is already the last.
fn next_ordering(order: &mut [usize]) -> bool {
    let Some(pivot) = order.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = order.iter().rposition(|&v| v > order[pivot]) else {
        return false;
    };
    order.swap(pivot, successor);
    order[pivot + 1..].reverse();
    true
}

pub struct Permuter {
    sample_rate: u32,
    params: PermutationParams,
}

impl Permuter {
    pub fn new(sample_rate: u32, params: PermutationParams) -> Result<Self, AppError> {
        if sample_rate == 0 {
            return Err(AppError::invalid("sample_rate", "must be positive"));
        }
        if params.n_permutations == 0 {
            return Err(AppError::invalid("n_permutations", "must be at least 1"));
        }
        Ok(Permuter { sample_rate, params })
    }

    pub fn params(&self) -> &PermutationParams {
        &self.params
    }

    /// Lazily yields up to `n_permutations` reorderings of `words`.
    pub fn permutations<'a>(&self, words: &'a [AudioSegment]) -> Result<Permutations<'a>, AppError> {
        if let Some(word) = words.iter().find(|w| w.sample_rate != self.sample_rate) {
            return Err(AppError::invalid(
                "sample_rate",
                format!("word at {} Hz cannot be joined at {} Hz", word.sample_rate, self.sample_rate),
            ));
        }
        let available = distinct_orderings(words.len());
        if available.is_some_and(|n| n < self.params.n_permutations) {
            warn!(
                words = words.len(),
                requested = self.params.n_permutations,
                available = available.unwrap_or(usize::MAX),
                "fewer orderings than requested"
            );
        }
        Ok(Permutations {
            words,
            order: (0..words.len()).collect(),
            pad: pad_length(self.sample_rate, self.params.interm_silence_ms),
            sample_rate: self.sample_rate,
            remaining: self.params.n_permutations,
            exhausted: false,
        })
    }

    pub fn permute(&self, words: &[AudioSegment]) -> Result<Vec<Permutation>, AppError> {
        let perms: Vec<Permutation> = self.permutations(words)?.collect();
        debug!(words = words.len(), permutations = perms.len(), "built permutations");
        Ok(perms)
    }
}

pub struct Permutations<'a> {
    words: &'a [AudioSegment],
    order: Vec<usize>,
    pad: usize,
    sample_rate: u32,
    remaining: usize,
    exhausted: bool,
}

impl Permutations<'_> {
    fn render(&self) -> Permutation {
        let voiced: usize = self.words.iter().map(AudioSegment::len).sum();
        let gaps = self.words.len().saturating_sub(1);
        let mut samples = Vec::with_capacity(voiced + gaps * self.pad);
        for (position, &index) in self.order.iter().enumerate() {
            if position > 0 {
                samples.resize(samples.len() + self.pad, 0);
            }
            samples.extend_from_slice(&self.words[index].samples);
        }
        AudioSegment::new(samples, self.sample_rate)
    }
}

impl Iterator for Permutations<'_> {
    type Item = Permutation;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted || self.remaining == 0 {
            return None;
        }
        let permutation = self.render();
        self.remaining -= 1;
        self.exhausted = !next_ordering(&mut self.order);
        Some(permutation)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        (1.min(self.remaining), Some(self.remaining))
    }
}
