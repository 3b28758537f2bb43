//! Splits recordings into words on silence and reorders them.
//!
//! ```no_run
//! use audioperm::{batch, AudioInput, PermutationParams, SegmentationParams};
//!
//! # fn main() -> Result<(), audioperm::AppError> {
//! let params = SegmentationParams::default();
//! let words = batch::segment(AudioInput::Path("take.wav".into()), &params)?;
//! let perms = batch::permute(words, params.sample_rate, &PermutationParams::default())?;
//! # let _ = perms;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod preprocessing;

pub use config::Config;
pub use domain::entities::{
    AudioInput, AudioSegment, Batched, InputItem, NoiseBoundaries, Permutation, RawAudio,
    RawSamples, WordList,
};
pub use domain::errors::AppError;
pub use infrastructure::batch;
pub use preprocessing::permutation::{PermutationParams, Permuter};
pub use preprocessing::segmenter::{SegmentationParams, Segmenter};
