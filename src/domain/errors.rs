use std::fmt;

use thiserror::Error;

/// Which half of the amplitude distribution an estimate was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarity::Positive => f.write_str("strictly positive"),
            Polarity::Negative => f.write_str("strictly negative"),
        }
    }
}

/// Renders an optional batch index as ` (input #n)`.
struct At<'a>(&'a Option<usize>);

impl fmt::Display for At<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            Some(index) => write!(f, " (input #{index})"),
            None => Ok(()),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Audio processing error: {0}")]
    Audio(#[from] dasp_rs::AudioError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Type mismatch{}: {reason}", At(.index))]
    TypeMismatch {
        index: Option<usize>,
        reason: String,
    },
    #[error("Insufficient signal{}: no {polarity} samples to estimate a noise floor", At(.index))]
    InsufficientSignal {
        index: Option<usize>,
        polarity: Polarity,
    },
    #[error("Malformed batch (input #{index}): expected {expected}, found {found}")]
    MalformedBatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
    #[error("Input #{index}: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        AppError::TypeMismatch {
            index: None,
            reason: reason.into(),
        }
    }

    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        AppError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Tags a per-buffer error with its position in a batch.
    pub fn at_index(self, at: usize) -> Self {
        match self {
            AppError::TypeMismatch { reason, .. } => AppError::TypeMismatch {
                index: Some(at),
                reason,
            },
            AppError::InsufficientSignal { polarity, .. } => AppError::InsufficientSignal {
                index: Some(at),
                polarity,
            },
            already @ AppError::InBatch { .. } => already,
            other => AppError::InBatch {
                index: at,
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_index_is_reported() {
        let err = AppError::InsufficientSignal {
            index: None,
            polarity: Polarity::Negative,
        }
        .at_index(3);
        assert_eq!(
            err.to_string(),
            "Insufficient signal (input #3): no strictly negative samples to estimate a noise floor"
        );
    }

    #[test]
    fn other_errors_are_wrapped_with_their_index() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AppError::Io(io).at_index(1);
        assert!(matches!(err, AppError::InBatch { index: 1, ref source } if matches!(**source, AppError::Io(_))));
        assert_eq!(err.to_string(), "Input #1: I/O error: gone");
    }

    #[test]
    fn single_input_has_no_index() {
        let err = AppError::type_mismatch("empty input list");
        assert_eq!(err.to_string(), "Type mismatch: empty input list");
    }
}
