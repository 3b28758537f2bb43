use crate::domain::errors::AppError;
use crate::preprocessing::permutation::PermutationParams;
use crate::preprocessing::segmenter::SegmentationParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { dir: PathBuf::from("out") }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub segmentation: SegmentationParams,
    pub permutation: PermutationParams,
    pub output: OutputConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let seg = &self.segmentation;
        if seg.sample_rate == 0 {
            return Err(AppError::invalid("sample_rate", "must be positive"));
        }
        if seg.min_silence_ms == 0 {
            return Err(AppError::invalid("min_silence_ms", "must be at least 1 ms"));
        }
        if !seg.silence_threshold_dbfs.is_finite() || seg.silence_threshold_dbfs > 0.0 {
            return Err(AppError::invalid(
                "silence_threshold_dbfs",
                format!("{} is not a finite value at or below 0 dBFS", seg.silence_threshold_dbfs),
            ));
        }
        if self.permutation.n_permutations == 0 {
            return Err(AppError::invalid("n_permutations", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.segmentation.sample_rate, 22050);
        assert_eq!(config.segmentation.silence_threshold_dbfs, -60.0);
        assert_eq!(config.segmentation.min_silence_ms, 5);
        assert_eq!(config.permutation.n_permutations, 1);
        assert_eq!(config.permutation.interm_silence_ms, 1000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [segmentation]
            sample_rate = 16000

            [permutation]
            n_permutations = 4

            [output]
            dir = "perms"
            "#,
        )
        .unwrap();
        assert_eq!(config.segmentation.sample_rate, 16000);
        assert_eq!(config.segmentation.keep_silence_ms, 100);
        assert_eq!(config.permutation.n_permutations, 4);
        assert_eq!(config.permutation.interm_silence_ms, 1000);
        assert_eq!(config.output.dir, PathBuf::from("perms"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Config::from_toml_str("[permutation]\nn_permutations = 0").unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter { name: "n_permutations", .. }));
        let err = Config::from_toml_str("[segmentation]\nsilence_threshold_dbfs = 6.0").unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter { .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(Config::from_toml_str("[segmentation"), Err(AppError::Config(_))));
    }
}
