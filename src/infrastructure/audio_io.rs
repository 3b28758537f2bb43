use crate::domain::entities::AudioSegment;
use crate::domain::errors::AppError;
use dasp_rs::signal_processing::resampling::resample;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads a WAV file as float samples of its first channel.
fn read_first_channel(path: &Path) -> Result<(Vec<f32>, u32), AppError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(AppError::type_mismatch(format!("{} declares zero channels", path.display())));
    }

    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .step_by(channels)
            .collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AppError::type_mismatch(format!(
                    "{}: unsupported {}-bit integer samples",
                    path.display(),
                    spec.bits_per_sample
                )));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .step_by(channels)
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    debug!(
        path = %path.display(),
        channels,
        bits = spec.bits_per_sample,
        sample_rate = spec.sample_rate,
        "read wav"
    );
    Ok((samples, spec.sample_rate))
}

/// Loads `path` as mono 16-bit PCM at `target_sample_rate`, resampling when
/// the file was recorded at a different rate.
pub fn decode(path: &Path, target_sample_rate: u32) -> Result<AudioSegment, AppError> {
    let (samples, original_rate) = read_first_channel(path)?;
    let resampled = if original_rate != target_sample_rate && !samples.is_empty() {
        resample(&samples, original_rate, target_sample_rate)?
    } else {
        samples
    };
    Ok(AudioSegment::from_float(&resampled, target_sample_rate))
}

/// Writes `segment` as mono 16-bit PCM.
pub fn write_wav(segment: &AudioSegment, path: &Path) -> Result<(), AppError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: segment.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &segment.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Word,
    Permutation,
    Chunk,
}

impl ExportKind {
    fn as_str(self) -> &'static str {
        match self {
            ExportKind::Word => "word",
            ExportKind::Permutation => "perm",
            ExportKind::Chunk => "chunk",
        }
    }
}

/// One written file, as recorded in the manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub source: usize,
    pub kind: ExportKind,
    pub index: usize,
    pub path: PathBuf,
    pub samples: usize,
    pub duration_ms: f64,
}

pub struct Exporter {
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Exporter { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn setup_output_dir(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Writes each segment as `{stem}_{kind}_{i:03}.wav`.
    pub fn export(
        &self,
        segments: &[AudioSegment],
        source: usize,
        stem: &str,
        kind: ExportKind,
    ) -> Result<Vec<ExportedFile>, AppError> {
        let mut written = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let path = self.output_dir.join(format!("{}_{}_{:03}.wav", stem, kind.as_str(), i));
            write_wav(segment, &path)?;
            written.push(ExportedFile {
                source,
                kind,
                index: i,
                path,
                samples: segment.len(),
                duration_ms: segment.duration_ms(),
            });
        }
        info!(stem, count = written.len(), kind = kind.as_str(), "exported segments");
        Ok(written)
    }

    pub fn write_manifest(&self, files: &[ExportedFile]) -> Result<PathBuf, AppError> {
        let path = self.output_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(files)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pcm16_survives_a_write_and_decode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let segment = AudioSegment::new(vec![0, 1200, -1200, 32767, -32768, 7], 8000);
        write_wav(&segment, &path).unwrap();
        let decoded = decode(&path, 8000).unwrap();
        assert_eq!(decoded, segment);
    }

    #[test]
    fn stereo_file_keeps_first_channel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for (left, right) in [(100i16, -9), (200, -9), (300, -9)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode(&path, 8000).unwrap();
        assert_eq!(decoded.samples, vec![100, 200, 300]);
    }

    #[test]
    fn float_file_is_scaled_and_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for s in [0.5f32, -0.25, 0.00004] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode(&path, 8000).unwrap();
        assert_eq!(decoded.samples, vec![16384, -8192, 1]);
    }

    #[test]
    fn missing_file_is_a_wav_error() {
        let err = decode(Path::new("/nonexistent/clip.wav"), 8000).unwrap_err();
        assert!(matches!(err, AppError::Wav(_)));
    }

    #[test]
    fn exporter_names_files_and_writes_manifest() {
        let dir = tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("out"));
        exporter.setup_output_dir().unwrap();
        let words = vec![
            AudioSegment::new(vec![1; 80], 8000),
            AudioSegment::new(vec![2; 160], 8000),
        ];
        let files = exporter.export(&words, 0, "take", ExportKind::Word).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[1].path.ends_with("take_word_001.wav"));
        assert!((files[1].duration_ms - 20.0).abs() < 1e-9);

        let manifest = exporter.write_manifest(&files).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
        assert_eq!(json[0]["kind"], "word");
        assert_eq!(json[1]["samples"], 160);
    }
}
