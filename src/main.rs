use anyhow::{Context, Result};
use audioperm::batch;
use audioperm::infrastructure::audio_io::{ExportKind, ExportedFile, Exporter};
use audioperm::{AudioInput, AudioSegment, Config};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "audioperm")]
#[command(about = "Split recordings into words on silence and write reordered versions")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    /// Sample rate audio is resampled to before segmentation
    #[arg(long, global = true)]
    sample_rate: Option<u32>,

    /// Silence threshold in dBFS
    #[arg(long, global = true, allow_hyphen_values = true)]
    silence_thresh: Option<f64>,

    /// Minimum silence length in milliseconds
    #[arg(long, global = true)]
    min_silence: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write every detected word as its own file
    Segment {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Write reorderings of the detected words
    Permute {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum permutations per input
        #[arg(short = 'n', long)]
        n_permutations: Option<usize>,

        /// Silence between words in milliseconds
        #[arg(long)]
        interm_silence: Option<u32>,
    },
    /// Remove silence and cut the rest into equal-length chunks
    Chunk {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Chunk length in milliseconds
        #[arg(long, default_value = "5000")]
        segment_ms: u32,
    },
}

fn progress_bar(len: usize, message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

fn input_for(files: &[PathBuf]) -> AudioInput {
    match files {
        [single] => AudioInput::Path(single.clone()),
        _ => AudioInput::PathList(files.to_vec()),
    }
}

fn stem_for(index: usize, path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("input");
    format!("{:02}_{}", index, stem)
}

fn export_all(
    exporter: &Exporter,
    files: &[PathBuf],
    outputs: Vec<Vec<AudioSegment>>,
    kind: ExportKind,
) -> Result<Vec<ExportedFile>> {
    let mut written = Vec::new();
    for (i, (path, segments)) in files.iter().zip(outputs).enumerate() {
        written.extend(exporter.export(&segments, i, &stem_for(i, path), kind)?);
    }
    Ok(written)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.out {
        config.output.dir = dir.clone();
    }
    if let Some(sample_rate) = cli.sample_rate {
        config.segmentation.sample_rate = sample_rate;
    }
    if let Some(thresh) = cli.silence_thresh {
        config.segmentation.silence_threshold_dbfs = thresh;
    }
    if let Some(min_silence) = cli.min_silence {
        config.segmentation.min_silence_ms = min_silence;
    }
    if let Commands::Permute { n_permutations, interm_silence, .. } = &cli.command {
        if let Some(n) = n_permutations {
            config.permutation.n_permutations = *n;
        }
        if let Some(ms) = interm_silence {
            config.permutation.interm_silence_ms = *ms;
        }
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let exporter = Exporter::new(&config.output.dir);
    exporter.setup_output_dir()?;
    let seg = &config.segmentation;

    let written = match &cli.command {
        Commands::Segment { files } => {
            let pb = progress_bar(files.len(), "Segmenting audio files")?;
            let words = batch::segment_each(input_for(files), seg, |_, _| pb.inc(1))?;
            pb.finish_with_message("Segmentation completed!");
            export_all(&exporter, files, words.into_vec(), ExportKind::Word)?
        }
        Commands::Permute { files, .. } => {
            let pb = progress_bar(files.len(), "Segmenting audio files")?;
            let words = batch::segment_each(input_for(files), seg, |_, _| pb.inc(1))?;
            pb.finish_with_message("Segmentation completed!");

            let pb = progress_bar(files.len(), "Permuting words")?;
            let perms = batch::permute_each(words, seg.sample_rate, &config.permutation, |_, _| pb.inc(1))?;
            pb.finish_with_message("Permutation completed!");
            export_all(&exporter, files, perms.into_vec(), ExportKind::Permutation)?
        }
        Commands::Chunk { files, segment_ms } => {
            let pb = progress_bar(files.len(), "Chunking audio files")?;
            let chunks = batch::chunk_each(input_for(files), seg, *segment_ms, |_, _| pb.inc(1))?;
            pb.finish_with_message("Chunking completed!");
            export_all(&exporter, files, chunks.into_vec(), ExportKind::Chunk)?
        }
    };

    let manifest = exporter.write_manifest(&written)?;
    info!(files = written.len(), manifest = %manifest.display(), "done");
    Ok(())
}
