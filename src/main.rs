use clap::Parser;
use eqlearn_rs::equalizer::Evaluator;
use eqlearn_rs::error::EqResult;
use eqlearn_rs::settings::Settings;
use eqlearn_rs::utils::logging::init_logging;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Online self-supervised channel equalizer simulation", long_about = None)]
struct Cli {
    /// JSON settings file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the evaluation SNR (dB)
    #[arg(long)]
    snr: Option<f32>,

    /// Override the number of simulated blocks
    #[arg(long)]
    frames: Option<usize>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Disable online training on pilots
    #[arg(long)]
    offline: bool,
}

fn main() -> EqResult<()> {
    init_logging();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(snr) = cli.snr {
        settings.val_snr = snr;
    }
    if let Some(frames) = cli.frames {
        settings.val_frames = frames;
    }
    if let Some(seed) = cli.seed {
        settings.seed = seed;
    }
    if cli.offline {
        settings.is_online_training = false;
    }
    settings.validate()?;

    tracing::info!(
        "channel: {:?}, memory {} ({} states), augmentation: {}",
        settings.channel_type,
        settings.memory_length,
        settings.n_states(),
        settings.aug_type.name(),
    );

    let mut evaluator = Evaluator::new(&settings)?;
    let bar = ProgressBar::new(evaluator.num_blocks() as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} blocks ({eta})").unwrap(),
    );

    let report = evaluator.evaluate_with(|_| bar.inc(1))?;
    bar.finish_and_clear();

    tracing::info!(
        "done: mean SER {:.6} over {} blocks",
        report.mean_ser,
        report.ser_per_block.len()
    );
    Ok(())
}
