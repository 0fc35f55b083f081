mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jscc::model::channel::ChannelKind;
use pipeline::{EvalArgs, TrainArgs};

/// jscc-train: end-to-end image communication over a simulated noisy channel.
#[derive(Parser)]
#[command(name = "jscc-train", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for training and evaluating the communicator.
#[derive(Subcommand)]
enum Command {
    /// Train the encoder/decoder end-to-end through the channel.
    Train {
        /// Path to the training config TOML file.
        #[arg(long, default_value = "configs/train.toml")]
        config: PathBuf,
        /// Override the total number of epochs.
        #[arg(long)]
        epochs: Option<usize>,
        /// Override the batch size.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override the checkpoint directory.
        #[arg(long)]
        checkpoint_dir: Option<String>,
        /// Checkpoint stem to load initial weights from (e.g. checkpoints/epoch_91).
        #[arg(long)]
        resume_from: Option<String>,
        /// Override the training image directory.
        #[arg(long)]
        train_dir: Option<String>,
        /// Override the test image directory.
        #[arg(long)]
        test_dir: Option<String>,
        /// Override the run seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Override the channel model (Ideal, AWGN, Rayleigh).
        #[arg(long)]
        channel: Option<ChannelKind>,
        /// Override the channel SNR in dB.
        #[arg(long)]
        snr_db: Option<f64>,
    },
    /// Evaluate a checkpoint over the test set at one or more SNRs.
    Eval {
        /// Path to the training config TOML file.
        #[arg(long, default_value = "configs/train.toml")]
        config: PathBuf,
        /// Checkpoint stem to load (e.g. checkpoints/epoch_42).
        #[arg(long)]
        checkpoint: PathBuf,
        /// Comma-separated list of SNRs in dB to evaluate at.
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 10.0, 25.0])]
        snrs: Vec<f64>,
        /// Override the batch size.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override the channel model (Ideal, AWGN, Rayleigh).
        #[arg(long)]
        channel: Option<ChannelKind>,
        /// Override the test image directory.
        #[arg(long)]
        test_dir: Option<String>,
        /// Seed for the channel noise during evaluation.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Train {
            config,
            epochs,
            batch_size,
            checkpoint_dir,
            resume_from,
            train_dir,
            test_dir,
            seed,
            channel,
            snr_db,
        } => pipeline::run_train(TrainArgs {
            config,
            epochs,
            batch_size,
            checkpoint_dir,
            resume_from,
            train_dir,
            test_dir,
            seed,
            channel,
            snr_db,
        }),
        Command::Eval {
            config,
            checkpoint,
            snrs,
            batch_size,
            channel,
            test_dir,
            seed,
        } => pipeline::run_eval(EvalArgs {
            config,
            checkpoint,
            snrs,
            batch_size,
            channel,
            test_dir,
            seed,
        }),
    }
}
