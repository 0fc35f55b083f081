//! Subcommand implementations for the trainer CLI.

use std::path::{Path, PathBuf};

use burn::backend::ndarray::NdArray;
use burn::backend::Autodiff;
use rand::rngs::StdRng;
use rand::SeedableRng;

use dataset::{Augmentor, ImageFolder};
use jscc::model::channel::{ChannelConfig, ChannelKind};
use jscc::training::metrics::{psnr_db, Mean};
use jscc::training::trainer::{evaluate, load_from_checkpoint, train};

use crate::config::{
    build_augment_config, build_channel_config, build_model_config, build_training_config,
    load_train_toml,
};

type EvalBackend = NdArray<f32>;
type TrainBackend = Autodiff<EvalBackend>;

/// Arguments for the `train` subcommand.
pub struct TrainArgs {
    pub config: PathBuf,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub checkpoint_dir: Option<String>,
    pub resume_from: Option<String>,
    pub train_dir: Option<String>,
    pub test_dir: Option<String>,
    pub seed: Option<u64>,
    pub channel: Option<ChannelKind>,
    pub snr_db: Option<f64>,
}

/// Train the communicator end-to-end.
pub fn run_train(args: TrainArgs) -> anyhow::Result<()> {
    let config_toml = load_train_toml(&args.config)?;

    // Priority chain: built-in defaults < TOML values < CLI flags.
    let mut training = build_training_config(&config_toml.training);
    if let Some(v) = args.epochs {
        training.epochs = v;
    }
    if let Some(v) = args.batch_size {
        training.batch_size = v;
    }
    if let Some(v) = args.checkpoint_dir {
        training.checkpoint_dir = v;
    }
    if let Some(v) = args.resume_from {
        training.resume_from = Some(v);
    }
    if let Some(v) = args.seed {
        training.seed = v;
    }

    let mut channel = build_channel_config(&config_toml.channel);
    if let Some(v) = args.channel {
        channel.kind = v;
    }
    if let Some(v) = args.snr_db {
        channel.snr_db = v;
    }

    let augment = build_augment_config(&config_toml.augment);
    let model_config = build_model_config(channel, &config_toml.model);

    let train_dir = args.train_dir.unwrap_or(config_toml.data.train_dir);
    let test_dir = args.test_dir.unwrap_or(config_toml.data.test_dir);
    let train_data = ImageFolder::load(Path::new(&train_dir))?;
    let test_data = ImageFolder::load(Path::new(&test_dir))?;

    let device = Default::default();
    let (_model, history) = train::<TrainBackend>(
        &training,
        &model_config,
        &augment,
        &train_data,
        &test_data,
        &device,
    )?;

    if let Some(best) = history.best() {
        tracing::info!(
            "Best epoch {}: test loss {:.6} (PSNR {:.2} dB)",
            best.epoch,
            best.test_loss,
            psnr_db(best.test_loss)
        );
    }
    Ok(())
}

/// Arguments for the `eval` subcommand.
pub struct EvalArgs {
    pub config: PathBuf,
    pub checkpoint: PathBuf,
    pub snrs: Vec<f64>,
    pub batch_size: Option<usize>,
    pub channel: Option<ChannelKind>,
    pub test_dir: Option<String>,
    pub seed: u64,
}

/// Evaluate a checkpoint over the test set at one or more SNRs.
pub fn run_eval(args: EvalArgs) -> anyhow::Result<()> {
    let config_toml = load_train_toml(&args.config)?;

    let base_channel = build_channel_config(&config_toml.channel);
    let kind = args.channel.unwrap_or(base_channel.kind);
    let batch_size = args
        .batch_size
        .or(config_toml.training.batch_size)
        .unwrap_or(64);

    let test_dir = args.test_dir.unwrap_or(config_toml.data.test_dir);
    let test_data = ImageFolder::load(Path::new(&test_dir))?;
    let augmentor = Augmentor::new(build_augment_config(&config_toml.augment));
    let device = Default::default();

    for &snr_db in &args.snrs {
        let model_config = build_model_config(
            ChannelConfig::new().with_kind(kind).with_snr_db(snr_db),
            &config_toml.model,
        );
        let model = load_from_checkpoint::<EvalBackend>(&args.checkpoint, &model_config, &device)?;

        let mut loss = Mean::new();
        let mut rng = StdRng::seed_from_u64(args.seed);
        evaluate(
            &model,
            &test_data,
            &augmentor,
            batch_size,
            0,
            &mut loss,
            &mut rng,
            &device,
        )?;

        let mse = loss.result();
        tracing::info!(
            "SNR {snr_db} dB over {kind}: MSE {:.6}, PSNR {:.2} dB",
            mse,
            psnr_db(mse)
        );
    }
    Ok(())
}
