//! TOML config loading for the trainer CLI.
//!
//! Deserializes `configs/train.toml`, which has `[training]`, `[channel]`,
//! `[augment]`, `[model]`, and `[data]` sections. Every key is optional:
//! built-in defaults < TOML values < CLI flags.

use std::path::Path;

use serde::Deserialize;

use dataset::AugmentConfig;
use jscc::model::channel::{ChannelConfig, ChannelKind};
use jscc::model::communicator::CommunicatorConfig;
use jscc::training::trainer::TrainingConfig;

/// Optional overrides for [`TrainingConfig`] fields.
#[derive(Debug, Default, Deserialize)]
pub struct TrainingOverrides {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub initial_lr: Option<f64>,
    pub first_decay_steps: Option<usize>,
    pub t_mul: Option<f64>,
    pub m_mul: Option<f64>,
    pub alpha: Option<f64>,
    pub checkpoint_dir: Option<String>,
    pub resume_from: Option<String>,
    pub seed: Option<u64>,
}

/// Optional overrides for the channel model.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelOverrides {
    pub kind: Option<ChannelKind>,
    pub snr_db: Option<f64>,
}

/// Optional overrides for the augmentation pipeline.
#[derive(Debug, Default, Deserialize)]
pub struct AugmentOverrides {
    pub flip: Option<bool>,
    pub zoom: Option<f32>,
    pub rotation: Option<f32>,
    pub contrast: Option<f32>,
    pub jitter_stddev: Option<f32>,
}

/// Optional overrides for the model architecture.
#[derive(Debug, Default, Deserialize)]
pub struct ModelOverrides {
    pub latent_channels: Option<usize>,
}

/// Dataset directory paths.
#[derive(Debug, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_train_dir")]
    pub train_dir: String,
    #[serde(default = "default_test_dir")]
    pub test_dir: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            train_dir: default_train_dir(),
            test_dir: default_test_dir(),
        }
    }
}

fn default_train_dir() -> String {
    "/dataset/CIFAR10/train/".to_string()
}

fn default_test_dir() -> String {
    "/dataset/CIFAR10/test/".to_string()
}

/// Top-level structure matching `configs/train.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct TrainToml {
    #[serde(default)]
    pub training: TrainingOverrides,
    #[serde(default)]
    pub channel: ChannelOverrides,
    #[serde(default)]
    pub augment: AugmentOverrides,
    #[serde(default)]
    pub model: ModelOverrides,
    #[serde(default)]
    pub data: DataSection,
}

/// Load and deserialize a `TrainToml` from a TOML file.
pub fn load_train_toml(path: &Path) -> anyhow::Result<TrainToml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
    let config: TrainToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded training config");
    Ok(config)
}

/// Apply TOML overrides on top of the built-in training defaults.
pub fn build_training_config(overrides: &TrainingOverrides) -> TrainingConfig {
    let mut config = TrainingConfig::new();
    if let Some(v) = overrides.epochs {
        config.epochs = v;
    }
    if let Some(v) = overrides.batch_size {
        config.batch_size = v;
    }
    if let Some(v) = overrides.initial_lr {
        config.initial_lr = v;
    }
    if let Some(v) = overrides.first_decay_steps {
        config.first_decay_steps = v;
    }
    if let Some(v) = overrides.t_mul {
        config.t_mul = v;
    }
    if let Some(v) = overrides.m_mul {
        config.m_mul = v;
    }
    if let Some(v) = overrides.alpha {
        config.alpha = v;
    }
    if let Some(ref v) = overrides.checkpoint_dir {
        config.checkpoint_dir = v.clone();
    }
    if let Some(ref v) = overrides.resume_from {
        config.resume_from = Some(v.clone());
    }
    if let Some(v) = overrides.seed {
        config.seed = v;
    }
    config
}

/// Apply TOML overrides on top of the channel defaults.
pub fn build_channel_config(overrides: &ChannelOverrides) -> ChannelConfig {
    let mut config = ChannelConfig::new();
    if let Some(v) = overrides.kind {
        config.kind = v;
    }
    if let Some(v) = overrides.snr_db {
        config.snr_db = v;
    }
    config
}

/// Apply TOML overrides on top of the augmentation defaults.
pub fn build_augment_config(overrides: &AugmentOverrides) -> AugmentConfig {
    let mut config = AugmentConfig::default();
    if let Some(v) = overrides.flip {
        config.flip = v;
    }
    if let Some(v) = overrides.zoom {
        config.zoom = v;
    }
    if let Some(v) = overrides.rotation {
        config.rotation = v;
    }
    if let Some(v) = overrides.contrast {
        config.contrast = v;
    }
    if let Some(v) = overrides.jitter_stddev {
        config.jitter_stddev = v;
    }
    config
}

/// Build the communicator config from a channel config and model overrides.
pub fn build_model_config(
    channel: ChannelConfig,
    overrides: &ModelOverrides,
) -> CommunicatorConfig {
    let mut config = CommunicatorConfig::new(channel);
    if let Some(v) = overrides.latent_channels {
        config.latent_channels = v;
    }
    config
}
