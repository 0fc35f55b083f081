//! Training loop for the image communicator.
//!
//! Drives epochs of train steps (gradient updates) and test steps
//! (evaluation only), reports extrapolated epoch timing, and persists the
//! model whenever the test loss improves on the best seen so far.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use dataset::{AugmentConfig, Augmentor, ImageFolder};

use crate::model::bridge::images_to_tensor;
use crate::model::communicator::{Communicator, CommunicatorConfig};
use crate::training::metrics::{EpochSummary, Mean, MetricsHistory};
use crate::training::schedule::CosineDecayRestarts;

/// Sentinel the lowest-loss tracker starts from; any real epoch beats it.
pub const LOWEST_LOSS_SENTINEL: f64 = 100.0;

/// Distinct failure kinds of a training run.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// A checkpoint could not be read at startup.
    #[error("checkpoint unreadable at {path}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },

    /// A loss came back NaN or infinite; continuing would corrupt the
    /// best-checkpoint selection.
    #[error("non-finite {phase} loss at epoch {epoch}, step {step}")]
    NonFiniteLoss {
        phase: &'static str,
        epoch: usize,
        step: usize,
    },

    /// A dataset has no images to iterate.
    #[error("the {0} dataset is empty")]
    EmptyDataset(&'static str),
}

/// Configuration for a training run.
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Total number of epochs.
    #[config(default = 100)]
    pub epochs: usize,
    /// Images per batch.
    #[config(default = 64)]
    pub batch_size: usize,
    /// Peak learning rate of the cosine-restart schedule.
    #[config(default = 1e-3)]
    pub initial_lr: f64,
    /// Steps in the first decay period.
    #[config(default = 5000)]
    pub first_decay_steps: usize,
    /// Period stretch factor per restart.
    #[config(default = 1.0)]
    pub t_mul: f64,
    /// Peak scale factor per restart.
    #[config(default = 1.0)]
    pub m_mul: f64,
    /// Floor of the schedule as a fraction of `initial_lr`.
    #[config(default = 0.1)]
    pub alpha: f64,
    /// Directory checkpoints and the run history are written to.
    #[config(default = "String::from(\"checkpoints\")")]
    pub checkpoint_dir: String,
    /// Optional checkpoint (file stem) to load model weights from at start.
    pub resume_from: Option<String>,
    /// Seed for shuffling, augmentation, and channel noise.
    #[config(default = 42)]
    pub seed: u64,
}

/// Mutable state threaded through the training loop.
///
/// Holding it in one struct (rather than loose globals) keeps
/// checkpoint/resume and testing straightforward.
#[derive(Debug)]
pub struct TrainerState {
    /// 1-based index of the epoch in progress.
    pub epoch: usize,
    /// Optimizer steps taken across all epochs; drives the LR schedule.
    pub global_step: usize,
    /// Lowest epoch test loss seen so far. Starts at
    /// [`LOWEST_LOSS_SENTINEL`] and only ever decreases.
    pub lowest_loss: f64,
    /// Running mean of training loss for the current epoch.
    pub train_loss: Mean,
    /// Running mean of test loss for the current epoch.
    pub test_loss: Mean,
}

impl TrainerState {
    /// Fresh state for a new run.
    pub fn new() -> Self {
        Self {
            epoch: 0,
            global_step: 0,
            lowest_loss: LOWEST_LOSS_SENTINEL,
            train_loss: Mean::new(),
            test_loss: Mean::new(),
        }
    }

    /// Enter an epoch: both accumulators start empty.
    pub fn begin_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.train_loss.reset();
        self.test_loss.reset();
    }

    /// Apply the best-checkpoint policy to this epoch's test loss.
    ///
    /// Returns true (and lowers the tracker) only on strict improvement.
    pub fn record_improvement(&mut self, test_loss: f64) -> bool {
        if test_loss < self.lowest_loss {
            self.lowest_loss = test_loss;
            true
        } else {
            false
        }
    }
}

impl Default for TrainerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata written next to the best checkpoint.
#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct CheckpointMeta {
    pub epoch: usize,
    pub global_step: usize,
    pub test_loss: f64,
}

/// Run the training loop.
///
/// Each epoch: one full pass over `train_data` with augmentation and
/// gradient updates, then one full pass over `test_data` without gradients,
/// then the best-checkpoint decision. Any non-finite loss aborts the run.
///
/// Returns the final model and the per-epoch history (also written to
/// `{checkpoint_dir}/history.json`).
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    model_config: &CommunicatorConfig,
    augment: &AugmentConfig,
    train_data: &ImageFolder,
    test_data: &ImageFolder,
    device: &B::Device,
) -> anyhow::Result<(Communicator<B>, MetricsHistory)> {
    if train_data.is_empty() {
        return Err(TrainError::EmptyDataset("train").into());
    }
    if test_data.is_empty() {
        return Err(TrainError::EmptyDataset("test").into());
    }

    let checkpoint_dir = Path::new(&config.checkpoint_dir);
    std::fs::create_dir_all(checkpoint_dir)?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let mut model = model_config.init::<B>(device);
    if let Some(ref resume) = config.resume_from {
        let path = Path::new(resume);
        model = model
            .load_file(path, &recorder, device)
            .map_err(|e| TrainError::Checkpoint {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        tracing::info!(path = %path.display(), "Restored model weights");
    }

    let mut optimizer = AdamConfig::new().init();
    let schedule = CosineDecayRestarts::new(
        config.initial_lr,
        config.first_decay_steps,
        config.t_mul,
        config.m_mul,
        config.alpha,
    );
    let augmentor = Augmentor::new(augment.clone());
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut state = TrainerState::new();
    let mut history = MetricsHistory::new();

    tracing::info!(
        channel = %model.channel().kind(),
        snr_db = model.channel().snr_db(),
        epochs = config.epochs,
        batch_size = config.batch_size,
        train_images = train_data.len(),
        test_images = test_data.len(),
        "Starting training: {schedule}"
    );

    let mut train_order: Vec<usize> = (0..train_data.len()).collect();

    for epoch in 1..=config.epochs {
        state.begin_epoch(epoch);
        let epoch_start = Instant::now();

        // Training pass.
        train_order.shuffle(&mut rng);
        let num_batches = train_order.len().div_ceil(config.batch_size);
        let report_idx = (num_batches / 100).max(1);
        let phase_start = Instant::now();

        for (i, chunk) in train_order.chunks(config.batch_size).enumerate() {
            let lr = schedule.lr_at(state.global_step);

            let batch: Vec<_> = chunk
                .iter()
                .map(|&idx| augmentor.apply(train_data.get(idx), true, &mut rng))
                .collect();
            let images = images_to_tensor::<B>(&batch, device);

            let reconstruction = model.forward(images.clone(), &mut rng);
            let loss = MseLoss::new().forward(reconstruction, images, Reduction::Mean);
            let loss_val: f64 = loss.clone().into_scalar().elem();
            if !loss_val.is_finite() {
                return Err(TrainError::NonFiniteLoss {
                    phase: "train",
                    epoch,
                    step: state.global_step,
                }
                .into());
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(lr.into(), model, grads);

            state.train_loss.update(loss_val);
            state.global_step += 1;

            if i + 1 == report_idx {
                let elapsed = phase_start.elapsed().as_secs_f64();
                tracing::info!(
                    "Estimated train epoch time: {:.2} minutes",
                    num_batches as f64 * elapsed / report_idx as f64 / 60.0
                );
            }
        }
        let train_wall = epoch_start.elapsed();

        // Test pass, no gradients.
        evaluate(
            &model.valid(),
            test_data,
            &augmentor,
            config.batch_size,
            epoch,
            &mut state.test_loss,
            &mut rng,
            device,
        )?;

        // Best-checkpoint decision.
        let test_result = state.test_loss.result();
        if state.record_improvement(test_result) {
            let path = checkpoint_dir.join(format!("epoch_{epoch}"));
            model
                .clone()
                .save_file(&path, &recorder)
                .map_err(|e| anyhow::anyhow!("Failed to save checkpoint at epoch {epoch}: {e}"))?;
            serde_json::to_writer_pretty(
                std::fs::File::create(checkpoint_dir.join("best.json"))?,
                &CheckpointMeta {
                    epoch,
                    global_step: state.global_step,
                    test_loss: test_result,
                },
            )?;
            tracing::info!(
                epoch,
                test_loss = format!("{test_result:.6}"),
                path = %path.display(),
                "New best checkpoint"
            );
        }

        let lr_now = schedule.lr_at(state.global_step);
        tracing::info!(
            "Epoch {epoch}, Loss: {:.6}, Test Loss: {:.6}, Training time: {:.2}m, Learning rate: {:.2e}",
            state.train_loss.result(),
            test_result,
            train_wall.as_secs_f64() / 60.0,
            lr_now
        );

        history.push(EpochSummary {
            epoch,
            train_loss: state.train_loss.result(),
            test_loss: test_result,
            lr: lr_now,
            wall_secs: epoch_start.elapsed().as_secs_f64(),
        });
    }

    history.save_json(&checkpoint_dir.join("history.json"))?;
    tracing::info!(
        epochs = config.epochs,
        lowest_loss = format!("{:.6}", state.lowest_loss),
        "Training complete"
    );

    Ok((model, history))
}

/// Evaluate the model over a dataset, updating `test_loss` one batch at a
/// time.
///
/// Inputs are normalized but never augmented; batches are visited in the
/// dataset's stable order. Used for the per-epoch test pass and by the eval
/// pipeline (with `epoch` 0).
#[allow(clippy::too_many_arguments)]
pub fn evaluate<B: Backend, R: Rng>(
    model: &Communicator<B>,
    data: &ImageFolder,
    augmentor: &Augmentor,
    batch_size: usize,
    epoch: usize,
    test_loss: &mut Mean,
    rng: &mut R,
    device: &B::Device,
) -> Result<(), TrainError> {
    if data.is_empty() {
        return Err(TrainError::EmptyDataset("test"));
    }

    let num_batches = data.len().div_ceil(batch_size);
    let report_idx = (num_batches / 100).max(1);
    let phase_start = Instant::now();
    let indices: Vec<usize> = (0..data.len()).collect();

    for (i, chunk) in indices.chunks(batch_size).enumerate() {
        let batch: Vec<_> = chunk
            .iter()
            .map(|&idx| augmentor.apply(data.get(idx), false, rng))
            .collect();
        let images = images_to_tensor::<B>(&batch, device);

        let reconstruction = model.forward(images.clone(), rng);
        let loss = MseLoss::new().forward(reconstruction, images, Reduction::Mean);
        let loss_val: f64 = loss.into_scalar().elem();
        if !loss_val.is_finite() {
            return Err(TrainError::NonFiniteLoss {
                phase: "test",
                epoch,
                step: i,
            });
        }
        test_loss.update(loss_val);

        if i + 1 == report_idx {
            let elapsed = phase_start.elapsed().as_secs_f64();
            tracing::info!(
                "Estimated test epoch time: {:.2} minutes",
                num_batches as f64 * elapsed / report_idx as f64 / 60.0
            );
        }
    }

    Ok(())
}

/// Load a communicator from a checkpoint file.
///
/// Creates a fresh model from config, then loads saved weights on top.
pub fn load_from_checkpoint<B: Backend>(
    path: &Path,
    config: &CommunicatorConfig,
    device: &B::Device,
) -> anyhow::Result<Communicator<B>> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let model = config
        .init::<B>(device)
        .load_file(path, &recorder, device)
        .map_err(|e| TrainError::Checkpoint {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_policy_improving_only() {
        let mut state = TrainerState::new();
        assert_eq!(state.lowest_loss, LOWEST_LOSS_SENTINEL);

        let decisions: Vec<bool> = [0.5, 0.3, 0.4, 0.2]
            .into_iter()
            .map(|loss| state.record_improvement(loss))
            .collect();
        assert_eq!(decisions, vec![true, true, false, true]);
        assert_eq!(state.lowest_loss, 0.2);
    }

    #[test]
    fn test_equal_loss_is_not_an_improvement() {
        let mut state = TrainerState::new();
        assert!(state.record_improvement(0.3));
        assert!(!state.record_improvement(0.3));
        assert_eq!(state.lowest_loss, 0.3);
    }

    #[test]
    fn test_begin_epoch_resets_both_accumulators() {
        let mut state = TrainerState::new();
        state.train_loss.update(1.0);
        state.test_loss.update(2.0);
        state.lowest_loss = 0.5;

        state.begin_epoch(3);
        assert_eq!(state.epoch, 3);
        assert_eq!(state.train_loss.count(), 0);
        assert_eq!(state.test_loss.count(), 0);
        // The lowest-loss tracker survives epoch boundaries.
        assert_eq!(state.lowest_loss, 0.5);
    }

    #[test]
    fn test_config_defaults() {
        let config = TrainingConfig::new();
        assert_eq!(config.epochs, 100);
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.initial_lr, 1e-3);
        assert_eq!(config.first_decay_steps, 5000);
        assert_eq!(config.alpha, 0.1);
        assert!(config.resume_from.is_none());
    }
}
