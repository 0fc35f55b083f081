//! Integration tests: full training runs over a tiny synthetic dataset with
//! the NdArray backend. No real image folders needed.

use burn::backend::ndarray::NdArray;
use burn::backend::Autodiff;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

use dataset::{AugmentConfig, Augmentor, ImageFolder, ImageSample};
use jscc::model::channel::{ChannelConfig, ChannelKind};
use jscc::model::communicator::CommunicatorConfig;
use jscc::training::metrics::Mean;
use jscc::training::trainer::{evaluate, load_from_checkpoint, train, TrainError, TrainingConfig};

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<NdArray<f32>>;

/// A small dataset of identical smooth-gradient images in `[0, 255]`.
fn synthetic_folder(count: usize, size: usize) -> ImageFolder {
    let mut sample = ImageSample::zeros(size, size, 3);
    for y in 0..size {
        for x in 0..size {
            for c in 0..3 {
                let v = 255.0 * (x + y + c * 4) as f32 / (2 * size + 8) as f32;
                sample.set(y, x, c, v);
            }
        }
    }
    ImageFolder::from_samples(vec![sample; count])
}

/// Deterministic setup: no augmentation randomness, no channel noise.
fn quiet_augment() -> AugmentConfig {
    AugmentConfig {
        flip: false,
        zoom: 0.0,
        rotation: 0.0,
        contrast: 0.0,
        jitter_stddev: 0.0,
    }
}

fn ideal_model_config() -> CommunicatorConfig {
    CommunicatorConfig::new(ChannelConfig::new().with_kind(ChannelKind::Ideal))
        .with_latent_channels(4)
}

#[test]
fn test_two_epochs_reduce_training_loss() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig::new()
        .with_epochs(2)
        .with_batch_size(4)
        .with_checkpoint_dir(dir.path().to_str().unwrap().to_string())
        .with_seed(7);

    let data = synthetic_folder(8, 16);
    let device = Default::default();
    let (_model, history) = train::<TestAutodiffBackend>(
        &config,
        &ideal_model_config(),
        &quiet_augment(),
        &data,
        &data,
        &device,
    )
    .unwrap();

    let entries = history.entries();
    assert_eq!(entries.len(), 2);
    assert!(
        entries[1].train_loss <= entries[0].train_loss + 1e-9,
        "training loss went up: {} -> {}",
        entries[0].train_loss,
        entries[1].train_loss
    );
}

#[test]
fn test_best_checkpoint_and_history_written() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig::new()
        .with_epochs(1)
        .with_batch_size(4)
        .with_checkpoint_dir(dir.path().to_str().unwrap().to_string())
        .with_seed(1);

    let data = synthetic_folder(4, 16);
    let device = Default::default();
    let (_model, history) = train::<TestAutodiffBackend>(
        &config,
        &ideal_model_config(),
        &quiet_augment(),
        &data,
        &data,
        &device,
    )
    .unwrap();

    // Epoch 1 always improves on the sentinel, so its checkpoint must exist.
    assert!(dir.path().join("epoch_1.mpk").exists());
    assert!(dir.path().join("best.json").exists());
    assert!(dir.path().join("history.json").exists());
    assert_eq!(history.best().unwrap().epoch, 1);
}

#[test]
fn test_resume_from_checkpoint_restores_weights() {
    let dir = TempDir::new().unwrap();
    let checkpoint_dir = dir.path().to_str().unwrap().to_string();
    let data = synthetic_folder(4, 16);
    let device = Default::default();

    let config = TrainingConfig::new()
        .with_epochs(1)
        .with_batch_size(4)
        .with_checkpoint_dir(checkpoint_dir.clone())
        .with_seed(3);
    let (trained, _) = train::<TestAutodiffBackend>(
        &config,
        &ideal_model_config(),
        &quiet_augment(),
        &data,
        &data,
        &device,
    )
    .unwrap();

    // A fresh eval-backend model loaded from the checkpoint should score the
    // same as the trained model on the same noiseless input.
    let loaded = load_from_checkpoint::<TestBackend>(
        &dir.path().join("epoch_1"),
        &ideal_model_config(),
        &device,
    )
    .unwrap();

    let augmentor = Augmentor::new(quiet_augment());
    let mut mean_trained = Mean::new();
    let mut mean_loaded = Mean::new();
    let mut rng = StdRng::seed_from_u64(0);
    evaluate(
        &burn::module::AutodiffModule::valid(&trained),
        &data,
        &augmentor,
        4,
        0,
        &mut mean_trained,
        &mut rng,
        &device,
    )
    .unwrap();
    evaluate(
        &loaded,
        &data,
        &augmentor,
        4,
        0,
        &mut mean_loaded,
        &mut rng,
        &device,
    )
    .unwrap();

    assert!(
        (mean_trained.result() - mean_loaded.result()).abs() < 1e-9,
        "loaded checkpoint scores differently: {} vs {}",
        mean_trained.result(),
        mean_loaded.result()
    );
}

#[test]
fn test_missing_resume_checkpoint_is_a_distinct_error() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig::new()
        .with_epochs(1)
        .with_batch_size(4)
        .with_checkpoint_dir(dir.path().to_str().unwrap().to_string())
        .with_resume_from(Some("/nonexistent/epoch_91".to_string()));

    let data = synthetic_folder(4, 16);
    let device = Default::default();
    let err = train::<TestAutodiffBackend>(
        &config,
        &ideal_model_config(),
        &quiet_augment(),
        &data,
        &data,
        &device,
    )
    .unwrap_err();

    let train_err = err.downcast_ref::<TrainError>().expect("TrainError kind");
    assert!(matches!(train_err, TrainError::Checkpoint { .. }));
}

#[test]
fn test_empty_dataset_is_a_distinct_error() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig::new()
        .with_epochs(1)
        .with_checkpoint_dir(dir.path().to_str().unwrap().to_string());

    let empty = ImageFolder::from_samples(vec![]);
    let data = synthetic_folder(2, 16);
    let device = Default::default();
    let err = train::<TestAutodiffBackend>(
        &config,
        &ideal_model_config(),
        &quiet_augment(),
        &empty,
        &data,
        &device,
    )
    .unwrap_err();

    let train_err = err.downcast_ref::<TrainError>().expect("TrainError kind");
    assert!(matches!(train_err, TrainError::EmptyDataset("train")));
}

#[test]
fn test_training_through_rayleigh_channel_runs() {
    let dir = TempDir::new().unwrap();
    let config = TrainingConfig::new()
        .with_epochs(1)
        .with_batch_size(2)
        .with_checkpoint_dir(dir.path().to_str().unwrap().to_string())
        .with_seed(11);

    let model_config = CommunicatorConfig::new(
        ChannelConfig::new()
            .with_kind(ChannelKind::Rayleigh)
            .with_snr_db(25.0),
    )
    .with_latent_channels(4);

    let data = synthetic_folder(4, 16);
    let device = Default::default();
    let (_model, history) = train::<TestAutodiffBackend>(
        &config,
        &model_config,
        &AugmentConfig::default(),
        &data,
        &data,
        &device,
    )
    .unwrap();

    assert_eq!(history.entries().len(), 1);
    assert!(history.entries()[0].test_loss.is_finite());
}
