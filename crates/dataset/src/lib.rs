//! Image-folder dataset and augmentation pipeline for the image-communication
//! trainer.
//!
//! Provides the host-side half of the data path: decoding image directories
//! into [`ImageSample`] records and applying the stochastic augmentation
//! pipeline before samples are converted to backend tensors.

pub mod augment;
pub mod reader;
pub mod types;

pub use augment::{AugmentConfig, Augmentor};
pub use reader::{DatasetError, ImageFolder};
pub use types::ImageSample;
