//! Reads image folders into [`ImageSample`]s.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::types::ImageSample;

/// Errors raised while loading a dataset directory.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The dataset directory does not exist or is not a directory.
    #[error("dataset directory not found: {0}")]
    MissingDir(PathBuf),

    /// The directory exists but contains no decodable images.
    #[error("no decodable images under {0}")]
    Empty(PathBuf),

    /// A file with an image extension failed to decode.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// IO error while scanning the directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An in-memory image dataset loaded from a directory.
///
/// Files are decoded to RGB and kept as `[0, 255]` float samples. Iteration
/// order is the sorted file-name order, so the test pass is stable across
/// runs; training shuffles indices per epoch on top of this.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    samples: Vec<ImageSample>,
}

impl ImageFolder {
    /// Load every decodable PNG/JPEG under `dir` (non-recursive).
    pub fn load(dir: &Path) -> Result<Self, DatasetError> {
        if !dir.is_dir() {
            return Err(DatasetError::MissingDir(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| has_image_extension(p))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(DatasetError::Empty(dir.to_path_buf()));
        }

        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) Decoding images")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut samples = Vec::with_capacity(paths.len());
        for path in &paths {
            let decoded = image::open(path).map_err(|source| DatasetError::Decode {
                path: path.clone(),
                source,
            })?;
            let rgb = decoded.to_rgb8();
            let (width, height) = rgb.dimensions();
            let data = rgb.into_raw().into_iter().map(f32::from).collect();
            samples.push(ImageSample::new(data, height as usize, width as usize, 3));
            pb.inc(1);
        }
        pb.finish_and_clear();

        tracing::info!(
            count = samples.len(),
            dir = %dir.display(),
            "Loaded image folder"
        );

        Ok(Self { samples })
    }

    /// Build a dataset from already-decoded samples (synthetic data, tests).
    pub fn from_samples(samples: Vec<ImageSample>) -> Self {
        Self { samples }
    }

    /// Number of images in the dataset.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset holds no images.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples, in stable sorted-file-name order.
    pub fn samples(&self) -> &[ImageSample] {
        &self.samples
    }

    /// The sample at `index`.
    pub fn get(&self, index: usize) -> &ImageSample {
        &self.samples[index]
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            matches!(e.as_str(), "png" | "jpg" | "jpeg")
        })
        .unwrap_or(false)
}
