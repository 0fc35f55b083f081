//! Stochastic augmentation pipeline for training inputs.
//!
//! Mirrors the preprocessing applied ahead of the communicator model:
//! rescale to `[0, 1]`, then (training only) random flips, a combined
//! zoom/rotation resample, random contrast, and a per-channel Gaussian
//! shift that simulates color-channel drift, clipped back to `[0, 1]`.
//! Evaluation inputs are only rescaled.
//!
//! All transforms run on host pixel buffers before tensor conversion, so a
//! single seeded rng makes the whole data path reproducible. Output shape
//! always equals input shape.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::types::ImageSample;

/// Configuration for the augmentation pipeline.
///
/// Ranges follow the conventions of the preprocessing layers they replace:
/// `zoom` and `contrast` are multiplicative factors drawn from
/// `1 ± range`, `rotation` is a fraction of a full turn drawn from
/// `± range`, and `jitter_stddev` is the standard deviation of the additive
/// per-channel shift.
#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Enable random horizontal and vertical flips.
    pub flip: bool,
    /// Zoom range: scale factor drawn from `[1 - zoom, 1 + zoom]`.
    pub zoom: f32,
    /// Rotation range as a fraction of a full turn.
    pub rotation: f32,
    /// Contrast range: factor drawn from `[1 - contrast, 1 + contrast]`.
    pub contrast: f32,
    /// Standard deviation of the per-image, per-channel additive shift.
    pub jitter_stddev: f32,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            flip: true,
            zoom: 0.3,
            rotation: 0.3,
            contrast: 0.3,
            jitter_stddev: 0.1,
        }
    }
}

/// Applies the augmentation pipeline to individual samples.
#[derive(Debug, Clone)]
pub struct Augmentor {
    config: AugmentConfig,
}

impl Augmentor {
    /// Create an augmentor with the given configuration.
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    /// Normalize and, when `training`, augment one sample.
    ///
    /// Input values are expected in `[0, 255]`; output values are in
    /// `[0, 1]`. With `training == false` this is exactly the rescale and
    /// nothing else — `rng` is not touched.
    pub fn apply<R: Rng>(&self, sample: &ImageSample, training: bool, rng: &mut R) -> ImageSample {
        let mut image = rescale(sample);
        if !training {
            return image;
        }

        if self.config.flip {
            if rng.gen_bool(0.5) {
                flip_horizontal(&mut image);
            }
            if rng.gen_bool(0.5) {
                flip_vertical(&mut image);
            }
        }

        // Zoom and rotation share a single bilinear resample with reflected
        // borders, keeping the output shape identical to the input.
        let scale = 1.0 + self.config.zoom * rng.gen_range(-1.0f32..=1.0);
        let angle = self.config.rotation * std::f32::consts::TAU * rng.gen_range(-1.0f32..=1.0);
        if scale != 1.0 || angle != 0.0 {
            image = resample_affine(&image, scale, angle);
        }

        if self.config.contrast > 0.0 {
            let factor = 1.0 + self.config.contrast * rng.gen_range(-1.0f32..=1.0);
            adjust_contrast(&mut image, factor);
        }

        if self.config.jitter_stddev > 0.0 {
            shift_channels(&mut image, self.config.jitter_stddev, rng);
        }

        clip_unit(&mut image);
        image
    }
}

/// Rescale raw `[0, 255]` pixel values to `[0, 1]`.
fn rescale(sample: &ImageSample) -> ImageSample {
    let data = sample.data.iter().map(|v| v / 255.0).collect();
    ImageSample::new(data, sample.height, sample.width, sample.channels)
}

fn flip_horizontal(image: &mut ImageSample) {
    let (h, w, c) = (image.height, image.width, image.channels);
    for y in 0..h {
        for x in 0..w / 2 {
            for ch in 0..c {
                let a = image.get(y, x, ch);
                let b = image.get(y, w - 1 - x, ch);
                image.set(y, x, ch, b);
                image.set(y, w - 1 - x, ch, a);
            }
        }
    }
}

fn flip_vertical(image: &mut ImageSample) {
    let (h, w, c) = (image.height, image.width, image.channels);
    for y in 0..h / 2 {
        for x in 0..w {
            for ch in 0..c {
                let a = image.get(y, x, ch);
                let b = image.get(h - 1 - y, x, ch);
                image.set(y, x, ch, b);
                image.set(h - 1 - y, x, ch, a);
            }
        }
    }
}

/// Reflect an index into `[0, len)` without repeating the border pixel's
/// mirror axis (`d c b a | a b c d | d c b a`).
fn reflect(index: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let period = 2 * len;
    let mut i = index % period;
    if i < 0 {
        i += period;
    }
    if i >= len {
        i = period - 1 - i;
    }
    i as usize
}

/// Bilinear sample at fractional coordinates with reflected borders.
fn sample_bilinear(image: &ImageSample, y: f32, x: f32, c: usize) -> f32 {
    let y0 = y.floor();
    let x0 = x.floor();
    let ty = y - y0;
    let tx = x - x0;
    let y0 = y0 as isize;
    let x0 = x0 as isize;

    let (h, w) = (image.height, image.width);
    let v00 = image.get(reflect(y0, h), reflect(x0, w), c);
    let v01 = image.get(reflect(y0, h), reflect(x0 + 1, w), c);
    let v10 = image.get(reflect(y0 + 1, h), reflect(x0, w), c);
    let v11 = image.get(reflect(y0 + 1, h), reflect(x0 + 1, w), c);

    let top = v00 + (v01 - v00) * tx;
    let bottom = v10 + (v11 - v10) * tx;
    top + (bottom - top) * ty
}

/// Resample with a zoom of `scale` and a rotation of `angle` radians about
/// the image center.
fn resample_affine(image: &ImageSample, scale: f32, angle: f32) -> ImageSample {
    let (h, w, c) = (image.height, image.width, image.channels);
    let cy = (h as f32 - 1.0) / 2.0;
    let cx = (w as f32 - 1.0) / 2.0;
    let (sin_a, cos_a) = angle.sin_cos();

    let mut out = ImageSample::zeros(h, w, c);
    for y in 0..h {
        for x in 0..w {
            // Inverse mapping: rotate by -angle, then undo the zoom.
            let dy = y as f32 - cy;
            let dx = x as f32 - cx;
            let src_x = cx + (dx * cos_a + dy * sin_a) / scale;
            let src_y = cy + (dy * cos_a - dx * sin_a) / scale;
            for ch in 0..c {
                out.set(y, x, ch, sample_bilinear(image, src_y, src_x, ch));
            }
        }
    }
    out
}

/// Scale the distance of every value from its channel mean by `factor`.
fn adjust_contrast(image: &mut ImageSample, factor: f32) {
    let (h, w, c) = (image.height, image.width, image.channels);
    let count = (h * w) as f32;
    for ch in 0..c {
        let mut mean = 0.0;
        for y in 0..h {
            for x in 0..w {
                mean += image.get(y, x, ch);
            }
        }
        mean /= count;
        for y in 0..h {
            for x in 0..w {
                let v = image.get(y, x, ch);
                image.set(y, x, ch, mean + (v - mean) * factor);
            }
        }
    }
}

/// Add one Gaussian draw per channel to the whole channel.
fn shift_channels<R: Rng>(image: &mut ImageSample, stddev: f32, rng: &mut R) {
    let (h, w, c) = (image.height, image.width, image.channels);
    for ch in 0..c {
        let noise: f32 = rng.sample(StandardNormal);
        let shift = noise * stddev;
        for y in 0..h {
            for x in 0..w {
                let v = image.get(y, x, ch);
                image.set(y, x, ch, v + shift);
            }
        }
    }
}

fn clip_unit(image: &mut ImageSample) {
    for v in image.data.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
}
