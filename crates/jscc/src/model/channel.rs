//! Simulated transmission channel between encoder and decoder.
//!
//! Symbols leaving the encoder are perturbed the way a wireless link would
//! perturb them: additive white Gaussian noise, optionally behind a Rayleigh
//! block-fading gain with perfect-CSI equalization at the receiver. The
//! perturbation is built from host-side rng draws converted to tensors, so
//! it sits on the autodiff graph as a constant and the whole run is
//! reproducible from a single seed.

use std::fmt;
use std::str::FromStr;

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Statistical model applied during simulated transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Passthrough, no impairment.
    Ideal,
    /// Additive white Gaussian noise at the configured SNR.
    Awgn,
    /// Rayleigh block fading (one complex gain per image) plus AWGN,
    /// equalized at the receiver with perfect channel knowledge.
    Rayleigh,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ideal => write!(f, "Ideal"),
            Self::Awgn => write!(f, "AWGN"),
            Self::Rayleigh => write!(f, "Rayleigh"),
        }
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ideal" => Ok(Self::Ideal),
            "awgn" => Ok(Self::Awgn),
            "rayleigh" => Ok(Self::Rayleigh),
            other => Err(format!(
                "unknown channel kind '{other}' (expected Ideal, AWGN, or Rayleigh)"
            )),
        }
    }
}

/// Configuration for the simulated channel.
#[derive(Config, Debug)]
pub struct ChannelConfig {
    /// Channel model.
    #[config(default = "ChannelKind::Rayleigh")]
    pub kind: ChannelKind,
    /// Signal-to-noise ratio in dB at unit signal power.
    #[config(default = 25.0)]
    pub snr_db: f64,
}

/// A fixed channel model at a fixed SNR.
#[derive(Debug, Clone)]
pub struct Channel {
    kind: ChannelKind,
    snr_db: f64,
}

impl Channel {
    /// Create a channel from its configuration.
    pub fn new(config: &ChannelConfig) -> Self {
        Self {
            kind: config.kind,
            snr_db: config.snr_db,
        }
    }

    /// The channel model in use.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// The configured SNR in dB.
    pub fn snr_db(&self) -> f64 {
        self.snr_db
    }

    /// Noise standard deviation per real dimension at unit signal power.
    pub fn noise_std(&self) -> f64 {
        10f64.powf(-self.snr_db / 20.0)
    }

    /// Transmit a batch of power-normalized symbol vectors `(batch, k)`.
    ///
    /// Returns the received (and, for Rayleigh, equalized) symbols of the
    /// same shape. Gradients flow through to `symbols`; the fading gains and
    /// noise are constants on the graph.
    ///
    /// # Panics
    /// Panics for the Rayleigh model if `k` is odd — symbols pair into
    /// complex values.
    pub fn transmit<B: Backend, R: Rng>(
        &self,
        symbols: Tensor<B, 2>,
        rng: &mut R,
    ) -> Tensor<B, 2> {
        match self.kind {
            ChannelKind::Ideal => symbols,
            ChannelKind::Awgn => {
                let [batch, k] = symbols.dims();
                let device = symbols.device();
                let noise = gaussian::<B, _>([batch, k], self.noise_std(), rng, &device);
                symbols + noise
            }
            ChannelKind::Rayleigh => {
                let [batch, k] = symbols.dims();
                assert!(
                    k % 2 == 0,
                    "Rayleigh fading needs an even symbol count, got {k}"
                );
                let half = k / 2;
                let device = symbols.device();

                // One complex gain h ~ CN(0, 1) per image (block fading).
                let h_re = gaussian::<B, _>(
                    [batch, 1],
                    std::f64::consts::FRAC_1_SQRT_2,
                    rng,
                    &device,
                );
                let h_im = gaussian::<B, _>(
                    [batch, 1],
                    std::f64::consts::FRAC_1_SQRT_2,
                    rng,
                    &device,
                );

                let z_re = symbols.clone().slice([0..batch, 0..half]);
                let z_im = symbols.slice([0..batch, half..k]);

                // y = h * z + n
                let y_re = z_re.clone() * h_re.clone() - z_im.clone() * h_im.clone()
                    + gaussian::<B, _>([batch, half], self.noise_std(), rng, &device);
                let y_im = z_re * h_im.clone() + z_im * h_re.clone()
                    + gaussian::<B, _>([batch, half], self.noise_std(), rng, &device);

                // Perfect-CSI equalization: z_hat = conj(h) * y / |h|^2.
                let denom = (h_re.clone().powf_scalar(2.0) + h_im.clone().powf_scalar(2.0))
                    .add_scalar(1e-9);
                let eq_re =
                    (y_re.clone() * h_re.clone() + y_im.clone() * h_im.clone()) / denom.clone();
                let eq_im = (y_im * h_re - y_re * h_im) / denom;

                Tensor::cat(vec![eq_re, eq_im], 1)
            }
        }
    }
}

/// Build a `(rows, cols)` Gaussian tensor from host-side draws.
fn gaussian<B: Backend, R: Rng>(
    shape: [usize; 2],
    stddev: f64,
    rng: &mut R,
    device: &B::Device,
) -> Tensor<B, 2> {
    let count = shape[0] * shape[1];
    let data: Vec<f32> = (0..count)
        .map(|_| {
            let n: f64 = rng.sample(StandardNormal);
            (n * stddev) as f32
        })
        .collect();
    Tensor::from_data(TensorData::new(data, shape), device)
}
