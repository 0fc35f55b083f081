//! End-to-end communicator: encoder → power normalization → channel →
//! decoder.

use burn::module::Ignored;
use burn::prelude::*;
use rand::Rng;

use crate::model::channel::{Channel, ChannelConfig};
use crate::model::decoder::{Decoder, DecoderConfig};
use crate::model::encoder::{Encoder, EncoderConfig};

/// Configuration for the end-to-end communicator.
#[derive(Config, Debug)]
pub struct CommunicatorConfig {
    /// Channel model applied between encoder and decoder.
    pub channel: ChannelConfig,
    /// Latent feature-map channels shared by encoder and decoder.
    #[config(default = 8)]
    pub latent_channels: usize,
}

/// Trainable image communicator.
///
/// The encoder and decoder hold all trainable parameters; the channel is a
/// fixed perturbation. Transmission noise is drawn in both train and eval
/// forward passes — evaluation measures reconstruction through the same
/// noisy channel the model is trained for.
#[derive(Module, Debug)]
pub struct Communicator<B: Backend> {
    encoder: Encoder<B>,
    decoder: Decoder<B>,
    channel: Ignored<Channel>,
}

impl CommunicatorConfig {
    /// Initialize a communicator with this configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Communicator<B> {
        Communicator {
            encoder: EncoderConfig::new()
                .with_latent_channels(self.latent_channels)
                .init(device),
            decoder: DecoderConfig::new()
                .with_latent_channels(self.latent_channels)
                .init(device),
            channel: Ignored(Channel::new(&self.channel)),
        }
    }
}

impl<B: Backend> Communicator<B> {
    /// Encode, transmit over the simulated channel, and decode.
    ///
    /// Input and output shapes are `(batch, channels, h, w)` with `h`, `w`
    /// divisible by 4; output values are in `[0, 1]`.
    pub fn forward<R: Rng>(&self, images: Tensor<B, 4>, rng: &mut R) -> Tensor<B, 4> {
        let [_, _, h, w] = images.dims();
        assert!(
            h % 4 == 0 && w % 4 == 0,
            "image dims {h}x{w} must be divisible by 4"
        );

        let symbols = power_normalize(self.encoder.forward(images));
        let received = self.channel.0.transmit(symbols, rng);
        self.decoder.forward(received, [h / 4, w / 4])
    }

    /// The channel this communicator transmits through.
    pub fn channel(&self) -> &Channel {
        &self.channel.0
    }
}

/// Scale each symbol vector to unit average power.
///
/// With unit signal power the channel's configured SNR is meaningful.
pub fn power_normalize<B: Backend>(symbols: Tensor<B, 2>) -> Tensor<B, 2> {
    let [_batch, k] = symbols.dims();
    let norm = symbols
        .clone()
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt()
        .add_scalar(1e-12);
    symbols.div(norm).mul_scalar((k as f64).sqrt())
}
