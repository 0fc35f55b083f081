use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation;

/// Configuration for the convolutional encoder.
///
/// Maps an image batch to one channel-symbol vector per image:
///
/// ```text
/// (batch, in_channels, h, w)
///   → Conv2d(in→mid1, 5x5, stride 2) → ReLU
///   → Conv2d(mid1→mid2, 5x5, stride 2) → ReLU
///   → Conv2d(mid2→latent, 5x5, stride 1)
///   → flatten
///   → symbols: (batch, latent * h/4 * w/4)
/// ```
#[derive(Config, Debug)]
pub struct EncoderConfig {
    /// Input image channels.
    #[config(default = 3)]
    pub in_channels: usize,
    /// First conv layer output channels.
    #[config(default = 16)]
    pub mid_channels1: usize,
    /// Second conv layer output channels.
    #[config(default = 32)]
    pub mid_channels2: usize,
    /// Latent feature-map channels; determines the symbol count.
    #[config(default = 8)]
    pub latent_channels: usize,
}

/// Convolutional encoder: image batch to channel-symbol vectors.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
}

impl EncoderConfig {
    /// Initialize an encoder with this configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let conv = |channels: [usize; 2], stride: usize| {
            Conv2dConfig::new(channels, [5, 5])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(2, 2))
                .init(device)
        };
        Encoder {
            conv1: conv([self.in_channels, self.mid_channels1], 2),
            conv2: conv([self.mid_channels1, self.mid_channels2], 2),
            conv3: conv([self.mid_channels2, self.latent_channels], 1),
        }
    }
}

impl<B: Backend> Encoder<B> {
    /// Forward pass.
    ///
    /// Input shape: `(batch, in_channels, h, w)` with `h`, `w` divisible by 4.
    /// Output shape: `(batch, latent_channels * h/4 * w/4)`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = activation::relu(self.conv1.forward(images));
        let x = activation::relu(self.conv2.forward(x));
        let x = self.conv3.forward(x);
        x.flatten(1, 3)
    }
}
