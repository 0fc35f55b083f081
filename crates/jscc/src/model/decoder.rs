use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation;

/// Configuration for the convolutional decoder.
///
/// Mirrors the encoder: reshapes received symbols back into a latent feature
/// map and upsamples to the original image size, with a sigmoid keeping the
/// reconstruction in `[0, 1]`.
///
/// ```text
/// (batch, latent * fh * fw)
///   → reshape (batch, latent, fh, fw)
///   → ConvTranspose2d(latent→mid1, 5x5, stride 2) → ReLU
///   → ConvTranspose2d(mid1→mid2, 5x5, stride 2) → ReLU
///   → Conv2d(mid2→out, 5x5) → sigmoid
///   → images: (batch, out_channels, 4*fh, 4*fw)
/// ```
#[derive(Config, Debug)]
pub struct DecoderConfig {
    /// Latent feature-map channels; must match the encoder.
    #[config(default = 8)]
    pub latent_channels: usize,
    /// First transpose-conv output channels.
    #[config(default = 32)]
    pub mid_channels1: usize,
    /// Second transpose-conv output channels.
    #[config(default = 16)]
    pub mid_channels2: usize,
    /// Output image channels.
    #[config(default = 3)]
    pub out_channels: usize,
}

/// Convolutional decoder: received symbols to reconstructed images.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    deconv1: ConvTranspose2d<B>,
    deconv2: ConvTranspose2d<B>,
    conv_out: Conv2d<B>,
}

impl DecoderConfig {
    /// Initialize a decoder with this configuration.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let deconv = |channels: [usize; 2]| {
            ConvTranspose2dConfig::new(channels, [5, 5])
                .with_stride([2, 2])
                .with_padding([2, 2])
                .with_padding_out([1, 1])
                .init(device)
        };
        Decoder {
            deconv1: deconv([self.latent_channels, self.mid_channels1]),
            deconv2: deconv([self.mid_channels1, self.mid_channels2]),
            conv_out: Conv2dConfig::new([self.mid_channels2, self.out_channels], [5, 5])
                .with_padding(PaddingConfig2d::Explicit(2, 2))
                .init(device),
        }
    }
}

impl<B: Backend> Decoder<B> {
    /// Forward pass.
    ///
    /// `feature_dims` is the latent feature-map size `(h/4, w/4)` of the
    /// image the symbols were encoded from.
    ///
    /// Input shape: `(batch, latent_channels * fh * fw)`.
    /// Output shape: `(batch, out_channels, 4*fh, 4*fw)`, values in `[0, 1]`.
    pub fn forward(&self, symbols: Tensor<B, 2>, feature_dims: [usize; 2]) -> Tensor<B, 4> {
        let [batch, k] = symbols.dims();
        let [fh, fw] = feature_dims;
        debug_assert_eq!(k % (fh * fw), 0, "symbol count {k} not divisible by {fh}x{fw}");

        let latent = k / (fh * fw);
        let x = symbols.reshape([batch, latent, fh, fw]);
        let x = activation::relu(self.deconv1.forward(x));
        let x = activation::relu(self.deconv2.forward(x));
        activation::sigmoid(self.conv_out.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let decoder = DecoderConfig::new().init::<TestBackend>(&device);
        let symbols = Tensor::<TestBackend, 2>::random(
            [4, 8 * 8 * 8],
            Distribution::Normal(0.0, 1.0),
            &device,
        );

        let images = decoder.forward(symbols, [8, 8]);
        assert_eq!(images.dims(), [4, 3, 32, 32]);
    }

    #[test]
    fn test_output_in_unit_range() {
        let device = Default::default();
        let decoder = DecoderConfig::new().init::<TestBackend>(&device);
        let symbols = Tensor::<TestBackend, 2>::random(
            [2, 8 * 4 * 4],
            Distribution::Normal(0.0, 10.0),
            &device,
        );

        let images = decoder.forward(symbols, [4, 4]);
        let values: Vec<f32> = images.into_data().to_vec().unwrap();
        for v in values {
            assert!((0.0..=1.0).contains(&v), "decoder output {v} outside [0, 1]");
        }
    }
}
