//! Tensor bridge: utilities to convert between host image samples
//! (`dataset::ImageSample`, HWC) and burn NCHW tensors.
//!
//! This module is the boundary between the host data pipeline and the
//! backend. The augmentation pipeline produces `[0, 1]` HWC samples; the
//! model needs `Tensor<B, 4>` NCHW batches.

use burn::prelude::*;
use burn::tensor::TensorData;
use dataset::ImageSample;

/// Convert a batch of image samples to an NCHW tensor.
///
/// # Panics
/// Panics if the batch is empty or if samples have inconsistent dimensions.
pub fn images_to_tensor<B: Backend>(samples: &[ImageSample], device: &B::Device) -> Tensor<B, 4> {
    assert!(!samples.is_empty(), "image batch must not be empty");
    let (h, w, c) = (samples[0].height, samples[0].width, samples[0].channels);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(
            (sample.height, sample.width, sample.channels),
            (h, w, c),
            "image {i} has shape {}x{}x{}, expected {h}x{w}x{c}",
            sample.height,
            sample.width,
            sample.channels
        );
    }

    let batch = samples.len();
    let mut flat = Vec::with_capacity(batch * c * h * w);
    for sample in samples {
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    flat.push(sample.get(y, x, ch));
                }
            }
        }
    }
    Tensor::from_data(TensorData::new(flat, [batch, c, h, w]), device)
}

/// Convert an NCHW tensor back to host image samples.
///
/// Used when dumping reconstructions for inspection.
pub fn tensor_to_images<B: Backend>(tensor: Tensor<B, 4>) -> Vec<ImageSample> {
    let [batch, c, h, w] = tensor.dims();
    let flat: Vec<f32> = tensor.into_data().to_vec().unwrap();

    let mut samples = Vec::with_capacity(batch);
    for b in 0..batch {
        let mut sample = ImageSample::zeros(h, w, c);
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let idx = ((b * c + ch) * h + y) * w + x;
                    sample.set(y, x, ch, flat[idx]);
                }
            }
        }
        samples.push(sample);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_round_trip() {
        let device = Default::default();
        let mut a = ImageSample::zeros(2, 3, 3);
        let mut b = ImageSample::zeros(2, 3, 3);
        for y in 0..2 {
            for x in 0..3 {
                for c in 0..3 {
                    a.set(y, x, c, (y * 9 + x * 3 + c) as f32);
                    b.set(y, x, c, 100.0 + (y * 9 + x * 3 + c) as f32);
                }
            }
        }

        let tensor = images_to_tensor::<TestBackend>(&[a.clone(), b.clone()], &device);
        assert_eq!(tensor.dims(), [2, 3, 2, 3]);

        let back = tensor_to_images::<TestBackend>(tensor);
        assert_eq!(back[0], a);
        assert_eq!(back[1], b);
    }

    #[test]
    fn test_channel_layout_is_planar() {
        let device = Default::default();
        let mut sample = ImageSample::zeros(1, 2, 3);
        // Pixel (0,0) = (1,2,3), pixel (0,1) = (4,5,6).
        sample.set(0, 0, 0, 1.0);
        sample.set(0, 0, 1, 2.0);
        sample.set(0, 0, 2, 3.0);
        sample.set(0, 1, 0, 4.0);
        sample.set(0, 1, 1, 5.0);
        sample.set(0, 1, 2, 6.0);

        let tensor = images_to_tensor::<TestBackend>(std::slice::from_ref(&sample), &device);
        let flat: Vec<f32> = tensor.into_data().to_vec().unwrap();
        // NCHW: all of channel 0 first, then channel 1, then channel 2.
        assert_eq!(flat, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    #[should_panic]
    fn test_inconsistent_shapes_panic() {
        let device: <TestBackend as Backend>::Device = Default::default();
        let _ = images_to_tensor::<TestBackend>(
            &[ImageSample::zeros(2, 2, 3), ImageSample::zeros(4, 4, 3)],
            &device,
        );
    }
}
