use std::marker::PhantomData;

use burn::{
    data::dataloader::batcher::Batcher,
    tensor::{backend::Backend, Int, Tensor},
};
use image::RgbImage;

use super::augment::{AugmentationConfig, Transform};
use super::dataset::Cifar10Item;
use crate::labels::{CHANNELS, IMAGE_SIZE};
use crate::network::images_to_tensor;

#[derive(Clone, Debug)]
pub struct Cifar10Batch<B: Backend> {
    /// `[batch, 3, 32, 32]`, scaled to `[0, 1]`.
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 1, Int>,
}

/// Turns dataset items into tensors, augmenting them when configured (training only).
pub struct Cifar10Batcher<B: Backend> {
    augmentation: Option<AugmentationConfig>,
    _backend: PhantomData<B>,
}

impl<B: Backend> Cifar10Batcher<B> {
    pub fn new(augmentation: Option<AugmentationConfig>) -> Self {
        Self {
            augmentation,
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> Clone for Cifar10Batcher<B> {
    fn clone(&self) -> Self {
        Self::new(self.augmentation.clone())
    }
}

impl<B: Backend> Batcher<B, Cifar10Item, Cifar10Batch<B>> for Cifar10Batcher<B> {
    fn batch(&self, items: Vec<Cifar10Item>, device: &B::Device) -> Cifar10Batch<B> {
        let batch_size = items.len();
        let mut rng = rand::thread_rng();
        let mut pixels = Vec::with_capacity(batch_size * IMAGE_SIZE * IMAGE_SIZE * CHANNELS);
        let mut targets = Vec::with_capacity(batch_size);

        for item in items {
            let image = match &self.augmentation {
                Some(config) => augmented(item.image, Transform::sample(config, &mut rng)),
                None => item.image,
            };
            pixels.extend(image.iter().map(|&p| f32::from(p) / 255.0));
            targets.push(i64::from(item.label));
        }

        let images = images_to_tensor::<B>(&pixels, batch_size, device);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), device);

        Cifar10Batch { images, targets }
    }
}

fn augmented(image: Vec<u8>, transform: Transform) -> Vec<u8> {
    let side = IMAGE_SIZE as u32;
    match RgbImage::from_raw(side, side, image) {
        Some(img) => transform.apply(&img).into_raw(),
        // from_raw only fails on a short buffer, which the dataset never produces.
        None => vec![0; IMAGE_SIZE * IMAGE_SIZE * CHANNELS],
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;

    type TestBackend = NdArray;

    fn item(value: u8, label: u8) -> Cifar10Item {
        Cifar10Item {
            image: vec![value; IMAGE_SIZE * IMAGE_SIZE * CHANNELS],
            label,
        }
    }

    #[test]
    fn test_batch_shapes_and_scaling() {
        let device = Default::default();
        let batcher = Cifar10Batcher::<TestBackend>::new(None);

        let batch = batcher.batch(vec![item(255, 4), item(51, 7)], &device);

        assert_eq!(batch.images.dims(), [2, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);
        assert_eq!(batch.targets.dims(), [2]);
        assert_eq!(
            batch.targets.into_data().to_vec::<i64>().unwrap(),
            vec![4, 7]
        );

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        let per_image = IMAGE_SIZE * IMAGE_SIZE * CHANNELS;
        assert!(values[..per_image].iter().all(|v| (v - 1.0).abs() < 1e-6));
        assert!(values[per_image..].iter().all(|v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_augmentation_keeps_shape_and_range() {
        let device = Default::default();
        let batcher = Cifar10Batcher::<TestBackend>::new(Some(AugmentationConfig::new()));

        let batch = batcher.batch(vec![item(128, 0), item(3, 1), item(250, 2)], &device);
        assert_eq!(batch.images.dims(), [3, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
