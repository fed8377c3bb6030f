//! The convolutional network shared by the trainer and the native predictor.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};

use crate::labels::{CHANNELS, IMAGE_SIZE};

const HIDDEN_UNITS: usize = 128;

/// Spatial size after three unpadded 3x3 convolutions, each followed by a 2x2 pool.
const fn feature_map_size(input: usize) -> usize {
    let after_block1 = (input - 2) / 2;
    let after_block2 = (after_block1 - 2) / 2;
    (after_block2 - 2) / 2
}

const FEATURE_MAP: usize = feature_map_size(IMAGE_SIZE);
const FLATTENED_FEATURES: usize = 128 * FEATURE_MAP * FEATURE_MAP;

#[derive(Config, Debug)]
pub struct ModelConfig {
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl ModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Cifar10Cnn<B> {
        Cifar10Cnn {
            conv1: Conv2dConfig::new([CHANNELS, 32], [3, 3]).init(device),
            conv2: Conv2dConfig::new([32, 64], [3, 3]).init(device),
            conv3: Conv2dConfig::new([64, 128], [3, 3]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(FLATTENED_FEATURES, HIDDEN_UNITS).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc2: LinearConfig::new(HIDDEN_UNITS, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

/// Three conv/pool blocks followed by a dropout-regularized dense head.
///
/// Input: `[batch, 3, 32, 32]`. Output: one logit per class.
#[derive(Module, Debug)]
pub struct Cifar10Cnn<B: Backend> {
    conv1: Conv2d<B>, // 3 -> 32
    conv2: Conv2d<B>, // 32 -> 64
    conv3: Conv2d<B>, // 64 -> 128
    pool: MaxPool2d,
    fc1: Linear<B>, // 512 -> 128
    dropout: Dropout,
    fc2: Linear<B>, // 128 -> classes
    activation: Relu,
}

impl<B: Backend> Cifar10Cnn<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.pool.forward(self.activation.forward(x));

        let x = self.conv2.forward(x);
        let x = self.pool.forward(self.activation.forward(x));

        let x = self.conv3.forward(x);
        let x = self.pool.forward(self.activation.forward(x));

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.dropout.forward(x);

        self.fc2.forward(x)
    }

    /// Class probabilities, `[batch, classes]`.
    pub fn infer(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}

/// Packs NHWC pixels (`batch_size` images of 32x32x3) into the NCHW layout
/// convolutions expect.
pub fn images_to_tensor<B: Backend>(
    pixels: &[f32],
    batch_size: usize,
    device: &B::Device,
) -> Tensor<B, 4> {
    Tensor::<B, 1>::from_floats(pixels, device)
        .reshape([batch_size, IMAGE_SIZE, IMAGE_SIZE, CHANNELS])
        .permute([0, 3, 1, 2])
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;

    use super::*;
    use crate::labels::NUM_CLASSES;

    type TestBackend = NdArray;

    #[test]
    fn test_flattened_feature_count() {
        assert_eq!(FEATURE_MAP, 2);
        assert_eq!(FLATTENED_FEATURES, 512);
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: Cifar10Cnn<TestBackend> = ModelConfig::new().init(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, CHANNELS, IMAGE_SIZE, IMAGE_SIZE], &device);
        assert_eq!(model.forward(images).dims(), [2, NUM_CLASSES]);
    }

    #[test]
    fn test_infer_rows_are_distributions() {
        let device = Default::default();
        let model: Cifar10Cnn<TestBackend> = ModelConfig::new().init(&device);

        let images =
            Tensor::<TestBackend, 4>::ones([3, CHANNELS, IMAGE_SIZE, IMAGE_SIZE], &device) * 0.5;
        let probabilities = model.infer(images).into_data().to_vec::<f32>().unwrap();

        for row in probabilities.chunks(NUM_CLASSES) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-4);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_images_to_tensor_moves_channels_first() {
        let device = Default::default();
        let mut pixels = vec![0.0f32; IMAGE_SIZE * IMAGE_SIZE * CHANNELS];
        // (h = 0, w = 1, c = 2)
        pixels[CHANNELS + 2] = 1.0;

        let tensor = images_to_tensor::<TestBackend>(&pixels, 1, &device);
        assert_eq!(tensor.dims(), [1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE]);

        let values = tensor.into_data().to_vec::<f32>().unwrap();
        // NCHW offset of (c = 2, h = 0, w = 1)
        assert_eq!(values[2 * IMAGE_SIZE * IMAGE_SIZE + 1], 1.0);
        assert_eq!(values.iter().sum::<f32>(), 1.0);
    }
}
