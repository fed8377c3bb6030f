/// Number of classes the network predicts.
pub const NUM_CLASSES: usize = 10;

/// Side length of the square network input.
pub const IMAGE_SIZE: usize = 32;

pub const CHANNELS: usize = 3;

/// NHWC shape of a single preprocessed image.
pub const INPUT_SHAPE: [usize; 4] = [1, IMAGE_SIZE, IMAGE_SIZE, CHANNELS];

/// Class names, in the order of the CIFAR-10 label encoding.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

pub fn label(index: usize) -> Option<&'static str> {
    CLASS_NAMES.get(index).copied()
}
