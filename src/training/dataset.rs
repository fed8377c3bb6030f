use std::fs;
use std::path::{Path, PathBuf};

use burn::data::dataset::{Dataset, InMemDataset};
use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::info;

use crate::labels::{CHANNELS, CLASS_NAMES, IMAGE_SIZE, NUM_CLASSES};

const URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
const BATCH_DIR: &str = "cifar-10-batches-bin";
const TRAIN_BATCHES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_BATCH: &str = "test_batch.bin";
const LABEL_NAMES: &str = "batches.meta.txt";

const PIXELS: usize = IMAGE_SIZE * IMAGE_SIZE;
/// One label byte followed by the red, green and blue planes.
const RECORD_BYTES: usize = 1 + PIXELS * CHANNELS;

/// CIFAR-10 image stored as interleaved RGB (HWC) bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Cifar10Item {
    pub image: Vec<u8>,
    pub label: u8,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("'{}' is {len} bytes, not a whole number of 3073-byte records", path.display())]
    Truncated { path: PathBuf, len: usize },

    #[error("'{}' holds label {label}, expected 0 to 9", path.display())]
    Label { path: PathBuf, label: u8 },

    #[error("label names {found:?} do not match the class list")]
    LabelNames { found: Vec<String> },
}

/// The CIFAR-10 binary release, held in memory (about 180 MB for the train split).
pub struct Cifar10Dataset {
    dataset: InMemDataset<Cifar10Item>,
}

impl Dataset<Cifar10Item> for Cifar10Dataset {
    fn get(&self, index: usize) -> Option<Cifar10Item> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Cifar10Dataset {
    /// The 50,000 training images, downloading into `root` on first use.
    pub fn train(root: &Path) -> Result<Self, DatasetError> {
        let dir = download(root)?;
        Self::from_batch_files(TRAIN_BATCHES.iter().map(|file| dir.join(file)))
    }

    /// The 10,000 test images, downloading into `root` on first use.
    pub fn test(root: &Path) -> Result<Self, DatasetError> {
        let dir = download(root)?;
        Self::from_batch_files([dir.join(TEST_BATCH)])
    }

    pub fn from_batch_files<I, P>(files: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut items = Vec::new();
        for file in files {
            items.extend(read_batch(file.as_ref())?);
        }

        Ok(Self {
            dataset: InMemDataset::new(items),
        })
    }
}

fn read_batch(path: &Path) -> Result<Vec<Cifar10Item>, DatasetError> {
    let bytes = fs::read(path)?;
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(DatasetError::Truncated {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }

    bytes
        .chunks_exact(RECORD_BYTES)
        .map(|record| {
            let label = record[0];
            if usize::from(label) >= NUM_CLASSES {
                return Err(DatasetError::Label {
                    path: path.to_path_buf(),
                    label,
                });
            }
            Ok(Cifar10Item {
                image: planar_to_interleaved(&record[1..]),
                label,
            })
        })
        .collect()
}

fn planar_to_interleaved(planes: &[u8]) -> Vec<u8> {
    let mut image = Vec::with_capacity(PIXELS * CHANNELS);
    for i in 0..PIXELS {
        for c in 0..CHANNELS {
            image.push(planes[c * PIXELS + i]);
        }
    }
    image
}

/// Makes sure the batch files are unpacked under `root` and returns their directory.
pub fn download(root: &Path) -> Result<PathBuf, DatasetError> {
    let dir = root.join(BATCH_DIR);

    if !dir.is_dir() {
        fs::create_dir_all(root)?;
        info!("downloading CIFAR-10 from {URL}");

        let archive = reqwest::blocking::get(URL)?.error_for_status()?.bytes()?;
        tar::Archive::new(GzDecoder::new(archive.as_ref())).unpack(root)?;
        info!("CIFAR-10 unpacked into {}", dir.display());
    }

    check_label_names(&dir)?;
    Ok(dir)
}

/// Predictions are reported with [`CLASS_NAMES`], so the archive's own label
/// list must agree with it position by position.
fn check_label_names(dir: &Path) -> Result<(), DatasetError> {
    let path = dir.join(LABEL_NAMES);
    if !path.is_file() {
        return Ok(());
    }

    let found: Vec<String> = fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if found != CLASS_NAMES {
        return Err(DatasetError::LabelNames { found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, red: u8, green: u8, blue: u8) -> Vec<u8> {
        let mut bytes = vec![label];
        bytes.extend(std::iter::repeat(red).take(PIXELS));
        bytes.extend(std::iter::repeat(green).take(PIXELS));
        bytes.extend(std::iter::repeat(blue).take(PIXELS));
        bytes
    }

    #[test]
    fn test_reads_records_as_interleaved_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_batch_1.bin");
        let mut bytes = record(3, 10, 20, 30);
        bytes.extend(record(9, 1, 2, 3));
        fs::write(&path, bytes).unwrap();

        let dataset = Cifar10Dataset::from_batch_files([&path]).unwrap();
        assert_eq!(dataset.len(), 2);

        let first = dataset.get(0).unwrap();
        assert_eq!(first.label, 3);
        assert_eq!(first.image.len(), PIXELS * CHANNELS);
        assert_eq!(&first.image[..6], &[10, 20, 30, 10, 20, 30]);

        assert_eq!(dataset.get(1).unwrap().label, 9);
        assert!(dataset.get(2).is_none());
    }

    #[test]
    fn test_pixel_order_follows_planes() {
        let mut planes = vec![0u8; PIXELS * CHANNELS];
        // Green plane, pixel (row 0, column 1)
        planes[PIXELS + 1] = 255;

        let image = planar_to_interleaved(&planes);
        assert_eq!(image[CHANNELS + 1], 255);
        assert_eq!(image.iter().filter(|&&p| p == 255).count(), 1);
    }

    #[test]
    fn test_truncated_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_batch.bin");
        let mut bytes = record(0, 0, 0, 0);
        bytes.pop();
        fs::write(&path, bytes).unwrap();

        let err = Cifar10Dataset::from_batch_files([&path]).err().unwrap();
        assert!(matches!(err, DatasetError::Truncated { .. }));
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_batch.bin");
        fs::write(&path, record(10, 0, 0, 0)).unwrap();

        let err = Cifar10Dataset::from_batch_files([&path]).err().unwrap();
        assert!(matches!(err, DatasetError::Label { label: 10, .. }));
    }

    #[test]
    fn test_existing_directory_skips_download() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(BATCH_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LABEL_NAMES), CLASS_NAMES.join("\n") + "\n\n").unwrap();
        fs::write(dir.join(TEST_BATCH), record(1, 5, 5, 5)).unwrap();

        let dataset = Cifar10Dataset::test(root.path()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_mismatched_label_names_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(BATCH_DIR);
        fs::create_dir_all(&dir).unwrap();
        let mut names = CLASS_NAMES.to_vec();
        names.swap(3, 5);
        fs::write(dir.join(LABEL_NAMES), names.join("\n")).unwrap();

        let err = download(root.path()).unwrap_err();
        assert!(matches!(err, DatasetError::LabelNames { .. }));
    }
}
