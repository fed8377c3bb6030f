//! Fitting the network on CIFAR-10 with burn's learner.

pub mod augment;
pub mod batcher;
pub mod dataset;

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use burn::{
    backend::{Autodiff, NdArray},
    config::Config,
    data::dataloader::DataLoaderBuilder,
    data::dataset::Dataset,
    module::Module,
    nn::loss::CrossEntropyLossConfig,
    optim::AdamConfig,
    tensor::{
        backend::{AutodiffBackend, Backend},
        Int, Tensor,
    },
    train::{
        metric::{AccuracyMetric, LossMetric},
        ClassificationOutput, LearnerBuilder, LearningStrategy, TrainOutput, TrainStep, ValidStep,
    },
};
use tracing::info;

use self::augment::AugmentationConfig;
use self::batcher::{Cifar10Batch, Cifar10Batcher};
use self::dataset::Cifar10Dataset;
use crate::classifier::save_artifact;
use crate::network::{Cifar10Cnn, ModelConfig};

/// CPU training backend.
pub type TrainBackend = Autodiff<NdArray>;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: ModelConfig,
    pub optimizer: AdamConfig,
    pub augmentation: AugmentationConfig,
    #[config(default = 100)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 4)]
    pub num_workers: usize,
    #[config(default = 42)]
    pub seed: u64,
    #[config(default = 1.0e-3)]
    pub learning_rate: f64,
}

impl TrainingConfig {
    /// The fixed recipe: default network, Adam, Keras-style augmentation.
    pub fn recipe() -> Self {
        Self::new(ModelConfig::new(), AdamConfig::new(), AugmentationConfig::new())
    }
}

impl<B: Backend> Cifar10Cnn<B> {
    pub fn forward_classification(
        &self,
        images: Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let output = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}

impl<B: AutodiffBackend> TrainStep<Cifar10Batch<B>, ClassificationOutput<B>> for Cifar10Cnn<B> {
    fn step(&self, batch: Cifar10Batch<B>) -> TrainOutput<ClassificationOutput<B>> {
        let item = self.forward_classification(batch.images, batch.targets);

        TrainOutput::new(self, item.loss.backward(), item)
    }
}

impl<B: Backend> ValidStep<Cifar10Batch<B>, ClassificationOutput<B>> for Cifar10Cnn<B> {
    fn step(&self, batch: Cifar10Batch<B>) -> ClassificationOutput<B> {
        self.forward_classification(batch.images, batch.targets)
    }
}

/// Seeds the backend RNG with `config.seed`, then initializes the network, so
/// the starting weights are reproducible.
pub fn seeded_model<B: Backend>(config: &TrainingConfig, device: &B::Device) -> Cifar10Cnn<B> {
    B::seed(device, config.seed);
    config.model.init::<B>(device)
}

/// Trains on the CIFAR-10 train split, validating on the test split, and writes
/// the final weights to `output`.
///
/// `artifact_dir` receives the effective `config.json` and the learner's metric logs.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    data_dir: &Path,
    artifact_dir: &Path,
    output: &Path,
    device: B::Device,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(artifact_dir)
        .with_context(|| format!("creating {}", artifact_dir.display()))?;
    config
        .save(artifact_dir.join("config.json"))
        .context("saving training config")?;

    let dataset_train = Cifar10Dataset::train(data_dir)?;
    let dataset_valid = Cifar10Dataset::test(data_dir)?;
    info!(
        train = dataset_train.len(),
        valid = dataset_valid.len(),
        "CIFAR-10 loaded"
    );

    let batcher_train = Cifar10Batcher::<B>::new(Some(config.augmentation.clone()));
    let batcher_valid = Cifar10Batcher::<B::InnerBackend>::new(None);

    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_valid);

    let model = seeded_model::<B>(config, &device);
    info!(parameters = model.num_params(), "network built");

    let artifact_dir_str = artifact_dir.to_string_lossy().to_string();
    let learner = LearnerBuilder::new(&artifact_dir_str)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .learning_strategy(LearningStrategy::SingleDevice(device.clone()))
        .with_application_logger(None)
        .num_epochs(config.num_epochs)
        .summary()
        .build(model, config.optimizer.init(), config.learning_rate);

    let now = Instant::now();
    let trained = learner.fit(dataloader_train, dataloader_valid);
    let elapsed = now.elapsed().as_secs();
    info!("Training completed in {}m{}s", elapsed / 60, elapsed % 60);

    save_artifact(trained.model, output)
        .with_context(|| format!("saving model to {}", output.display()))?;
    info!("Bravo! Model saved to {}", output.display());

    Ok(())
}
