use std::path::PathBuf;

use anyhow::Result;
use burn::backend::ndarray::NdArrayDevice;
use cifar_backend::config::DEFAULT_MODEL_PATH;
use cifar_backend::training::{self, TrainBackend, TrainingConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Train the CIFAR-10 classifier and save its weights")]
#[command(version)]
struct Args {
    /// Override the number of epochs (default 100)
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Override the batch size (default 32)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Where the CIFAR-10 archive is downloaded and unpacked
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Training config and metric logs
    #[arg(long, default_value = "training-artifacts")]
    artifact_dir: PathBuf,

    /// Model artifact to write
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = TrainingConfig::recipe();
    if let Some(epochs) = args.epochs {
        config.num_epochs = epochs;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    training::train::<TrainBackend>(
        &config,
        &args.data_dir,
        &args.artifact_dir,
        &args.output,
        NdArrayDevice::Cpu,
    )
}
