use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use cifar_backend::config::{DEFAULT_MODEL_PATH, TOP_K};
use cifar_backend::{load_classifier, preprocess, ClassifierError};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "predict")]
#[command(about = "Classify one image with the trained CIFAR-10 model")]
#[command(version)]
struct Args {
    /// Model artifact (.mpk record or .onnx graph)
    #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
    model: PathBuf,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let classifier = match load_classifier(&args.model) {
        Ok(classifier) => classifier,
        Err(ClassifierError::ModelNotFound(path)) => {
            println!("Error: Model file not found at '{}'", path.display());
            println!("Please make sure you have run your training script to save the model.");
            return Ok(());
        }
        Err(e) => {
            println!("{e}");
            return Ok(());
        }
    };
    println!("Model '{}' loaded successfully.", args.model.display());

    print!("\nPlease enter the full path to your image and press Enter: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let image_path = PathBuf::from(clean_path(&line));

    if !image_path.is_file() {
        println!(
            "Error: The image file at '{}' was not found.",
            image_path.display()
        );
        return Ok(());
    }

    let prediction = preprocess::from_path(&image_path).and_then(|input| classifier.predict(&input));
    match prediction {
        Ok(prediction) => {
            println!("\n--- Prediction Result ---");
            println!("This image is most likely a: {}", prediction.label);
            println!("Confidence: {:.2}%", prediction.confidence);
            println!("Top {TOP_K}:");
            for (rank, entry) in prediction.top(TOP_K).iter().enumerate() {
                println!(
                    "  {}. {:<10} {:.2}%",
                    rank + 1,
                    entry.class,
                    entry.confidence
                );
            }
        }
        Err(e) => println!("An error occurred while processing the image: {e}"),
    }

    Ok(())
}

/// Strips surrounding whitespace and the quotes a drag-and-drop into a terminal adds.
fn clean_path(input: &str) -> &str {
    input.trim().trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("  /tmp/cat.png\n"), "/tmp/cat.png");
        assert_eq!(clean_path("\"/tmp/my cat.png\"\r\n"), "/tmp/my cat.png");
        assert_eq!(clean_path("'C:\\img\\dog.jpg'"), "C:\\img\\dog.jpg");
    }
}
