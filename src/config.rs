use std::path::PathBuf;

use clap::Parser;

/// Artifact written by the trainer and read by both predictors.
pub const DEFAULT_MODEL_PATH: &str = "my_image_classifier.mpk";

pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Number of ranked classes returned by `/predict`.
pub const TOP_K: usize = 3;

/// Serving endpoint settings; every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "cifar-backend")]
#[command(about = "HTTP endpoint serving CIFAR-10 predictions")]
#[command(version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "CLASSIFIER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(short, long, env = "CLASSIFIER_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Model artifact (.mpk record or .onnx graph), loaded on first use
    #[arg(short, long, env = "CLASSIFIER_MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "CLASSIFIER_MAX_UPLOAD_BYTES", default_value_t = MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

/// Whether `filename` carries an allow-listed image extension (case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions() {
        for name in ["cat.png", "DOG.JPG", "a.b.jpeg", "x.gif", "y.bmp", "z.WebP"] {
            assert!(allowed_file(name), "{name}");
        }
    }

    #[test]
    fn test_rejected_extensions() {
        for name in ["notes.txt", "png", "archive.png.zip", "", "trailing.", ".hidden"] {
            assert!(!allowed_file(name), "{name}");
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::parse_from(["cifar-backend"]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::parse_from([
            "cifar-backend",
            "--port",
            "8080",
            "--model-path",
            "exported.onnx",
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.model_path, PathBuf::from("exported.onnx"));
    }
}
