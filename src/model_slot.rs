use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::classifier::{load_classifier, Classifier};
use crate::error::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// This call read the artifact.
    Loaded,
    AlreadyLoaded,
}

impl LoadOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            LoadOutcome::Loaded => "Model loaded successfully",
            LoadOutcome::AlreadyLoaded => "Model already loaded",
        }
    }
}

/// Lazily loaded model shared by every request.
///
/// Stays unloaded until a load succeeds; each call made while unloaded retries
/// the artifact. The lock is held across the load so concurrent first calls
/// read the file once.
pub struct ModelSlot {
    path: PathBuf,
    model: Mutex<Option<Arc<dyn Classifier>>>,
}

impl ModelSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            model: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.model
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn ensure_loaded(&self) -> Result<(Arc<dyn Classifier>, LoadOutcome), ClassifierError> {
        let mut slot = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = slot.as_ref() {
            return Ok((Arc::clone(model), LoadOutcome::AlreadyLoaded));
        }

        match load_classifier(&self.path) {
            Ok(model) => {
                *slot = Some(Arc::clone(&model));
                Ok((model, LoadOutcome::Loaded))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "model unavailable");
                Err(e)
            }
        }
    }
}
