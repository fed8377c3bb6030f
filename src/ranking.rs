use serde::Serialize;

use crate::error::ClassifierError;
use crate::labels::{CLASS_NAMES, NUM_CLASSES};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassConfidence {
    pub class: &'static str,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
}

/// Primary prediction plus every class ranked by confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: &'static str,
    pub confidence: f64,
    pub ranked: Vec<ClassConfidence>,
}

impl Prediction {
    /// Builds a prediction from a probability vector aligned with [`CLASS_NAMES`].
    ///
    /// The arg-max keeps the first maximal index, and the ranked list is a stable
    /// descending sort, so equal confidences stay in label order.
    pub fn from_probabilities(probabilities: &[f32]) -> Result<Self, ClassifierError> {
        if probabilities.len() != NUM_CLASSES {
            return Err(ClassifierError::ShapeMismatch {
                expected: vec![NUM_CLASSES],
                actual: vec![probabilities.len()],
            });
        }
        if let Some(index) = probabilities.iter().position(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model produced a non-finite probability for '{}'",
                CLASS_NAMES[index]
            )));
        }

        let mut ranked: Vec<ClassConfidence> = CLASS_NAMES
            .iter()
            .zip(probabilities)
            .map(|(&class, &p)| ClassConfidence {
                class,
                confidence: f64::from(p) * 100.0,
            })
            .collect();

        let mut best = 0;
        for (index, entry) in ranked.iter().enumerate() {
            if entry.confidence > ranked[best].confidence {
                best = index;
            }
        }
        let label = ranked[best].class;
        let confidence = ranked[best].confidence;

        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        Ok(Self {
            label,
            confidence,
            ranked,
        })
    }

    /// The `k` most confident classes (fewer if there are not that many).
    pub fn top(&self, k: usize) -> &[ClassConfidence] {
        &self.ranked[..k.min(self.ranked.len())]
    }
}
