use serde::Serialize;
use std::path::Path;

use crate::inference::model::{InferenceError, ModelHost};
use crate::inference::preprocess::{self, PreprocessError};

/// Severity stages, ordered by model output index. The argmax index is the
/// sole mapping into this table.
pub const CLASS_LABELS: [&str; 5] = [
    "No disease visible",
    "Mild NPDR",
    "Moderate NPDR",
    "Severe NPDR",
    "Proliferative DR",
];

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub index: usize,
    pub label: &'static str,
    pub probabilities: Vec<f32>,
}

/// Lowest index wins on ties: only a strictly greater score displaces the
/// current best.
pub fn argmax(probabilities: &[f32]) -> usize {
    let mut best = 0;
    for (index, &score) in probabilities.iter().enumerate() {
        if score > probabilities[best] {
            best = index;
        }
    }
    best
}

#[derive(Clone)]
pub struct Classifier {
    model: ModelHost,
}

impl Classifier {
    pub fn new(model: ModelHost) -> Self {
        Self { model }
    }

    /// Full pipeline over a stored upload: decode, forward, argmax, label.
    pub fn classify(&self, stored_path: &Path) -> Result<Prediction, ClassifyError> {
        let input = preprocess::preprocess_file(stored_path)?;
        let probabilities = self.model.infer(&input)?;
        let index = argmax(&probabilities);
        Ok(Prediction {
            index,
            label: CLASS_LABELS[index],
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_picks_lowest_index() {
        let index = argmax(&[0.5, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(index, 0);
        assert_eq!(CLASS_LABELS[index], "No disease visible");
    }

    #[test]
    fn argmax_finds_strict_maximum() {
        assert_eq!(argmax(&[0.1, 0.2, 0.05, 0.6, 0.05]), 3);
        assert_eq!(argmax(&[0.0, 0.0, 0.0, 0.0, 1.0]), 4);
    }

    #[test]
    fn argmax_is_deterministic() {
        let probs = [0.2, 0.3, 0.3, 0.1, 0.1];
        assert_eq!(argmax(&probs), argmax(&probs));
    }

    #[test]
    fn label_table_endpoints() {
        assert_eq!(CLASS_LABELS[0], "No disease visible");
        assert_eq!(CLASS_LABELS[4], "Proliferative DR");
        assert_eq!(CLASS_LABELS.len(), 5);
    }
}
