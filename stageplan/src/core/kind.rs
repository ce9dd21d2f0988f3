//! Stage kind variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a model selector validates candidate models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ValidationScheme {
    /// K-fold cross-validation.
    CrossValidation {
        /// Number of folds.
        folds: u32,
    },
    /// Single train/validation split.
    TrainValidationSplit {
        /// Fraction of rows used for training.
        train_ratio: f64,
    },
}

impl ValidationScheme {
    /// Creates a k-fold cross-validation scheme.
    #[must_use]
    pub const fn cross_validation(folds: u32) -> Self {
        Self::CrossValidation { folds }
    }

    /// Creates a train/validation split scheme.
    #[must_use]
    pub const fn train_validation_split(train_ratio: f64) -> Self {
        Self::TrainValidationSplit { train_ratio }
    }

    /// Returns the number of fits each per-fold stage goes through.
    #[must_use]
    pub const fn fold_count(&self) -> u32 {
        match self {
            Self::CrossValidation { folds } => *folds,
            Self::TrainValidationSplit { .. } => 1,
        }
    }
}

impl Default for ValidationScheme {
    fn default() -> Self {
        Self::CrossValidation { folds: 3 }
    }
}

/// The kind of computation a stage performs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StageKind {
    /// Origin of a raw feature read from the data source.
    Generator,
    /// Pure, stateless transformation.
    Transformer {
        /// Operation name (e.g. "tokenize").
        operation: String,
    },
    /// Stage that must be fit before it can transform.
    Estimator {
        /// Operation name (e.g. "vectorize").
        operation: String,
    },
    /// The automated model-selection stage.
    ModelSelector {
        /// Validation scheme used to compare candidates.
        validation: ValidationScheme,
        /// Candidate model names.
        #[serde(default)]
        candidates: Vec<String>,
    },
}

impl StageKind {
    /// Creates a transformer kind.
    #[must_use]
    pub fn transformer(operation: impl Into<String>) -> Self {
        Self::Transformer {
            operation: operation.into(),
        }
    }

    /// Creates an estimator kind.
    #[must_use]
    pub fn estimator(operation: impl Into<String>) -> Self {
        Self::Estimator {
            operation: operation.into(),
        }
    }

    /// Creates a model-selector kind with no candidates listed.
    #[must_use]
    pub const fn model_selector(validation: ValidationScheme) -> Self {
        Self::ModelSelector {
            validation,
            candidates: Vec::new(),
        }
    }

    /// Returns true for the distinguished model-selection variant.
    #[must_use]
    pub const fn is_model_selector(&self) -> bool {
        matches!(self, Self::ModelSelector { .. })
    }

    /// Returns true for raw feature generators.
    #[must_use]
    pub const fn is_generator(&self) -> bool {
        matches!(self, Self::Generator)
    }

    /// Returns true if the stage has to be fit before use.
    #[must_use]
    pub const fn requires_fit(&self) -> bool {
        matches!(self, Self::Estimator { .. } | Self::ModelSelector { .. })
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generator => write!(f, "generator"),
            Self::Transformer { operation } => write!(f, "transformer({operation})"),
            Self::Estimator { operation } => write!(f, "estimator({operation})"),
            Self::ModelSelector { .. } => write!(f, "model_selector"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_predicates() {
        let selector = StageKind::model_selector(ValidationScheme::cross_validation(5));
        assert!(selector.is_model_selector());
        assert!(selector.requires_fit());

        let est = StageKind::estimator("vectorize");
        assert!(!est.is_model_selector());
        assert!(est.requires_fit());

        let tr = StageKind::transformer("tokenize");
        assert!(!tr.requires_fit());
        assert!(StageKind::Generator.is_generator());
    }

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Generator.to_string(), "generator");
        assert_eq!(StageKind::transformer("lower").to_string(), "transformer(lower)");
        assert_eq!(
            StageKind::model_selector(ValidationScheme::default()).to_string(),
            "model_selector"
        );
    }

    #[test]
    fn test_validation_scheme_fold_count() {
        assert_eq!(ValidationScheme::cross_validation(5).fold_count(), 5);
        assert_eq!(ValidationScheme::train_validation_split(0.75).fold_count(), 1);
    }

    #[test]
    fn test_stage_kind_serialize() {
        let kind = StageKind::transformer("tokenize");
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "transformer", "operation": "tokenize"}));

        let back: StageKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }
}
