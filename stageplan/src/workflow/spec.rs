//! Feature, stage and workflow specifications.

use crate::core::{FeatureType, StageKind, ValidationScheme};
use crate::errors::{codes, WorkflowValidationError};
use serde::{Deserialize, Serialize};

/// Declaration of a feature before it is placed into a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// The unique feature name.
    pub name: String,
    /// The declared value type.
    #[serde(default)]
    pub value_type: FeatureType,
    /// Whether the feature is a label.
    #[serde(default)]
    pub is_response: bool,
}

impl FeatureSpec {
    /// Declares an ordinary predictor feature.
    #[must_use]
    pub fn predictor(name: impl Into<String>, value_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_response: false,
        }
    }

    /// Declares a response (label) feature.
    #[must_use]
    pub fn response(name: impl Into<String>, value_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_response: true,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), WorkflowValidationError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowValidationError::new(
                codes::EMPTY_NAME,
                "Feature name cannot be empty or whitespace-only",
            ));
        }
        Ok(())
    }
}

/// Specification for a single stage in a workflow.
///
/// Inputs are feature names and may refer to features declared later;
/// they are resolved when the workflow is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// The unique name of the stage.
    pub name: String,
    /// The kind of stage.
    #[serde(flatten)]
    pub kind: StageKind,
    /// Names of the features this stage reads.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Features this stage produces.
    #[serde(default)]
    pub outputs: Vec<FeatureSpec>,
}

impl StageSpec {
    /// Creates a new stage specification.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Creates a transformer stage.
    #[must_use]
    pub fn transformer(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(name, StageKind::transformer(operation))
    }

    /// Creates an estimator stage.
    #[must_use]
    pub fn estimator(name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(name, StageKind::estimator(operation))
    }

    /// Creates a model-selector stage.
    #[must_use]
    pub fn model_selector(name: impl Into<String>, validation: ValidationScheme) -> Self {
        Self::new(name, StageKind::model_selector(validation))
    }

    /// Adds an input feature.
    #[must_use]
    pub fn with_input(mut self, feature: impl Into<String>) -> Self {
        self.inputs.push(feature.into());
        self
    }

    /// Adds several input features.
    #[must_use]
    pub fn with_inputs(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.inputs.extend(features.into_iter().map(Into::into));
        self
    }

    /// Adds an output feature.
    #[must_use]
    pub fn with_output(mut self, feature: FeatureSpec) -> Self {
        self.outputs.push(feature);
        self
    }

    /// Sets the candidate models of a model selector. Ignored for other kinds.
    #[must_use]
    pub fn with_candidates(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        if let StageKind::ModelSelector { candidates, .. } = &mut self.kind {
            *candidates = models.into_iter().map(Into::into).collect();
        }
        self
    }

    /// Validates the stage specification in isolation.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, the stage has no outputs, or a
    /// generator declares inputs.
    pub fn validate(&self) -> Result<(), WorkflowValidationError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowValidationError::new(
                codes::EMPTY_NAME,
                "Stage name cannot be empty or whitespace-only",
            ));
        }
        if self.outputs.is_empty() {
            return Err(WorkflowValidationError::new(
                codes::NO_OUTPUT,
                format!("Stage '{}' declares no outputs", self.name),
            )
            .with_stages(vec![self.name.clone()]));
        }
        if self.kind.is_generator() && !self.inputs.is_empty() {
            return Err(WorkflowValidationError::new(
                codes::GENERATOR_INPUT,
                format!("Generator stage '{}' cannot declare inputs", self.name),
            )
            .with_stages(vec![self.name.clone()]));
        }
        for output in &self.outputs {
            output.validate()?;
        }
        Ok(())
    }
}

/// A complete workflow definition, as handed over by a configuration loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSpec {
    /// The workflow name.
    pub name: String,
    /// Raw features read from the data source.
    #[serde(default)]
    pub raw_features: Vec<FeatureSpec>,
    /// Stages in definition order.
    #[serde(default)]
    pub stages: Vec<StageSpec>,
}

impl WorkflowSpec {
    /// Parses a workflow definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a workflow.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
