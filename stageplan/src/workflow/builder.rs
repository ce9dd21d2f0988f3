//! Workflow builder with validation.

use super::{FeatureSpec, StageSpec, WorkflowGraph, WorkflowSpec};
use crate::core::{Feature, FeatureId, Stage, StageId, StageKind};
use crate::errors::{codes, WorkflowValidationError};
use std::collections::HashMap;

/// A stage whose input names are not resolved yet.
#[derive(Debug, Clone)]
struct PendingStage {
    name: String,
    kind: StageKind,
    inputs: Vec<String>,
    outputs: Vec<FeatureId>,
}

/// Builder for creating validated workflow graphs.
///
/// Stages may consume features declared after them; names are resolved in
/// [`build`](Self::build). Dependency cycles are not rejected here, they are
/// reported by the planner.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    /// The workflow name.
    name: String,
    /// Stages in insertion order.
    stages: Vec<PendingStage>,
    /// Features in declaration order.
    features: Vec<Feature>,
    stage_names: HashMap<String, StageId>,
    feature_names: HashMap<String, FeatureId>,
}

impl WorkflowBuilder {
    /// Creates a new workflow builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            features: Vec::new(),
            stage_names: HashMap::new(),
            feature_names: HashMap::new(),
        }
    }

    /// Creates a builder populated from a workflow definition.
    ///
    /// Raw features are declared first, then stages in definition order.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn from_spec(spec: WorkflowSpec) -> Result<Self, WorkflowValidationError> {
        let mut builder = Self::new(spec.name);
        for feature in spec.raw_features {
            builder.add_raw_feature(feature)?;
        }
        for stage in spec.stages {
            builder.add_stage_spec(stage)?;
        }
        Ok(builder)
    }

    /// Declares a raw feature together with its generator stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or already taken.
    pub fn raw_feature(mut self, feature: FeatureSpec) -> Result<Self, WorkflowValidationError> {
        self.add_raw_feature(feature)?;
        Ok(self)
    }

    /// Adds a stage to the workflow.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (blank name, duplicate stage or
    /// output feature, no outputs).
    pub fn stage(mut self, spec: StageSpec) -> Result<Self, WorkflowValidationError> {
        self.add_stage_spec(spec)?;
        Ok(self)
    }

    /// Declares a raw feature in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or already taken.
    pub fn add_raw_feature(&mut self, feature: FeatureSpec) -> Result<FeatureId, WorkflowValidationError> {
        feature.validate()?;
        let generator = StageSpec::new(format!("{}_generator", feature.name), StageKind::Generator)
            .with_output(feature);
        let outputs = self.add_stage_spec(generator)?;
        Ok(outputs[0])
    }

    /// Adds a stage in place and returns the ids of its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn add_stage_spec(&mut self, spec: StageSpec) -> Result<Vec<FeatureId>, WorkflowValidationError> {
        spec.validate()?;

        if self.stage_names.contains_key(&spec.name) {
            return Err(WorkflowValidationError::new(
                codes::DUPLICATE_STAGE,
                format!("Stage '{}' is declared more than once", spec.name),
            )
            .with_stages(vec![spec.name.clone()]));
        }

        let stage_id = StageId(self.stages.len());
        for (position, output) in spec.outputs.iter().enumerate() {
            let clashes_existing = self.feature_names.get(&output.name).map(|id| {
                let producer = self.features[id.0].producer;
                self.stages[producer.0].name.clone()
            });
            let clashes_sibling = spec.outputs[..position].iter().any(|o| o.name == output.name);

            if clashes_existing.is_some() || clashes_sibling {
                let mut stages = vec![spec.name.clone()];
                stages.extend(clashes_existing);
                return Err(WorkflowValidationError::new(
                    codes::DUPLICATE_FEATURE,
                    format!("Feature '{}' is produced by more than one stage", output.name),
                )
                .with_stages(stages)
                .with_context_entry("feature", output.name.clone()));
            }
        }

        let mut outputs = Vec::with_capacity(spec.outputs.len());
        for output in spec.outputs {
            let id = FeatureId(self.features.len());
            self.feature_names.insert(output.name.clone(), id);
            self.features.push(Feature {
                id,
                name: output.name,
                value_type: output.value_type,
                is_response: output.is_response,
                producer: stage_id,
            });
            outputs.push(id);
        }

        self.stage_names.insert(spec.name.clone(), stage_id);
        self.stages.push(PendingStage {
            name: spec.name,
            kind: spec.kind,
            inputs: spec.inputs,
            outputs: outputs.clone(),
        });

        Ok(outputs)
    }

    /// Builds the immutable workflow graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow has no features or a stage reads an
    /// undeclared feature.
    pub fn build(self) -> Result<WorkflowGraph, WorkflowValidationError> {
        if self.features.is_empty() {
            return Err(WorkflowValidationError::new(
                codes::EMPTY,
                format!("Workflow '{}' declares no features", self.name),
            ));
        }

        let mut stages = Vec::with_capacity(self.stages.len());
        for (index, pending) in self.stages.into_iter().enumerate() {
            let mut inputs = Vec::with_capacity(pending.inputs.len());
            for input in &pending.inputs {
                let id = self.feature_names.get(input).copied().ok_or_else(|| {
                    WorkflowValidationError::new(
                        codes::MISSING_FEATURE,
                        format!("Stage '{}' reads unknown feature '{}'", pending.name, input),
                    )
                    .with_stages(vec![pending.name.clone()])
                    .with_context_entry("feature", input.clone())
                })?;
                inputs.push(id);
            }
            stages.push(Stage {
                id: StageId(index),
                name: pending.name,
                inputs,
                outputs: pending.outputs,
                kind: pending.kind,
            });
        }

        Ok(WorkflowGraph::new(self.name, stages, self.features))
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages, generators included.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::{FeatureType, ValidationScheme};

    fn with_raw() -> WorkflowBuilder {
        WorkflowBuilder::new("test")
            .raw_feature(FeatureSpec::predictor("age", FeatureType::Real))
            .unwrap()
            .raw_feature(FeatureSpec::response("label", FeatureType::RealNN))
            .unwrap()
    }

    #[test]
    fn test_builder_creation() {
        let builder = WorkflowBuilder::new("test");
        assert_eq!(builder.name(), "test");
        assert_eq!(builder.stage_count(), 0);
    }

    #[test]
    fn test_raw_feature_creates_generator() {
        let graph = with_raw().build().unwrap();
        let generator = graph.stage_by_name("age_generator").unwrap();

        assert!(generator.is_generator());
        assert!(generator.inputs().is_empty());
        assert_eq!(graph.feature(generator.outputs()[0]).unwrap().name(), "age");
        assert!(graph.feature_by_name("label").unwrap().is_response());
    }

    #[test]
    fn test_builder_with_stages() {
        let graph = with_raw()
            .stage(
                StageSpec::model_selector("selector", ValidationScheme::cross_validation(3))
                    .with_inputs(["label", "age"])
                    .with_output(FeatureSpec::predictor("prediction", FeatureType::Prediction)),
            )
            .unwrap()
            .build()
            .unwrap();

        let selector = graph.stage_by_name("selector").unwrap();
        assert_eq!(selector.id(), StageId(2));
        assert_eq!(selector.inputs().len(), 2);
        assert_eq!(graph.model_selectors().count(), 1);
    }

    #[test]
    fn test_forward_reference_resolved_at_build() {
        let graph = with_raw()
            .stage(
                StageSpec::transformer("late_reader", "identity")
                    .with_input("derived")
                    .with_output(FeatureSpec::predictor("copy", FeatureType::Real)),
            )
            .unwrap()
            .stage(
                StageSpec::transformer("producer", "square")
                    .with_input("age")
                    .with_output(FeatureSpec::predictor("derived", FeatureType::Real)),
            )
            .unwrap()
            .build()
            .unwrap();

        let reader = graph.stage_by_name("late_reader").unwrap();
        assert_eq!(graph.feature(reader.inputs()[0]).unwrap().name(), "derived");
    }

    #[test]
    fn test_builder_missing_feature() {
        let err = with_raw()
            .stage(
                StageSpec::transformer("t", "op")
                    .with_input("missing")
                    .with_output(FeatureSpec::predictor("out", FeatureType::Real)),
            )
            .unwrap()
            .build()
            .unwrap_err();

        assert_eq!(err.code(), codes::MISSING_FEATURE);
        assert_eq!(err.error_info.context.get("feature"), Some(&"missing".to_string()));
    }

    #[test]
    fn test_builder_duplicate_stage() {
        let spec = StageSpec::transformer("t", "op")
            .with_input("age")
            .with_output(FeatureSpec::predictor("out", FeatureType::Real));
        let err = with_raw()
            .stage(spec.clone())
            .unwrap()
            .stage(spec.with_output(FeatureSpec::predictor("other", FeatureType::Real)))
            .unwrap_err();

        assert_eq!(err.code(), codes::DUPLICATE_STAGE);
    }

    #[test]
    fn test_builder_duplicate_feature() {
        let err = with_raw()
            .stage(
                StageSpec::transformer("t", "op")
                    .with_input("age")
                    .with_output(FeatureSpec::predictor("label", FeatureType::Real)),
            )
            .unwrap_err();

        assert_eq!(err.code(), codes::DUPLICATE_FEATURE);
        assert_eq!(err.stages, vec!["t".to_string(), "label_generator".to_string()]);

        let sibling = with_raw()
            .stage(
                StageSpec::transformer("t", "op")
                    .with_input("age")
                    .with_output(FeatureSpec::predictor("x", FeatureType::Real))
                    .with_output(FeatureSpec::predictor("x", FeatureType::Real)),
            )
            .unwrap_err();
        assert_eq!(sibling.code(), codes::DUPLICATE_FEATURE);
    }

    #[test]
    fn test_builder_empty_build() {
        let err = WorkflowBuilder::new("test").build().unwrap_err();
        assert_eq!(err.code(), codes::EMPTY);
    }

    #[test]
    fn test_builder_from_spec() {
        let spec = WorkflowSpec {
            name: "from-spec".to_string(),
            raw_features: vec![FeatureSpec::predictor("x", FeatureType::Real)],
            stages: vec![StageSpec::transformer("double", "scale")
                .with_input("x")
                .with_output(FeatureSpec::predictor("x2", FeatureType::Real))],
        };

        let graph = WorkflowBuilder::from_spec(spec).unwrap().build().unwrap();
        assert_eq!(graph.name(), "from-spec");
        assert_eq!(graph.stage_count(), 2);
    }
}
