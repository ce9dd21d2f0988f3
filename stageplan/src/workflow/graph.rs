//! Immutable workflow graph snapshot.

use crate::core::{Feature, FeatureId, Stage, StageId};
use serde::Serialize;
use std::collections::HashMap;

/// A fully constructed, immutable stage/feature graph.
///
/// All planning state is derived from a snapshot per call, so a graph can be
/// shared across threads and planned concurrently.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowGraph {
    name: String,
    stages: Vec<Stage>,
    features: Vec<Feature>,
    #[serde(skip)]
    stage_names: HashMap<String, StageId>,
    #[serde(skip)]
    feature_names: HashMap<String, FeatureId>,
}

impl WorkflowGraph {
    pub(crate) fn new(name: String, stages: Vec<Stage>, features: Vec<Feature>) -> Self {
        let stage_names = stages.iter().map(|s| (s.name.clone(), s.id)).collect();
        let feature_names = features.iter().map(|f| (f.name.clone(), f.id)).collect();
        Self {
            name,
            stages,
            features,
            stage_names,
            feature_names,
        }
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all stages in insertion order, generators included.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns all features in declaration order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Returns the number of features.
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.get(id.0)
    }

    /// Looks up a feature by id.
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id.0)
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.stage_names.get(name).map(|id| &self.stages[id.0])
    }

    /// Looks up a feature by name.
    #[must_use]
    pub fn feature_by_name(&self, name: &str) -> Option<&Feature> {
        self.feature_names.get(name).map(|id| &self.features[id.0])
    }

    /// Resolves feature names to ids, skipping unknown names.
    #[must_use]
    pub fn feature_ids<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Vec<FeatureId> {
        names
            .into_iter()
            .filter_map(|name| self.feature_names.get(name).copied())
            .collect()
    }

    /// Returns the stage that produces the given feature.
    #[must_use]
    pub fn producer_of(&self, feature: FeatureId) -> Option<&Stage> {
        self.feature(feature).and_then(|f| self.stage(f.producer))
    }

    /// Returns the name of a stage, or its id when the stage is unknown.
    #[must_use]
    pub fn stage_name(&self, id: StageId) -> String {
        self.stage(id)
            .map_or_else(|| id.to_string(), |s| s.name.clone())
    }

    /// Returns the raw features (outputs of generator stages).
    pub fn raw_features(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features
            .iter()
            .filter(|f| self.stages[f.producer.0].is_generator())
    }

    /// Returns all model-selection stages in insertion order.
    pub fn model_selectors(&self) -> impl Iterator<Item = &Stage> + '_ {
        self.stages.iter().filter(|s| s.is_model_selector())
    }

    /// Builds the derived feature-to-consumer index.
    #[must_use]
    pub fn consumer_index(&self) -> ConsumerIndex {
        ConsumerIndex::build(self)
    }

    /// Returns a stable content hash of the graph.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        super::fingerprint(self)
    }

    pub(crate) fn stage_at(&self, id: StageId) -> &Stage {
        &self.stages[id.0]
    }

    pub(crate) fn feature_at(&self, id: FeatureId) -> &Feature {
        &self.features[id.0]
    }
}

/// Derived mapping from each feature to the stages that read it.
///
/// Built once per planning call from the forward input declarations; never
/// stored on the features themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerIndex {
    consumers: Vec<Vec<StageId>>,
}

impl ConsumerIndex {
    /// Builds the index for a graph. Consumers are listed in insertion order,
    /// each at most once per feature.
    #[must_use]
    pub fn build(graph: &WorkflowGraph) -> Self {
        let mut consumers = vec![Vec::new(); graph.feature_count()];
        for stage in graph.stages() {
            for input in &stage.inputs {
                let entry: &mut Vec<StageId> = &mut consumers[input.0];
                if entry.last() != Some(&stage.id) {
                    entry.push(stage.id);
                }
            }
        }
        Self { consumers }
    }

    /// Returns the stages that read a feature.
    #[must_use]
    pub fn consumers_of(&self, feature: FeatureId) -> &[StageId] {
        self.consumers.get(feature.0).map_or(&[], Vec::as_slice)
    }
}
