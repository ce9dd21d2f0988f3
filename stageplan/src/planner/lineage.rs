//! Feature-lineage analysis deciding which stages depend on labels.

use crate::core::{Feature, StageId};
use crate::workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kinds of features found in the transitive lineage of a stage's inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Lineage {
    /// A response feature is reachable backward from the inputs.
    pub has_response: bool,
    /// A non-response feature is reachable backward from the inputs.
    pub has_predictor: bool,
}

impl Lineage {
    fn of_feature(feature: &Feature) -> Self {
        Self {
            has_response: feature.is_response(),
            has_predictor: !feature.is_response(),
        }
    }

    const fn merge(self, other: Self) -> Self {
        Self {
            has_response: self.has_response || other.has_response,
            has_predictor: self.has_predictor || other.has_predictor,
        }
    }

    /// Returns true if labels and predictors are combined.
    #[must_use]
    pub const fn is_mixed(self) -> bool {
        self.has_response && self.has_predictor
    }
}

/// Scheduling group of a stage that feeds the model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldGroup {
    /// Output is identical across folds; computed once.
    ComputeOnce,
    /// Output depends jointly on labels and predictors; recomputed per fold.
    PerFold,
}

impl fmt::Display for FoldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComputeOnce => write!(f, "compute_once"),
            Self::PerFold => write!(f, "per_fold"),
        }
    }
}

/// Memoising lineage walker over one workflow graph.
///
/// Walks stop at raw features (outputs of generators).
#[derive(Debug)]
pub struct LineageAnalyzer<'g> {
    graph: &'g WorkflowGraph,
    memo: HashMap<StageId, Lineage>,
}

impl<'g> LineageAnalyzer<'g> {
    /// Creates an analyzer with an empty memo.
    #[must_use]
    pub fn new(graph: &'g WorkflowGraph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
        }
    }

    /// Returns the lineage of everything reachable backward from the
    /// stage's inputs, the inputs themselves included.
    ///
    /// Producers are resolved with an explicit frame stack of
    /// `(stage, next_input, lineage_so_far)`, so deep chains do not grow the
    /// call stack.
    pub fn stage_lineage(&mut self, stage: StageId) -> Lineage {
        if let Some(lineage) = self.memo.get(&stage) {
            return *lineage;
        }
        let graph = self.graph;
        // Placeholders keep malformed (cyclic) graphs from looping forever.
        self.memo.insert(stage, Lineage::default());
        let mut frames: Vec<(StageId, usize, Lineage)> = vec![(stage, 0, Lineage::default())];

        while let Some(frame) = frames.last_mut() {
            let (current, next, _) = *frame;
            let Some(&input) = graph.stage_at(current).inputs().get(next) else {
                if let Some((done, _, lineage)) = frames.pop() {
                    self.memo.insert(done, lineage);
                    if let Some(parent) = frames.last_mut() {
                        parent.2 = parent.2.merge(lineage);
                    }
                }
                continue;
            };
            frame.1 += 1;

            let feature = graph.feature_at(input);
            frame.2 = frame.2.merge(Lineage::of_feature(feature));
            let producer = feature.producer();
            if graph.stage_at(producer).is_generator() {
                continue;
            }
            match self.memo.get(&producer).copied() {
                Some(upstream) => frame.2 = frame.2.merge(upstream),
                None => {
                    self.memo.insert(producer, Lineage::default());
                    frames.push((producer, 0, Lineage::default()));
                }
            }
        }

        self.memo.get(&stage).copied().unwrap_or_default()
    }

    /// Classifies a stage into its fold group.
    pub fn classify(&mut self, stage: StageId) -> FoldGroup {
        if self.stage_lineage(stage).is_mixed() {
            FoldGroup::PerFold
        } else {
            FoldGroup::ComputeOnce
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::FeatureType;
    use crate::workflow::{FeatureSpec, StageSpec, WorkflowBuilder};

    fn graph() -> WorkflowGraph {
        WorkflowBuilder::new("lineage")
            .raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap()
            .raw_feature(FeatureSpec::response("y", FeatureType::RealNN))
            .unwrap()
            .stage(
                StageSpec::transformer("label_only", "index")
                    .with_input("y")
                    .with_output(FeatureSpec::response("y_idx", FeatureType::RealNN)),
            )
            .unwrap()
            .stage(
                StageSpec::estimator("sanity", "checker")
                    .with_inputs(["y_idx", "x"])
                    .with_output(FeatureSpec::predictor("checked", FeatureType::Vector)),
            )
            .unwrap()
            .stage(
                StageSpec::transformer("downstream", "scale")
                    .with_input("checked")
                    .with_output(FeatureSpec::predictor("scaled", FeatureType::Vector)),
            )
            .unwrap()
            .stage(
                StageSpec::transformer("constant", "zeros")
                    .with_output(FeatureSpec::predictor("zeros", FeatureType::Vector)),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn id(graph: &WorkflowGraph, name: &str) -> StageId {
        graph.stage_by_name(name).unwrap().id()
    }

    #[test]
    fn test_label_only_stage_is_compute_once() {
        let graph = graph();
        let mut analyzer = LineageAnalyzer::new(&graph);
        let lineage = analyzer.stage_lineage(id(&graph, "label_only"));

        assert!(lineage.has_response);
        assert!(!lineage.has_predictor);
        assert_eq!(analyzer.classify(id(&graph, "label_only")), FoldGroup::ComputeOnce);
    }

    #[test]
    fn test_mixed_inputs_are_per_fold() {
        let graph = graph();
        let mut analyzer = LineageAnalyzer::new(&graph);
        assert_eq!(analyzer.classify(id(&graph, "sanity")), FoldGroup::PerFold);
    }

    #[test]
    fn test_mixedness_flows_through_lineage() {
        let graph = graph();
        let mut analyzer = LineageAnalyzer::new(&graph);
        // Only reads a predictor, but that predictor was derived from a label.
        assert_eq!(analyzer.classify(id(&graph, "downstream")), FoldGroup::PerFold);
    }

    #[test]
    fn test_source_stage_is_compute_once() {
        let graph = graph();
        let mut analyzer = LineageAnalyzer::new(&graph);
        assert_eq!(analyzer.stage_lineage(id(&graph, "constant")), Lineage::default());
        assert_eq!(analyzer.classify(id(&graph, "constant")), FoldGroup::ComputeOnce);
    }

    #[test]
    fn test_deep_lineage_resolves_iteratively() {
        let mut builder = WorkflowBuilder::new("deep");
        builder
            .add_raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap();
        builder
            .add_raw_feature(FeatureSpec::response("y", FeatureType::RealNN))
            .unwrap();
        builder
            .add_stage_spec(
                StageSpec::estimator("mix", "join")
                    .with_inputs(["x", "y"])
                    .with_output(FeatureSpec::predictor("f0", FeatureType::Real)),
            )
            .unwrap();
        for i in 1..=15_000 {
            builder
                .add_stage_spec(
                    StageSpec::transformer(format!("t{i}"), "scale")
                        .with_input(format!("f{}", i - 1))
                        .with_output(FeatureSpec::predictor(format!("f{i}"), FeatureType::Real)),
                )
                .unwrap();
        }
        let graph = builder.build().unwrap();

        // Deepest stage first, so nothing upstream is memoised yet.
        let mut analyzer = LineageAnalyzer::new(&graph);
        assert_eq!(analyzer.classify(id(&graph, "t15000")), FoldGroup::PerFold);
        assert_eq!(analyzer.classify(id(&graph, "t1")), FoldGroup::PerFold);
        assert_eq!(analyzer.classify(id(&graph, "mix")), FoldGroup::PerFold);
    }

    #[test]
    fn test_fold_group_display() {
        assert_eq!(FoldGroup::PerFold.to_string(), "per_fold");
        assert_eq!(serde_json::to_string(&FoldGroup::ComputeOnce).unwrap(), r#""compute_once""#);
    }
}
