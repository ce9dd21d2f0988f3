//! DAG Cutter: splits the stages feeding the model selector into a
//! compute-once group and a per-fold group.

use super::{FoldGroup, GraphBuilder, Layer, LineageAnalyzer, PlannerConfig, StageDag};
use crate::core::{FeatureId, StageId};
use crate::errors::PlanError;
use crate::workflow::WorkflowGraph;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

/// The model-selection stage located by a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectorRef {
    /// The selector stage.
    pub stage: StageId,
    /// Its distance in the DAG of the requested features.
    pub distance: usize,
}

/// Result of cutting a workflow DAG around its model selector.
///
/// Every stage in `compute_once` and `per_fold` is a proper ancestor of the
/// selector and appears in exactly one of them. Distances in those groups
/// count stage hops to the selector, which itself sits at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CutDag {
    model_selector: Option<SelectorRef>,
    compute_once: Vec<Layer>,
    per_fold: Vec<Layer>,
    after_selector: Vec<Layer>,
}

impl CutDag {
    /// A cut without a model selector: nothing to optimise around.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            model_selector: None,
            compute_once: Vec::new(),
            per_fold: Vec::new(),
            after_selector: Vec::new(),
        }
    }

    #[cfg(test)]
    pub(crate) const fn from_parts(
        model_selector: Option<SelectorRef>,
        compute_once: Vec<Layer>,
        per_fold: Vec<Layer>,
        after_selector: Vec<Layer>,
    ) -> Self {
        Self {
            model_selector,
            compute_once,
            per_fold,
            after_selector,
        }
    }

    /// Returns the located model selector.
    #[must_use]
    pub const fn model_selector(&self) -> Option<SelectorRef> {
        self.model_selector
    }

    /// Returns the selector stage id.
    #[must_use]
    pub fn selector(&self) -> Option<StageId> {
        self.model_selector.map(|s| s.stage)
    }

    /// Layers of fold-invariant ancestors, most upstream first.
    #[must_use]
    pub fn compute_once(&self) -> &[Layer] {
        &self.compute_once
    }

    /// Layers of ancestors recomputed inside every fold, most upstream first.
    #[must_use]
    pub fn per_fold(&self) -> &[Layer] {
        &self.per_fold
    }

    /// Layers of stages consuming the selector's output, with distances to
    /// the requested features.
    #[must_use]
    pub fn after_selector(&self) -> &[Layer] {
        &self.after_selector
    }

    /// Returns the group of an ancestor stage of the selector.
    #[must_use]
    pub fn group_of(&self, stage: StageId) -> Option<FoldGroup> {
        if self.per_fold.iter().any(|l| l.contains(stage)) {
            Some(FoldGroup::PerFold)
        } else if self.compute_once.iter().any(|l| l.contains(stage)) {
            Some(FoldGroup::ComputeOnce)
        } else {
            None
        }
    }

    /// Returns true if no selector was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.model_selector.is_none()
    }

    /// Consumes the cut into `(selector, compute_once, per_fold)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<StageId>, Vec<Layer>, Vec<Layer>) {
        (
            self.model_selector.map(|s| s.stage),
            self.compute_once,
            self.per_fold,
        )
    }
}

/// Locates the model selector and classifies its ancestors.
#[derive(Debug)]
pub struct DagCutter<'g> {
    builder: GraphBuilder<'g>,
    config: PlannerConfig,
}

impl<'g> DagCutter<'g> {
    /// Creates a cutter with the default configuration.
    #[must_use]
    pub fn new(graph: &'g WorkflowGraph) -> Self {
        Self::with_config(graph, PlannerConfig::default())
    }

    /// Creates a cutter with an explicit configuration.
    #[must_use]
    pub fn with_config(graph: &'g WorkflowGraph, config: PlannerConfig) -> Self {
        Self {
            builder: GraphBuilder::new(graph),
            config,
        }
    }

    /// Cuts the DAG behind `result_features` around the model selector.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::MultipleModelSelectors`] if more than one
    /// selector feeds the requested features, or a wrapped graph error.
    pub fn cut(&self, result_features: &[FeatureId]) -> Result<CutDag, PlanError> {
        let graph = self.builder.graph();
        let span = tracing::debug_span!(
            "cut_dag",
            workflow = graph.name(),
            fingerprint = %graph.fingerprint()
        );
        let _guard = span.enter();

        let dag = self.builder.compute_dag(result_features)?;

        let mut selectors: Vec<StageId> = dag
            .stages()
            .map(|(stage, _)| stage)
            .filter(|stage| graph.stage_at(*stage).is_model_selector())
            .collect();
        selectors.sort_unstable();

        let selector = match selectors.as_slice() {
            [] => {
                debug!(stages = dag.stage_count(), "No model selector, nothing to cut");
                return Ok(CutDag::empty());
            }
            [single] => *single,
            many => {
                return Err(PlanError::MultipleModelSelectors(
                    many.iter().map(|s| graph.stage_name(*s)).collect(),
                ));
            }
        };
        let selector_ref = SelectorRef {
            stage: selector,
            distance: dag.distance_of(selector).unwrap_or(0),
        };

        // Re-root at the selector: drops branches that never reach it.
        let ancestors = self
            .builder
            .compute_dag(graph.stage_at(selector).outputs())?
            .retain(|stage| stage != selector);

        let mut lineage = LineageAnalyzer::new(graph);
        let (per_fold, compute_once) =
            ancestors.partition(|stage| lineage.classify(stage) == FoldGroup::PerFold);

        let after_selector = if self.config.plan_after_selector {
            let downstream = self.descendants_of(selector);
            dag.retain(|stage| downstream.contains(&stage))
        } else {
            StageDag::empty()
        };

        let cut = CutDag {
            model_selector: Some(selector_ref),
            compute_once: compute_once.into_layers(),
            per_fold: per_fold.into_layers(),
            after_selector: after_selector.into_layers(),
        };
        self.log_summary(&dag, &cut);
        Ok(cut)
    }

    /// Stages reachable forward from the selector's outputs.
    fn descendants_of(&self, selector: StageId) -> HashSet<StageId> {
        let graph = self.builder.graph();
        let consumers = self.builder.consumers();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<StageId> = VecDeque::from([selector]);

        while let Some(stage) = queue.pop_front() {
            for &output in graph.stage_at(stage).outputs() {
                for &consumer in consumers.consumers_of(output) {
                    if seen.insert(consumer) {
                        queue.push_back(consumer);
                    }
                }
            }
        }
        seen
    }

    fn log_summary(&self, dag: &StageDag, cut: &CutDag) {
        let graph = self.builder.graph();
        let selector = cut.selector().map(|s| graph.stage_name(s)).unwrap_or_default();
        let compute_once: usize = cut.compute_once.iter().map(Layer::len).sum();
        let per_fold: usize = cut.per_fold.iter().map(Layer::len).sum();
        let after: usize = cut.after_selector.iter().map(Layer::len).sum();
        let pruned = dag
            .stage_count()
            .saturating_sub(1 + compute_once + per_fold + after);

        if self.config.log_summary {
            info!(%selector, compute_once, per_fold, after, pruned, "Cut workflow DAG");
        } else {
            debug!(%selector, compute_once, per_fold, after, pruned, "Cut workflow DAG");
        }
    }
}
