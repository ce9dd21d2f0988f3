//! Planner facade combining cutting, caching and reporting.

use super::{CutDag, DagCutter, PlanCache, PlanKey, PlannerConfig};
use crate::core::FeatureId;
use crate::errors::PlanError;
use crate::observability::{PlanReport, PlanSpanAttributes, SpanTimer};
use crate::workflow::WorkflowGraph;
use std::sync::Arc;
use tracing::{debug, error};

/// Entry point for execution engines.
///
/// A planner holds no per-workflow state besides its optional cache and can
/// be shared across threads.
#[derive(Debug, Default)]
pub struct Planner {
    config: PlannerConfig,
    cache: PlanCache,
}

impl Planner {
    /// Creates a planner.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            cache: PlanCache::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Returns the plan cache.
    #[must_use]
    pub const fn cache(&self) -> &PlanCache {
        &self.cache
    }

    /// Cuts the DAG behind `results`, consulting the cache when enabled.
    ///
    /// # Errors
    ///
    /// Returns the cutter's error; failed cuts are never cached.
    pub fn plan(&self, graph: &WorkflowGraph, results: &[FeatureId]) -> Result<Arc<CutDag>, PlanError> {
        self.plan_with_attributes(graph, results).map(|(cut, _)| cut)
    }

    /// Like [`Planner::plan`], also returning the span attributes of the cut,
    /// timing included.
    ///
    /// # Errors
    ///
    /// Returns the cutter's error; failed cuts are never cached.
    pub fn plan_with_attributes(
        &self,
        graph: &WorkflowGraph,
        results: &[FeatureId],
    ) -> Result<(Arc<CutDag>, PlanSpanAttributes), PlanError> {
        let timer = SpanTimer::start("plan");
        let key = self.config.cache_plans.then(|| PlanKey::new(graph, results));

        let (cut, cached) = match key.as_ref().and_then(|k| self.cache.get(k)) {
            Some(cached) => (cached, true),
            None => {
                let cut = DagCutter::with_config(graph, self.config.clone())
                    .cut(results)
                    .map_err(|err| {
                        error!(
                            workflow = graph.name(),
                            code = %err.error_info().code,
                            error = %err,
                            duration_ms = timer.elapsed_ms(),
                            "Failed to plan workflow"
                        );
                        err
                    })?;
                let cut = Arc::new(cut);
                if let Some(key) = key {
                    self.cache.insert(key, Arc::clone(&cut));
                }
                (cut, false)
            }
        };

        let attributes = PlanSpanAttributes::from_cut(graph, &cut).with_duration_ms(timer.finish());
        debug!(
            cached,
            attributes = ?attributes.to_attributes(),
            "Planned workflow"
        );
        Ok((cut, attributes))
    }

    /// Plans `results` and renders the cut with stage names.
    ///
    /// # Errors
    ///
    /// Returns the cutter's error.
    pub fn report(&self, graph: &WorkflowGraph, results: &[FeatureId]) -> Result<PlanReport, PlanError> {
        let cut = self.plan(graph, results)?;
        Ok(PlanReport::new(graph, &cut))
    }
}
