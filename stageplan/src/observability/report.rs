//! Serializable, name-resolved view of a cut.

use crate::planner::{CutDag, Layer};
use crate::workflow::WorkflowGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A layer with stage names instead of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerReport {
    /// Shared distance of the layer.
    pub distance: usize,
    /// Stage names, in insertion order.
    pub stages: Vec<String>,
}

/// Summary of a cut handed to execution engines and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    /// Unique id of this report.
    pub plan_id: Uuid,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    /// Workflow name.
    pub workflow: String,
    /// Graph fingerprint.
    pub fingerprint: String,
    /// Name of the model selector, if any.
    pub model_selector: Option<String>,
    /// Fold-invariant layers.
    pub compute_once: Vec<LayerReport>,
    /// Layers recomputed per fold.
    pub per_fold: Vec<LayerReport>,
    /// Layers after the selector.
    pub after_selector: Vec<LayerReport>,
}

impl PlanReport {
    /// Resolves a cut against its graph.
    #[must_use]
    pub fn new(graph: &WorkflowGraph, cut: &CutDag) -> Self {
        let layers = |layers: &[Layer]| {
            layers
                .iter()
                .map(|layer| LayerReport {
                    distance: layer.distance(),
                    stages: layer.stages().iter().map(|s| graph.stage_name(*s)).collect(),
                })
                .collect::<Vec<_>>()
        };

        Self {
            plan_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            workflow: graph.name().to_string(),
            fingerprint: graph.fingerprint(),
            model_selector: cut.selector().map(|s| graph.stage_name(s)),
            compute_once: layers(cut.compute_once()),
            per_fold: layers(cut.per_fold()),
            after_selector: layers(cut.after_selector()),
        }
    }

    /// Renders the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
