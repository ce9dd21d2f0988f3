//! Tracing integration for planning.

use crate::errors::StageplanError;
use crate::planner::{CutDag, Layer};
use crate::workflow::WorkflowGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Installs a global `tracing` subscriber with the given filter directives
/// (e.g. `"stageplan=debug"`).
///
/// # Errors
///
/// Returns an error if the directives are invalid or a global subscriber is
/// already installed.
pub fn init_tracing(format: LogFormat, filter: &str) -> Result<(), StageplanError> {
    let env_filter = EnvFilter::try_new(filter).map_err(|e| StageplanError::Config(e.to_string()))?;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let installed = match format {
        LogFormat::Plain => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| StageplanError::Config(e.to_string()))
}

/// Span attributes describing one cut.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSpanAttributes {
    /// Workflow name.
    pub workflow: Option<String>,
    /// Graph fingerprint.
    pub fingerprint: Option<String>,
    /// Model selector name.
    pub selector: Option<String>,
    /// Number of compute-once stages.
    pub compute_once_stages: Option<usize>,
    /// Number of per-fold stages.
    pub per_fold_stages: Option<usize>,
    /// Planning duration in milliseconds.
    pub duration_ms: Option<f64>,
}

impl PlanSpanAttributes {
    /// Creates empty attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects attributes from a graph and its cut.
    #[must_use]
    pub fn from_cut(graph: &WorkflowGraph, cut: &CutDag) -> Self {
        let count = |layers: &[Layer]| layers.iter().map(Layer::len).sum::<usize>();
        Self {
            workflow: Some(graph.name().to_string()),
            fingerprint: Some(graph.fingerprint()),
            selector: cut.selector().map(|s| graph.stage_name(s)),
            compute_once_stages: Some(count(cut.compute_once())),
            per_fold_stages: Some(count(cut.per_fold())),
            duration_ms: None,
        }
    }

    /// Sets the duration.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Converts to flat key/value attributes.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(ref v) = self.workflow {
            attrs.insert("plan.workflow".to_string(), v.clone());
        }
        if let Some(ref v) = self.fingerprint {
            attrs.insert("plan.fingerprint".to_string(), v.clone());
        }
        if let Some(ref v) = self.selector {
            attrs.insert("plan.selector".to_string(), v.clone());
        }
        if let Some(v) = self.compute_once_stages {
            attrs.insert("plan.compute_once_stages".to_string(), v.to_string());
        }
        if let Some(v) = self.per_fold_stages {
            attrs.insert("plan.per_fold_stages".to_string(), v.to_string());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("plan.duration_ms".to_string(), v.to_string());
        }

        attrs
    }
}

/// Timer for measuring span duration.
#[derive(Debug)]
pub struct SpanTimer {
    name: String,
    start: Instant,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::planner::DagCutter;
    use crate::testing::fixtures;

    #[test]
    fn test_plan_span_attributes() {
        let (graph, results) = fixtures::feature_then_check();
        let cut = DagCutter::new(&graph).cut(&results).unwrap();
        let attrs = PlanSpanAttributes::from_cut(&graph, &cut).with_duration_ms(1.5);

        let flat = attrs.to_attributes();
        assert_eq!(flat.get("plan.selector"), Some(&"selector".to_string()));
        assert_eq!(flat.get("plan.compute_once_stages"), Some(&"1".to_string()));
        assert_eq!(flat.get("plan.per_fold_stages"), Some(&"1".to_string()));
        assert_eq!(flat.get("plan.duration_ms"), Some(&"1.5".to_string()));
    }

    #[test]
    fn test_empty_attributes() {
        assert!(PlanSpanAttributes::new().to_attributes().is_empty());
    }

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("cut");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert_eq!(timer.name(), "cut");
        assert!(timer.finish() >= 10.0);
    }

    #[test]
    fn test_invalid_filter() {
        let err = init_tracing(LogFormat::Plain, "stageplan=loud").unwrap_err();
        assert!(matches!(err, StageplanError::Config(_)));
    }
}
