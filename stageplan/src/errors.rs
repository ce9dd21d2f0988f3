//! Error types for the stageplan crate.
//!
//! Workflow assembly, graph construction and DAG cutting each have their own
//! error type; [`StageplanError`] aggregates them for callers that do not
//! care which phase failed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for stageplan operations.
#[derive(Debug, Error)]
pub enum StageplanError {
    /// The workflow definition is invalid.
    #[error("{0}")]
    Validation(#[from] WorkflowValidationError),

    /// The stage graph could not be built.
    #[error("{0}")]
    Graph(#[from] GraphError),

    /// The DAG could not be cut around the model selector.
    #[error("{0}")]
    Plan(#[from] PlanError),

    /// Invalid planner configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "GRAPH-001-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Fills the fix hint from [`ContractSuggestions`] when none is set.
    #[must_use]
    pub fn with_default_hint(mut self) -> Self {
        if self.fix_hint.is_none() {
            self.fix_hint = ContractSuggestions::get(&self.code).map(str::to_string);
        }
        self
    }
}

/// Error raised when a workflow definition fails validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WorkflowValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl WorkflowValidationError {
    /// Creates a new validation error with the given code.
    #[must_use]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            error_info: ContractErrorInfo::new(code, message.clone()).with_default_hint(),
            message,
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Adds a context entry to the contract info.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.error_info = self.error_info.with_context_entry(key, value);
        self
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.error_info.code
    }
}

/// Errors raised while reconstructing the stage DAG.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The producer/consumer relation contains a cycle.
    ///
    /// Holds the cycle path; the first stage is repeated at the end.
    #[error("Cycle detected in workflow: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// A requested feature does not belong to the workflow graph.
    #[error("Unknown feature id {0}")]
    UnknownFeature(usize),
}

impl GraphError {
    /// Returns diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        let info = match self {
            Self::CycleDetected(path) => ContractErrorInfo::new(
                codes::CYCLE,
                format!("Workflow contains a dependency cycle: {}", path.join(" -> ")),
            )
            .with_context_entry("stages", path.join(",")),
            Self::UnknownFeature(id) => {
                ContractErrorInfo::new(codes::UNKNOWN_FEATURE, self.to_string())
                    .with_context_entry("feature_id", id.to_string())
            }
        };
        info.with_default_hint()
    }

    /// Returns the stage names implicated in the error.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        match self {
            Self::CycleDetected(path) => path,
            Self::UnknownFeature(_) => &[],
        }
    }
}

/// Errors raised while cutting the DAG around the model selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The stage graph could not be built.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// More than one model-selection stage was found.
    #[error(
        "Workflow can contain at most 1 model selector. Found {} model selectors: {}",
        .0.len(),
        .0.join(", ")
    )]
    MultipleModelSelectors(Vec<String>),
}

impl PlanError {
    /// Returns diagnostics for this error.
    #[must_use]
    pub fn error_info(&self) -> ContractErrorInfo {
        match self {
            Self::Graph(err) => err.error_info(),
            Self::MultipleModelSelectors(names) => {
                ContractErrorInfo::new(codes::MULTIPLE_SELECTORS, self.to_string())
                    .with_context_entry("stages", names.join(","))
                    .with_default_hint()
            }
        }
    }

    /// Returns the stage names implicated in the error.
    #[must_use]
    pub fn stages(&self) -> &[String] {
        match self {
            Self::Graph(err) => err.stages(),
            Self::MultipleModelSelectors(names) => names,
        }
    }
}

/// Error codes used in [`ContractErrorInfo`].
pub mod codes {
    /// Empty or whitespace-only name.
    pub const EMPTY_NAME: &str = "WORKFLOW-001-EMPTY_NAME";
    /// Stage name declared twice.
    pub const DUPLICATE_STAGE: &str = "WORKFLOW-002-DUPLICATE_STAGE";
    /// Feature produced by more than one stage.
    pub const DUPLICATE_FEATURE: &str = "WORKFLOW-003-DUPLICATE_FEATURE";
    /// Stage without outputs.
    pub const NO_OUTPUT: &str = "WORKFLOW-004-NO_OUTPUT";
    /// Input references an undeclared feature.
    pub const MISSING_FEATURE: &str = "WORKFLOW-005-MISSING_FEATURE";
    /// Workflow without features.
    pub const EMPTY: &str = "WORKFLOW-006-EMPTY";
    /// Generator stage with inputs.
    pub const GENERATOR_INPUT: &str = "WORKFLOW-007-GENERATOR_INPUT";
    /// Dependency cycle.
    pub const CYCLE: &str = "GRAPH-001-CYCLE";
    /// Requested feature outside the graph.
    pub const UNKNOWN_FEATURE: &str = "GRAPH-002-UNKNOWN_FEATURE";
    /// More than one model selector.
    pub const MULTIPLE_SELECTORS: &str = "PLAN-001-MULTIPLE_SELECTORS";
}

/// Provides default suggestions for common contract error codes.
pub struct ContractSuggestions;

impl ContractSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            codes::EMPTY_NAME => Some("Give every stage and feature a non-blank name."),
            codes::DUPLICATE_STAGE => Some(
                "Stage names must be unique within a workflow. Rename one of the stages.",
            ),
            codes::DUPLICATE_FEATURE => Some(
                "A feature is produced by exactly one stage. Rename the output of one of the stages.",
            ),
            codes::NO_OUTPUT => Some("Declare at least one output feature for the stage."),
            codes::MISSING_FEATURE => Some(
                "Declare the feature as a raw feature or as the output of a stage. \
                 Check for typos in feature names.",
            ),
            codes::EMPTY => Some("Add at least one raw feature to the workflow before building."),
            codes::GENERATOR_INPUT => Some(
                "Generators read raw data only. Use a transformer to derive features from other features.",
            ),
            codes::CYCLE => Some(
                "Check your stage inputs for circular references. \
                 A stage cannot consume a feature derived from its own output.",
            ),
            codes::UNKNOWN_FEATURE => Some(
                "Request only features obtained from the same workflow graph.",
            ),
            codes::MULTIPLE_SELECTORS => Some(
                "Keep a single model selector per workflow and put all candidate models into it.",
            ),
            _ => None,
        }
    }
}
