//! Stages: computation nodes of a workflow.

use super::{FeatureId, StageKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a stage inside a [`WorkflowGraph`](crate::workflow::WorkflowGraph).
///
/// Ids follow insertion order in the workflow definition and are the
/// tie-break key for ordering stages within a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(pub(crate) usize);

impl StageId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// A computation node consuming input features and producing output features.
///
/// Stages are immutable once the workflow graph is built; the planner only
/// derives scheduling metadata from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub(crate) id: StageId,
    pub(crate) name: String,
    pub(crate) inputs: Vec<FeatureId>,
    pub(crate) outputs: Vec<FeatureId>,
    pub(crate) kind: StageKind,
}

impl Stage {
    /// Returns the stage id.
    #[must_use]
    pub const fn id(&self) -> StageId {
        self.id
    }

    /// Returns the unique stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the input features, in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[FeatureId] {
        &self.inputs
    }

    /// Returns the output features, in declaration order.
    #[must_use]
    pub fn outputs(&self) -> &[FeatureId] {
        &self.outputs
    }

    /// Returns the stage kind.
    #[must_use]
    pub const fn kind(&self) -> &StageKind {
        &self.kind
    }

    /// Returns true if this is the model-selection stage.
    #[must_use]
    pub const fn is_model_selector(&self) -> bool {
        self.kind.is_model_selector()
    }

    /// Returns true if this stage only generates raw features.
    #[must_use]
    pub const fn is_generator(&self) -> bool {
        self.kind.is_generator()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.kind)
    }
}
