//! Features: typed data artifacts flowing between stages.

use super::StageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a feature inside a [`WorkflowGraph`](crate::workflow::WorkflowGraph).
///
/// Ids follow declaration order in the workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub(crate) usize);

impl FeatureId {
    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feature#{}", self.0)
    }
}

/// Declared value type of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Nullable real number.
    Real,
    /// Non-nullable real number, typically a label.
    RealNN,
    /// Integer value.
    Integral,
    /// Boolean value.
    Binary,
    /// Free text.
    Text,
    /// Categorical text drawn from a small set.
    PickList,
    /// Date or timestamp.
    Date,
    /// Dense or sparse numeric vector.
    Vector,
    /// Model prediction.
    Prediction,
    /// Any other type, identified by name.
    Custom(String),
}

impl Default for FeatureType {
    fn default() -> Self {
        Self::Real
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::RealNN => write!(f, "real_nn"),
            Self::Integral => write!(f, "integral"),
            Self::Binary => write!(f, "binary"),
            Self::Text => write!(f, "text"),
            Self::PickList => write!(f, "pick_list"),
            Self::Date => write!(f, "date"),
            Self::Vector => write!(f, "vector"),
            Self::Prediction => write!(f, "prediction"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A named, typed artifact produced by exactly one stage.
///
/// Consumers are not stored here; they are derived by
/// [`WorkflowGraph::consumer_index`](crate::workflow::WorkflowGraph::consumer_index).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub(crate) id: FeatureId,
    pub(crate) name: String,
    pub(crate) value_type: FeatureType,
    pub(crate) is_response: bool,
    pub(crate) producer: StageId,
}

impl Feature {
    /// Returns the feature id.
    #[must_use]
    pub const fn id(&self) -> FeatureId {
        self.id
    }

    /// Returns the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared value type.
    #[must_use]
    pub const fn value_type(&self) -> &FeatureType {
        &self.value_type
    }

    /// Returns true if the feature is a supervised-learning label.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        self.is_response
    }

    /// Returns the stage that outputs this feature.
    #[must_use]
    pub const fn producer(&self) -> StageId {
        self.producer
    }
}
