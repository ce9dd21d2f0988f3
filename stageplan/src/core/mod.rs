//! Core domain model types for stageplan.
//!
//! This module contains the fundamental types the planner reads:
//! - Features and their value type tags
//! - Stages and their kinds
//! - Model-selector validation schemes

mod feature;
mod kind;
mod stage;

pub use feature::{Feature, FeatureId, FeatureType};
pub use kind::{StageKind, ValidationScheme};
pub use stage::{Stage, StageId};
