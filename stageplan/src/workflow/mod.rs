//! Workflow assembly.
//!
//! This module provides:
//! - Feature and stage specifications (serde-loadable)
//! - A validating workflow builder
//! - The immutable [`WorkflowGraph`] snapshot the planner reads

mod builder;
mod fingerprint;
mod graph;
mod spec;

pub use builder::WorkflowBuilder;
pub use fingerprint::fingerprint;
pub use graph::{ConsumerIndex, WorkflowGraph};
pub use spec::{FeatureSpec, StageSpec, WorkflowSpec};
