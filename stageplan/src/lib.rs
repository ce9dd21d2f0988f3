//! # Stageplan
//!
//! Execution planning for automated feature-engineering and model-fitting
//! workflows.
//!
//! A workflow is a DAG of stages connected by features. Before execution,
//! stageplan:
//!
//! - **Builds the stage DAG**: walks producer links backward from the
//!   requested features and layers the stages by longest distance
//! - **Locates the model selector**: at most one per workflow
//! - **Cuts the DAG**: splits the selector's ancestors into stages computed
//!   once and stages recomputed inside every validation fold
//!
//! ## Quick Start
//!
//! ```rust
//! use stageplan::prelude::*;
//!
//! let graph = WorkflowBuilder::new("titanic")
//!     .raw_feature(FeatureSpec::predictor("age", FeatureType::Real))?
//!     .raw_feature(FeatureSpec::response("survived", FeatureType::RealNN))?
//!     .stage(
//!         StageSpec::estimator("vectorize", "vectorizer")
//!             .with_input("age")
//!             .with_output(FeatureSpec::predictor("features", FeatureType::Vector)),
//!     )?
//!     .stage(
//!         StageSpec::model_selector("selector", ValidationScheme::cross_validation(3))
//!             .with_inputs(["survived", "features"])
//!             .with_output(FeatureSpec::predictor("prediction", FeatureType::Prediction)),
//!     )?
//!     .build()?;
//!
//! let cut = DagCutter::new(&graph).cut(&graph.feature_ids(["prediction"]))?;
//! assert_eq!(cut.compute_once().len(), 1);
//! assert!(cut.per_fold().is_empty());
//! # Ok::<(), StageplanError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod errors;
pub mod observability;
pub mod planner;
pub mod testing;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Feature, FeatureId, FeatureType, Stage, StageId, StageKind, ValidationScheme,
    };
    pub use crate::errors::{
        ContractErrorInfo, GraphError, PlanError, StageplanError, WorkflowValidationError,
    };
    pub use crate::observability::{init_tracing, LogFormat, PlanReport};
    pub use crate::planner::{
        CutDag, DagCutter, FoldGroup, GraphBuilder, Layer, Planner, PlannerConfig, StageDag,
    };
    pub use crate::workflow::{
        FeatureSpec, StageSpec, WorkflowBuilder, WorkflowGraph, WorkflowSpec,
    };
}
