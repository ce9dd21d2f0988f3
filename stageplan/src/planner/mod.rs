//! DAG planning.
//!
//! This module provides:
//! - The Graph Builder reconstructing the minimal layered stage DAG
//! - Lineage analysis deciding which stages depend on labels
//! - The DAG Cutter splitting selector ancestors into fold groups
//! - Plan caching and the [`Planner`] facade

mod cache;
mod config;
mod cutter;
mod dag;
mod engine;
mod lineage;

pub use cache::{CacheStats, PlanCache, PlanKey};
pub use config::PlannerConfig;
pub use cutter::{CutDag, DagCutter, SelectorRef};
pub use dag::{GraphBuilder, Layer, StageDag};
pub use engine::Planner;
pub use lineage::{FoldGroup, Lineage, LineageAnalyzer};
