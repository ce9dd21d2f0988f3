//! Testing utilities for stageplan.
//!
//! This module provides:
//! - Canonical workflow fixtures
//! - Assertions over cut invariants

mod assertions;
pub mod fixtures;

pub use assertions::{
    assert_cut_invariants, assert_groups_disjoint, assert_layers_strictly_decreasing,
    assert_proper_ancestors, named_layers,
};
