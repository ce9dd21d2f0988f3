//! Assertions over cut results.

use crate::core::StageId;
use crate::planner::{CutDag, Layer};
use crate::workflow::WorkflowGraph;
use std::collections::{HashSet, VecDeque};

/// Renders layers as `(stage name, distance)` lists.
#[must_use]
pub fn named_layers(graph: &WorkflowGraph, layers: &[Layer]) -> Vec<Vec<(String, usize)>> {
    layers
        .iter()
        .map(|layer| {
            layer
                .entries()
                .map(|(stage, distance)| (graph.stage_name(stage), distance))
                .collect()
        })
        .collect()
}

/// Asserts that each layer's distance is strictly greater than the next one's.
pub fn assert_layers_strictly_decreasing(layers: &[Layer]) {
    for pair in layers.windows(2) {
        assert!(
            pair[0].distance() > pair[1].distance(),
            "Layer distances must strictly decrease, got {} then {}",
            pair[0].distance(),
            pair[1].distance()
        );
    }
}

/// Asserts that no stage appears twice across the two fold groups.
pub fn assert_groups_disjoint(cut: &CutDag) {
    let mut seen: HashSet<StageId> = HashSet::new();
    for layer in cut.compute_once().iter().chain(cut.per_fold()) {
        for &stage in layer.stages() {
            assert!(seen.insert(stage), "Stage {stage} appears in more than one layer");
        }
    }
}

/// Collects the non-generator stages reachable backward from the selector's
/// inputs, walking `inputs -> producer` links directly on the graph.
fn selector_ancestors(graph: &WorkflowGraph, selector: StageId) -> HashSet<StageId> {
    let mut seen: HashSet<StageId> = HashSet::new();
    let mut queue: VecDeque<StageId> = VecDeque::from([selector]);

    while let Some(stage) = queue.pop_front() {
        let Some(stage) = graph.stage(stage) else {
            continue;
        };
        for &input in stage.inputs() {
            let Some(producer) = graph.producer_of(input) else {
                continue;
            };
            if producer.is_generator() || producer.id() == selector {
                continue;
            }
            if seen.insert(producer.id()) {
                queue.push_back(producer.id());
            }
        }
    }
    seen
}

/// Asserts that the fold groups hold exactly the proper ancestors of the
/// selector: nothing outside its lineage, nothing upstream left out.
pub fn assert_proper_ancestors(graph: &WorkflowGraph, cut: &CutDag) {
    let Some(selector) = cut.selector() else {
        assert!(
            cut.compute_once().is_empty() && cut.per_fold().is_empty(),
            "Groups must be empty without a selector"
        );
        return;
    };

    let ancestors = selector_ancestors(graph, selector);
    let mut grouped: HashSet<StageId> = HashSet::new();
    for layer in cut.compute_once().iter().chain(cut.per_fold()) {
        for &stage in layer.stages() {
            assert!(
                stage != selector && ancestors.contains(&stage),
                "Stage '{}' is not a proper ancestor of the selector",
                graph.stage_name(stage)
            );
            grouped.insert(stage);
        }
    }

    let mut missing: Vec<String> = ancestors
        .difference(&grouped)
        .map(|stage| graph.stage_name(*stage))
        .collect();
    missing.sort();
    assert!(missing.is_empty(), "Selector ancestors missing from the cut: {missing:?}");
}

/// Asserts every structural invariant of a cut.
pub fn assert_cut_invariants(graph: &WorkflowGraph, cut: &CutDag) {
    assert_layers_strictly_decreasing(cut.compute_once());
    assert_layers_strictly_decreasing(cut.per_fold());
    assert_layers_strictly_decreasing(cut.after_selector());
    assert_groups_disjoint(cut);
    assert_proper_ancestors(graph, cut);
}
