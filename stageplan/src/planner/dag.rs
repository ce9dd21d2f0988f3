//! Graph Builder: reconstructs the minimal stage DAG behind a set of
//! requested features and groups it into distance layers.

use crate::core::{FeatureId, StageId};
use crate::errors::GraphError;
use crate::workflow::{ConsumerIndex, WorkflowGraph};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Stages sharing the same distance, with no dependency between them.
///
/// Stages are ordered by insertion order in the workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    distance: usize,
    stages: Vec<StageId>,
}

impl Layer {
    /// Creates a layer. Stages are sorted and deduplicated.
    #[must_use]
    pub fn new(distance: usize, mut stages: Vec<StageId>) -> Self {
        stages.sort_unstable();
        stages.dedup();
        Self { distance, stages }
    }

    /// Returns the distance shared by every stage of the layer.
    #[must_use]
    pub const fn distance(&self) -> usize {
        self.distance
    }

    /// Returns the stages of the layer.
    #[must_use]
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Returns `(stage, distance)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (StageId, usize)> + '_ {
        self.stages.iter().map(move |s| (*s, self.distance))
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the layer has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns true if the layer holds the stage.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.stages.binary_search(&stage).is_ok()
    }
}

/// A layered stage DAG, ordered by strictly decreasing distance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageDag {
    layers: Vec<Layer>,
}

impl StageDag {
    /// Creates an empty DAG.
    #[must_use]
    pub const fn empty() -> Self {
        Self { layers: Vec::new() }
    }

    /// Groups `(stage, distance)` pairs into layers.
    #[must_use]
    pub fn from_distances(distances: impl IntoIterator<Item = (StageId, usize)>) -> Self {
        let mut by_distance: BTreeMap<usize, Vec<StageId>> = BTreeMap::new();
        for (stage, distance) in distances {
            by_distance.entry(distance).or_default().push(stage);
        }
        let layers = by_distance
            .into_iter()
            .rev()
            .map(|(distance, stages)| Layer::new(distance, stages))
            .collect();
        Self { layers }
    }

    /// Returns the layers, most upstream first.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Consumes the DAG and returns its layers.
    #[must_use]
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
    }

    /// Returns true if the DAG holds no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the total number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    /// Returns every `(stage, distance)` pair in layer order.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, usize)> + '_ {
        self.layers.iter().flat_map(Layer::entries)
    }

    /// Returns the distance of a stage, if it is part of the DAG.
    #[must_use]
    pub fn distance_of(&self, stage: StageId) -> Option<usize> {
        self.layers
            .iter()
            .find(|layer| layer.contains(stage))
            .map(Layer::distance)
    }

    /// Returns true if the stage is part of the DAG.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.distance_of(stage).is_some()
    }

    /// Keeps the stages matching the predicate, preserving their distances.
    /// Layers left empty are dropped.
    #[must_use]
    pub fn retain(&self, mut keep: impl FnMut(StageId) -> bool) -> Self {
        let layers = self
            .layers
            .iter()
            .filter_map(|layer| {
                let stages: Vec<StageId> = layer.stages.iter().copied().filter(|s| keep(*s)).collect();
                (!stages.is_empty()).then(|| Layer {
                    distance: layer.distance,
                    stages,
                })
            })
            .collect();
        Self { layers }
    }

    /// Splits the DAG in one pass into the stages matching the predicate and
    /// the rest, preserving distances. Layers left empty are dropped.
    #[must_use]
    pub fn partition(&self, mut matches: impl FnMut(StageId) -> bool) -> (Self, Self) {
        let mut matched = Vec::new();
        let mut rest = Vec::new();
        for layer in &self.layers {
            let (yes, no): (Vec<StageId>, Vec<StageId>) =
                layer.stages.iter().copied().partition(|s| matches(*s));
            if !yes.is_empty() {
                matched.push(Layer {
                    distance: layer.distance,
                    stages: yes,
                });
            }
            if !no.is_empty() {
                rest.push(Layer {
                    distance: layer.distance,
                    stages: no,
                });
            }
        }
        (Self { layers: matched }, Self { layers: rest })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Walks producer links backward from requested features.
#[derive(Debug)]
pub struct GraphBuilder<'g> {
    graph: &'g WorkflowGraph,
    consumers: ConsumerIndex,
}

impl<'g> GraphBuilder<'g> {
    /// Creates a graph builder, deriving the consumer index of the graph.
    #[must_use]
    pub fn new(graph: &'g WorkflowGraph) -> Self {
        Self {
            graph,
            consumers: graph.consumer_index(),
        }
    }

    /// Returns the underlying workflow graph.
    #[must_use]
    pub const fn graph(&self) -> &'g WorkflowGraph {
        self.graph
    }

    /// Returns the derived consumer index.
    #[must_use]
    pub const fn consumers(&self) -> &ConsumerIndex {
        &self.consumers
    }

    /// Computes the minimal stage DAG needed to produce `result_features`.
    ///
    /// Each retained stage is annotated with the longest stage-hop path to a
    /// requested feature; producers of requested features sit at distance 0
    /// unless they also feed another retained stage. Generators are never
    /// retained.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownFeature`] for ids outside the graph and
    /// [`GraphError::CycleDetected`] if the ancestors contain a cycle.
    pub fn compute_dag(&self, result_features: &[FeatureId]) -> Result<StageDag, GraphError> {
        let mut sinks = Vec::with_capacity(result_features.len());
        for feature in result_features {
            let feature = self
                .graph
                .feature(*feature)
                .ok_or(GraphError::UnknownFeature(feature.index()))?;
            if !self.graph.stage_at(feature.producer).is_generator() {
                sinks.push(feature.producer);
            }
        }
        sinks.sort_unstable();
        sinks.dedup();

        let order = self.topological_ancestors(&sinks)?;
        let terminal: HashSet<StageId> = sinks.iter().copied().collect();

        // Producers precede consumers in `order`, so walking it backwards
        // visits every retained consumer before its producers.
        let mut distances: Vec<Option<usize>> = vec![None; self.graph.stage_count()];
        for &stage in order.iter().rev() {
            let mut distance = terminal.contains(&stage).then_some(0);
            for &output in self.graph.stage_at(stage).outputs() {
                for consumer in self.consumers.consumers_of(output) {
                    if let Some(downstream) = distances[consumer.index()] {
                        distance = Some(distance.map_or(downstream + 1, |d| d.max(downstream + 1)));
                    }
                }
            }
            distances[stage.index()] = Some(distance.unwrap_or(0));
        }

        let dag = StageDag::from_distances(
            order
                .iter()
                .filter_map(|s| distances[s.index()].map(|d| (*s, d))),
        );
        tracing::debug!(
            workflow = self.graph.name(),
            requested = result_features.len(),
            stages = dag.stage_count(),
            layers = dag.layers().len(),
            "Computed stage DAG"
        );
        Ok(dag)
    }

    /// Returns the non-generator ancestors of `sinks` (inclusive) with every
    /// producer listed before its consumers.
    ///
    /// The walk keeps an explicit frame stack of `(stage, next_input)` so deep
    /// chains do not grow the call stack. The frame stack doubles as the
    /// current path when reporting a cycle.
    fn topological_ancestors(&self, sinks: &[StageId]) -> Result<Vec<StageId>, GraphError> {
        let mut marks: Vec<Option<Mark>> = vec![None; self.graph.stage_count()];
        let mut order = Vec::new();
        let mut frames: Vec<(StageId, usize)> = Vec::new();

        for &sink in sinks {
            if marks[sink.index()].is_some() {
                continue;
            }
            marks[sink.index()] = Some(Mark::InProgress);
            frames.push((sink, 0));

            while let Some(frame) = frames.last_mut() {
                let (stage, next) = *frame;
                let inputs = self.graph.stage_at(stage).inputs();
                let Some(&input) = inputs.get(next) else {
                    frames.pop();
                    marks[stage.index()] = Some(Mark::Done);
                    order.push(stage);
                    continue;
                };
                frame.1 += 1;

                let producer = self.graph.feature_at(input).producer;
                if self.graph.stage_at(producer).is_generator() {
                    continue;
                }
                match marks[producer.index()] {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => return Err(self.cycle_error(&frames, producer)),
                    None => {
                        marks[producer.index()] = Some(Mark::InProgress);
                        frames.push((producer, 0));
                    }
                }
            }
        }
        Ok(order)
    }

    fn cycle_error(&self, frames: &[(StageId, usize)], stage: StageId) -> GraphError {
        let start = frames.iter().position(|(s, _)| *s == stage).unwrap_or(0);
        let mut cycle: Vec<String> = frames[start..]
            .iter()
            .map(|(s, _)| self.graph.stage_name(*s))
            .collect();
        cycle.push(self.graph.stage_name(stage));
        GraphError::CycleDetected(cycle)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::FeatureType;
    use crate::workflow::{FeatureSpec, StageSpec, WorkflowBuilder};
    use pretty_assertions::assert_eq;

    fn t(name: &str, inputs: &[&str], output: &str) -> StageSpec {
        StageSpec::transformer(name, "op")
            .with_inputs(inputs.iter().copied())
            .with_output(FeatureSpec::predictor(output, FeatureType::Real))
    }

    fn named(graph: &WorkflowGraph, dag: &StageDag) -> Vec<Vec<(String, usize)>> {
        dag.layers()
            .iter()
            .map(|layer| {
                layer
                    .entries()
                    .map(|(s, d)| (graph.stage_name(s), d))
                    .collect()
            })
            .collect()
    }

    /// x -> a -> b -> d, x -> c -> d, plus an unrelated branch x -> e.
    fn diamond() -> WorkflowGraph {
        WorkflowBuilder::new("diamond")
            .raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap()
            .stage(t("a", &["x"], "fa"))
            .unwrap()
            .stage(t("b", &["fa"], "fb"))
            .unwrap()
            .stage(t("c", &["x"], "fc"))
            .unwrap()
            .stage(t("d", &["fb", "fc"], "fd"))
            .unwrap()
            .stage(t("e", &["x"], "fe"))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_layer_sorted_and_deduplicated() {
        let layer = Layer::new(3, vec![StageId(4), StageId(1), StageId(4)]);
        assert_eq!(layer.stages(), &[StageId(1), StageId(4)]);
        assert!(layer.contains(StageId(4)));
        assert_eq!(layer.entries().collect::<Vec<_>>(), vec![(StageId(1), 3), (StageId(4), 3)]);
    }

    #[test]
    fn test_longest_path_distances() {
        let graph = diamond();
        let builder = GraphBuilder::new(&graph);
        let dag = builder.compute_dag(&graph.feature_ids(["fd"])).unwrap();

        assert_eq!(
            named(&graph, &dag),
            vec![
                vec![("a".to_string(), 2)],
                vec![("b".to_string(), 1), ("c".to_string(), 1)],
                vec![("d".to_string(), 0)],
            ]
        );
        assert!(!dag.contains(graph.stage_by_name("e").unwrap().id()));
    }

    #[test]
    fn test_multiple_results_take_maximum() {
        let graph = diamond();
        let builder = GraphBuilder::new(&graph);
        let dag = builder.compute_dag(&graph.feature_ids(["fd", "fa", "fe"])).unwrap();

        // `a` produces a requested feature but also feeds `b`, so it keeps its
        // longest downstream distance.
        let a = graph.stage_by_name("a").unwrap().id();
        let e = graph.stage_by_name("e").unwrap().id();
        assert_eq!(dag.distance_of(a), Some(2));
        assert_eq!(dag.distance_of(e), Some(0));
        assert_eq!(dag.stage_count(), 5);
    }

    #[test]
    fn test_layers_strictly_decreasing() {
        let graph = diamond();
        let dag = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["fd", "fe"]))
            .unwrap();

        for pair in dag.layers().windows(2) {
            assert!(pair[0].distance() > pair[1].distance());
        }
    }

    #[test]
    fn test_raw_feature_request_is_empty() {
        let graph = diamond();
        let dag = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["x"]))
            .unwrap();
        assert!(dag.is_empty());
    }

    #[test]
    fn test_unknown_feature() {
        let graph = diamond();
        let err = GraphBuilder::new(&graph)
            .compute_dag(&[FeatureId(99)])
            .unwrap_err();
        assert_eq!(err, GraphError::UnknownFeature(99));
    }

    #[test]
    fn test_cycle_detected() {
        let graph = WorkflowBuilder::new("cyclic")
            .raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap()
            .stage(t("a", &["x", "fb"], "fa"))
            .unwrap()
            .stage(t("b", &["fa"], "fb"))
            .unwrap()
            .stage(t("sink", &["fb"], "out"))
            .unwrap()
            .build()
            .unwrap();

        let err = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["out"]))
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::CycleDetected(vec!["b".to_string(), "a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_retain_keeps_distances() {
        let graph = diamond();
        let dag = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["fd"]))
            .unwrap();
        let c = graph.stage_by_name("c").unwrap().id();

        let only_c = dag.retain(|s| s == c);
        assert_eq!(only_c.layers(), &[Layer::new(1, vec![c])]);
    }

    #[test]
    fn test_partition_visits_each_stage_once() {
        let graph = diamond();
        let dag = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["fd"]))
            .unwrap();
        let c = graph.stage_by_name("c").unwrap().id();

        let mut calls = 0;
        let (only_c, rest) = dag.partition(|s| {
            calls += 1;
            s == c
        });

        assert_eq!(calls, 4);
        assert_eq!(only_c.layers(), &[Layer::new(1, vec![c])]);
        assert_eq!(rest.stage_count(), 3);
        assert_eq!(rest.distance_of(c), None);
    }

    /// x -> t0 -> t1 -> ... -> t{len-1}
    fn chain(len: usize) -> WorkflowGraph {
        let mut builder = WorkflowBuilder::new("chain");
        builder
            .add_raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap();
        let mut previous = "x".to_string();
        for i in 0..len {
            let output = format!("f{i}");
            builder
                .add_stage_spec(t(&format!("t{i}"), &[previous.as_str()], &output))
                .unwrap();
            previous = output;
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let graph = chain(20_000);
        let dag = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["f19999"]))
            .unwrap();

        assert_eq!(dag.stage_count(), 20_000);
        assert_eq!(dag.layers().len(), 20_000);
        assert_eq!(dag.distance_of(graph.stage_by_name("t0").unwrap().id()), Some(19_999));
    }

    #[test]
    fn test_cycle_detected_past_acyclic_prefix() {
        // Cycle between `b` and `c`, reached through `sink -> a`.
        let graph = WorkflowBuilder::new("cyclic")
            .raw_feature(FeatureSpec::predictor("x", FeatureType::Real))
            .unwrap()
            .stage(t("b", &["x", "fc"], "fb"))
            .unwrap()
            .stage(t("c", &["fb"], "fc"))
            .unwrap()
            .stage(t("a", &["fc"], "fa"))
            .unwrap()
            .stage(t("sink", &["fa"], "out"))
            .unwrap()
            .build()
            .unwrap();

        let err = GraphBuilder::new(&graph)
            .compute_dag(&graph.feature_ids(["out"]))
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::CycleDetected(vec!["c".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_from_distances_orders_layers() {
        let dag = StageDag::from_distances([(StageId(2), 0), (StageId(0), 5), (StageId(1), 0)]);
        let distances: Vec<usize> = dag.layers().iter().map(Layer::distance).collect();
        assert_eq!(distances, vec![5, 0]);
        assert_eq!(dag.layers()[1].stages(), &[StageId(1), StageId(2)]);
    }
}
