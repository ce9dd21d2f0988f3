//! Canonical workflows used across the test suites.
//!
//! Every fixture returns the graph and the features it should be planned for.
//! Raw features are `x` (predictor) and `y` (response) unless noted.

use crate::core::{FeatureId, FeatureType, ValidationScheme};
use crate::errors::WorkflowValidationError;
use crate::workflow::{FeatureSpec, StageSpec, WorkflowBuilder, WorkflowGraph};

/// A graph paired with the features to plan for.
pub type Fixture = (WorkflowGraph, Vec<FeatureId>);

fn base(name: &str) -> Result<WorkflowBuilder, WorkflowValidationError> {
    WorkflowBuilder::new(name)
        .raw_feature(FeatureSpec::predictor("x", FeatureType::Real))?
        .raw_feature(FeatureSpec::response("y", FeatureType::RealNN))
}

fn transformer(name: &str, inputs: &[&str], output: FeatureSpec) -> StageSpec {
    StageSpec::transformer(name, name)
        .with_inputs(inputs.iter().copied())
        .with_output(output)
}

fn selector(name: &str, inputs: &[&str], output: &str) -> StageSpec {
    StageSpec::model_selector(name, ValidationScheme::cross_validation(3))
        .with_inputs(inputs.iter().copied())
        .with_candidates(["logistic_regression", "random_forest"])
        .with_output(FeatureSpec::predictor(output, FeatureType::Prediction))
}

fn vector(name: &str) -> FeatureSpec {
    FeatureSpec::predictor(name, FeatureType::Vector)
}

#[allow(clippy::expect_used)]
fn finish(builder: Result<WorkflowBuilder, WorkflowValidationError>, results: &[&str]) -> Fixture {
    let graph = builder
        .and_then(WorkflowBuilder::build)
        .expect("fixture workflow is valid");
    let ids = graph.feature_ids(results.iter().copied());
    assert_eq!(ids.len(), results.len(), "fixture results must exist");
    (graph, ids)
}

/// The selector reads raw features only.
#[must_use]
pub fn selector_only() -> Fixture {
    let builder = base("selector-only").and_then(|b| b.stage(selector("selector", &["x", "y"], "prediction")));
    finish(builder, &["prediction"])
}

/// `features_only(x)` feeds `check(fx, y)` which feeds the selector.
#[must_use]
pub fn feature_then_check() -> Fixture {
    let builder = base("feature-then-check")
        .and_then(|b| b.stage(transformer("features_only", &["x"], vector("fx"))))
        .and_then(|b| b.stage(transformer("check", &["fx", "y"], vector("checked"))))
        .and_then(|b| b.stage(selector("selector", &["y", "checked"], "prediction")));
    finish(builder, &["prediction"])
}

/// `features_only(x)` and `label_only(y)` both feed `check`, which feeds the
/// selector.
#[must_use]
pub fn fan_in_check() -> Fixture {
    let builder = base("fan-in-check")
        .and_then(|b| b.stage(transformer("features_only", &["x"], vector("fx"))))
        .and_then(|b| {
            b.stage(transformer(
                "label_only",
                &["y"],
                FeatureSpec::response("fy", FeatureType::RealNN),
            ))
        })
        .and_then(|b| b.stage(transformer("check", &["fx", "fy"], vector("checked"))))
        .and_then(|b| b.stage(selector("selector", &["y", "checked"], "prediction")));
    finish(builder, &["prediction"])
}

/// [`feature_then_check`] plus an `unrelated(x)` branch that is requested but
/// never reaches the selector.
#[must_use]
pub fn unrelated_branch() -> Fixture {
    let builder = base("unrelated-branch")
        .and_then(|b| b.stage(transformer("features_only", &["x"], vector("fx"))))
        .and_then(|b| b.stage(transformer("unrelated", &["x"], vector("ux"))))
        .and_then(|b| b.stage(transformer("check", &["fx", "y"], vector("checked"))))
        .and_then(|b| b.stage(selector("selector", &["y", "checked"], "prediction")));
    finish(builder, &["prediction", "ux"])
}

/// `a(x)` reaches `check` directly and through `b(fa)`.
#[must_use]
pub fn two_paths() -> Fixture {
    let builder = base("two-paths")
        .and_then(|b| b.stage(transformer("a", &["x"], vector("fa"))))
        .and_then(|b| b.stage(transformer("b", &["fa"], vector("fb"))))
        .and_then(|b| b.stage(transformer("check", &["fa", "fb", "y"], vector("checked"))))
        .and_then(|b| b.stage(selector("selector", &["y", "checked"], "prediction")));
    finish(builder, &["prediction"])
}

/// A selector followed by an `evaluate(prediction, y)` stage.
#[must_use]
pub fn selector_then_evaluate() -> Fixture {
    let builder = base("selector-then-evaluate")
        .and_then(|b| b.stage(transformer("features_only", &["x"], vector("fx"))))
        .and_then(|b| b.stage(selector("selector", &["y", "fx"], "prediction")))
        .and_then(|b| b.stage(transformer("evaluate", &["prediction", "y"], vector("metrics"))));
    finish(builder, &["metrics"])
}

/// Two selectors reading the same features side by side.
#[must_use]
pub fn parallel_selectors() -> Fixture {
    let builder = base("parallel-selectors")
        .and_then(|b| b.stage(selector("selector_a", &["x", "y"], "prediction_a")))
        .and_then(|b| b.stage(selector("selector_b", &["x", "y"], "prediction_b")));
    finish(builder, &["prediction_a", "prediction_b"])
}

/// One selector's prediction feeds a second selector.
#[must_use]
pub fn serial_selectors() -> Fixture {
    let builder = base("serial-selectors")
        .and_then(|b| b.stage(selector("selector_a", &["x", "y"], "prediction_a")))
        .and_then(|b| b.stage(selector("selector_b", &["prediction_a", "y"], "prediction_b")));
    finish(builder, &["prediction_b"])
}

/// Plain feature engineering without a selector.
#[must_use]
pub fn no_selector() -> Fixture {
    let builder = base("no-selector")
        .and_then(|b| b.stage(transformer("features_only", &["x"], vector("fx"))))
        .and_then(|b| b.stage(transformer("check", &["fx", "y"], vector("checked"))));
    finish(builder, &["checked"])
}
