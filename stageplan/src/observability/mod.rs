//! Observability utilities.

mod report;
mod spans;

pub use report::{LayerReport, PlanReport};
pub use spans::{init_tracing, LogFormat, PlanSpanAttributes, SpanTimer};
