//! Content hashing of workflow graphs.

use super::WorkflowGraph;
use crate::core::{FeatureType, StageKind, ValidationScheme};
use sha2::{Digest, Sha256};

/// Computes a stable fingerprint of a workflow graph.
///
/// Stages and features are fed to SHA-256 in id order as a length-prefixed
/// canonical encoding; the first 16 bytes are hex encoded. Encoding cannot
/// fail, so distinct graphs never collapse onto a shared fallback key.
#[must_use]
pub fn fingerprint(graph: &WorkflowGraph) -> String {
    let mut hasher = Sha256::new();
    write_str(&mut hasher, graph.name());

    write_len(&mut hasher, graph.features().len());
    for feature in graph.features() {
        write_str(&mut hasher, feature.name());
        write_feature_type(&mut hasher, feature.value_type());
        hasher.update([u8::from(feature.is_response())]);
        write_len(&mut hasher, feature.producer().index());
    }

    write_len(&mut hasher, graph.stages().len());
    for stage in graph.stages() {
        write_str(&mut hasher, stage.name());
        write_kind(&mut hasher, stage.kind());
        write_len(&mut hasher, stage.inputs().len());
        for input in stage.inputs() {
            write_len(&mut hasher, input.index());
        }
        write_len(&mut hasher, stage.outputs().len());
        for output in stage.outputs() {
            write_len(&mut hasher, output.index());
        }
    }

    let result = hasher.finalize();
    hex::encode(&result[..16])
}

fn write_len(hasher: &mut Sha256, value: usize) {
    hasher.update((value as u64).to_le_bytes());
}

fn write_str(hasher: &mut Sha256, value: &str) {
    write_len(hasher, value.len());
    hasher.update(value.as_bytes());
}

fn write_feature_type(hasher: &mut Sha256, value_type: &FeatureType) {
    match value_type {
        FeatureType::Custom(name) => {
            hasher.update([1u8]);
            write_str(hasher, name);
        }
        builtin => {
            hasher.update([0u8]);
            write_str(hasher, &builtin.to_string());
        }
    }
}

fn write_kind(hasher: &mut Sha256, kind: &StageKind) {
    match kind {
        StageKind::Generator => hasher.update([0u8]),
        StageKind::Transformer { operation } => {
            hasher.update([1u8]);
            write_str(hasher, operation);
        }
        StageKind::Estimator { operation } => {
            hasher.update([2u8]);
            write_str(hasher, operation);
        }
        StageKind::ModelSelector {
            validation,
            candidates,
        } => {
            hasher.update([3u8]);
            match validation {
                ValidationScheme::CrossValidation { folds } => {
                    hasher.update([0u8]);
                    hasher.update(folds.to_le_bytes());
                }
                ValidationScheme::TrainValidationSplit { train_ratio } => {
                    hasher.update([1u8]);
                    hasher.update(train_ratio.to_bits().to_le_bytes());
                }
            }
            write_len(hasher, candidates.len());
            for candidate in candidates {
                write_str(hasher, candidate);
            }
        }
    }
}
