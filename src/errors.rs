use std::io;

use thiserror::Error;

use crate::filter::Operator;
use crate::types::{FieldName, RecordKind, ResourceName, SourceKey};
use crate::value::SemanticType;

/// Error type for schema declarations, record construction, queries, and loading.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("map block for field '{field}' in {kind} is invalid: {reason}")]
    Mapping {
        kind: RecordKind,
        field: FieldName,
        reason: String,
    },
    #[error("unfilled required field '{field}' in {kind} (source key '{source_key}')")]
    MissingRequiredField {
        kind: RecordKind,
        field: FieldName,
        source_key: SourceKey,
    },
    #[error(
        "there are no field(s) [{}] in {kind}; available fields are: [{}]",
        .missing.join(", "),
        .available.join(", ")
    )]
    UnknownField {
        kind: RecordKind,
        missing: Vec<String>,
        available: Vec<FieldName>,
    },
    #[error(
        "operator '{operator}' is not allowed for field '{field}' of type {semantic_type}; allowed operators: [{}]",
        join_operators(.allowed)
    )]
    InvalidOperator {
        field: String,
        operator: Operator,
        semantic_type: SemanticType,
        allowed: &'static [Operator],
    },
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),
    #[error("filter '{operator}' for field '{field}' accepts only {expected} values: {reason}")]
    InvalidArgument {
        field: String,
        operator: Operator,
        expected: String,
        reason: String,
    },
    #[error("field '{field}' in {kind} holds {expected} values, got {found}")]
    FieldTypeMismatch {
        kind: RecordKind,
        field: FieldName,
        expected: SemanticType,
        found: &'static str,
    },
    #[error("resource '{name}' is unavailable: {reason}")]
    ResourceUnavailable { name: ResourceName, reason: String },
    #[error("resource '{name}' is malformed: {reason}")]
    MalformedResource { name: ResourceName, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn join_operators(operators: &[Operator]) -> String {
    operators
        .iter()
        .map(|operator| operator.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
