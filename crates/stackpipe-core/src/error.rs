//! Error types for stackpipe.

use thiserror::Error;

use crate::id::{ActionRef, Reference, ResourceId};

/// General error for collaborators (secret sources, provisioners) and parsing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A terminal synthesis failure.
///
/// Every variant carries enough names (resource, action, artifact) to locate
/// the fault in the declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error("{from} references unknown target {reference}")]
    UnresolvedReference { from: String, reference: Reference },

    #[error("reference cycle: {}", format_cycle(.cycle))]
    CyclicReference { cycle: Vec<ResourceId> },

    #[error("resource {0} is declared more than once")]
    DuplicateResource(ResourceId),

    #[error("resource {resource} has an invalid role binding: {reason}")]
    RoleBinding { resource: ResourceId, reason: String },

    #[error("{subject} is missing required attribute '{attribute}'")]
    MissingAttribute { subject: String, attribute: String },

    #[error("{subject} has an invalid binding: {reason}")]
    InvalidBinding { subject: String, reason: String },

    #[error("{scope} declares '{name}' more than once")]
    DuplicateName { scope: String, name: String },

    #[error("source action {action} is invalid: {reason}")]
    InvalidSourceAction { action: ActionRef, reason: String },

    #[error("artifact '{artifact}' is produced by both {first} and {second}")]
    DuplicateArtifact {
        artifact: String,
        first: ActionRef,
        second: ActionRef,
    },

    #[error("action {consumer} consumes unknown artifact '{artifact}'")]
    UnknownArtifact { artifact: String, consumer: ActionRef },

    #[error("action {consumer} consumes artifact '{artifact}' before {producer} produces it")]
    ArtifactOrdering {
        artifact: String,
        producer: ActionRef,
        consumer: ActionRef,
    },

    #[error("action {action} has invalid runOrder {}", format_run_order(.value))]
    InvalidRunOrder { action: ActionRef, value: Option<i64> },

    #[error(
        "actions {producer} and {consumer} run concurrently but exchange artifact '{artifact}'"
    )]
    IntraWaveArtifactConflict {
        artifact: String,
        producer: ActionRef,
        consumer: ActionRef,
    },
}

impl SynthError {
    /// Stable name of the error kind, suitable for matching in tooling.
    pub fn kind(&self) -> &'static str {
        match self {
            SynthError::UnresolvedReference { .. } => "UnresolvedReferenceError",
            SynthError::CyclicReference { .. } => "CyclicReferenceError",
            SynthError::DuplicateResource(_) => "DuplicateResourceError",
            SynthError::RoleBinding { .. } => "RoleBindingError",
            SynthError::MissingAttribute { .. } => "MissingAttributeError",
            SynthError::InvalidBinding { .. } => "InvalidBindingError",
            SynthError::DuplicateName { .. } => "DuplicateNameError",
            SynthError::InvalidSourceAction { .. } => "InvalidSourceActionError",
            SynthError::DuplicateArtifact { .. } => "DuplicateArtifactError",
            SynthError::UnknownArtifact { .. } => "UnknownArtifactError",
            SynthError::ArtifactOrdering { .. } => "ArtifactOrderingError",
            SynthError::InvalidRunOrder { .. } => "InvalidRunOrderError",
            SynthError::IntraWaveArtifactConflict { .. } => "IntraWaveArtifactConflictError",
        }
    }
}

fn format_cycle(cycle: &[ResourceId]) -> String {
    let mut parts: Vec<String> = cycle.iter().map(ToString::to_string).collect();
    if let Some(first) = cycle.first() {
        parts.push(first.to_string());
    }
    parts.join(" -> ")
}

fn format_run_order(value: &Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(missing)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ResourceKind;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = SynthError::CyclicReference {
            cycle: vec![
                ResourceId::new(ResourceKind::Role, "A"),
                ResourceId::new(ResourceKind::Bucket, "B"),
            ],
        };
        assert_eq!(err.to_string(), "reference cycle: role.A -> bucket.B -> role.A");
        assert_eq!(err.kind(), "CyclicReferenceError");
    }

    #[test]
    fn test_missing_run_order_message() {
        let err = SynthError::InvalidRunOrder {
            action: ActionRef::new("Build", "Compile"),
            value: None,
        };
        assert_eq!(
            err.to_string(),
            "action Build/Compile has invalid runOrder (missing)"
        );
    }
}
