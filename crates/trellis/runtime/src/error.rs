//! Runtime error taxonomy.

use ontology_types::{EntityTypeId, ObjectInstanceId};
use ontology_validator::FieldErrors;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors surfaced by the action runtime boundary.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A guard or rule named a parameter with no usable binding.
    #[error("parameter '{0}' is not bound to an instance")]
    UnboundParameter(String),

    #[error("instance {0} not found")]
    UnknownInstance(ObjectInstanceId),

    #[error("entity type {0} is not registered with the runtime")]
    UnknownEntityType(EntityTypeId),

    #[error("property '{property}' does not exist on entity type {entity_type}")]
    UnknownProperty {
        entity_type: EntityTypeId,
        property: String,
    },

    /// The instance validator rejected a write. Field errors are
    /// returned intact for per-field display.
    #[error("validation failed for entity type {entity_type}: {}", summarize(.fields))]
    Validation {
        entity_type: EntityTypeId,
        fields: FieldErrors,
    },

    /// Opaque failure from a rule execution backend. Surfaced
    /// verbatim, never retried.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

fn summarize(fields: &FieldErrors) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_validation_error_lists_fields() {
        let error = RuntimeError::Validation {
            entity_type: EntityTypeId::new("et-deal"),
            fields: BTreeMap::from([
                ("name".to_string(), "Name is required".to_string()),
                ("stage".to_string(), "Stage must be one of: Lead, Won".to_string()),
            ]),
        };
        let message = error.to_string();
        assert!(message.contains("et-deal"), "unexpected message: {message}");
        assert!(message.contains("name: Name is required"));
        assert!(message.contains("stage: Stage must be one of: Lead, Won"));
    }
}
