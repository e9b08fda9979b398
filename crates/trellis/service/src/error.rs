//! Service error taxonomy.

use action_types::{ActionError, ActionTypeId};
use ontology_types::{RelationshipId, SchemaError};
use thiserror::Error;
use trellis_runtime::RuntimeError;
use trellis_storage::StorageError;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the orchestration layer.
///
/// Schema and action integrity errors are raised here before anything
/// reaches persistence. Expected user-input outcomes (guard rejection,
/// inadmissible transitions) are returned as data by the individual
/// services, not through this enum.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("schema integrity: {0}")]
    Schema(#[from] SchemaError),

    #[error("action definition: {0}")]
    Action(#[from] ActionError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("runtime: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("relationship not found: {0}")]
    RelationshipNotFound(RelationshipId),

    #[error("action type not found: {0}")]
    ActionTypeNotFound(ActionTypeId),

    #[error("pattern on property '{property}' does not compile: {message}")]
    InvalidPattern { property: String, message: String },

    #[error("required parameter '{0}' has no binding")]
    MissingParameter(String),

    #[error("action {0} is function-backed and cannot run on the declarative runtime")]
    FunctionBacked(ActionTypeId),
}
