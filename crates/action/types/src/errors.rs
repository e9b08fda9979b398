//! Error types for the action layer

/// Structural errors in action definitions.
///
/// Raised when an action's parameters, rules, guards or property paths
/// do not hang together. Caught at authoring time, before persistence.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action '{action}' declares parameter '{parameter}' more than once")]
    DuplicateParameter { action: String, parameter: String },

    #[error("action '{action}' references unknown parameter '{parameter}'")]
    UnknownParameter { action: String, parameter: String },

    #[error("parameter '{parameter}' must be an object reference")]
    NotObjectReference { parameter: String },

    #[error("object-reference parameter '{parameter}' is missing its target entity type")]
    MissingReferenceTarget { parameter: String },

    #[error("path segment '{property_key}' traverses a multi-valued relationship and needs a quantifier")]
    MissingQuantifier { property_key: String },

    #[error("path segment '{property_key}' is single-valued and must not carry a quantifier")]
    UnexpectedQuantifier { property_key: String },

    #[error("operator '{operator}' requires a comparison value")]
    MissingComparisonValue { operator: String },

    #[error("operator '{operator}' does not take a comparison value")]
    UnexpectedComparisonValue { operator: String },
}

/// Result type alias for action operations
pub type ActionResult<T> = Result<T, ActionError>;
