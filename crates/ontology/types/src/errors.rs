//! Error types for the ontology layer

use crate::EntityTypeId;

/// Schema-integrity errors.
///
/// These are raised locally, before anything reaches persistence. Field-level
/// validation of instance payloads is NOT an error — it is returned as a
/// per-field map by the instance validator.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("entity type not found: {0}")]
    UnknownEntityType(EntityTypeId),

    #[error("property '{property}' not found on entity type '{entity_type}'")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    #[error("duplicate property '{property}' on entity type '{entity_type}'")]
    DuplicateProperty {
        entity_type: String,
        property: String,
    },

    #[error("title key '{property}' does not name a property of entity type '{entity_type}'")]
    TitleKeyUnknownProperty {
        entity_type: String,
        property: String,
    },

    #[error("self-relationship '{display_name}' must be many-to-many")]
    SelfRelationship { display_name: String },

    #[error("relationship '{display_name}' must name the object-reference property backing it")]
    MissingReferenceProperty { display_name: String },

    #[error("many-to-many relationship '{display_name}' is missing its junction entity type")]
    MissingJunction { display_name: String },

    #[error("entity type '{entity_type}' is still referenced by relationship '{relationship}'")]
    EntityTypeInUse {
        entity_type: String,
        relationship: String,
    },

    #[error("entity type '{entity_type}' still owns {count} instance(s)")]
    InstancesExist { entity_type: String, count: usize },
}

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
