//! Mutation rules: what an action does when it executes
//!
//! Rules run in declared order. Each rule either creates an instance,
//! modifies the instance bound to a parameter, or deletes one. Property
//! writes resolve their value from a tagged source at execution time.

use std::collections::BTreeMap;

use ontology_types::EntityTypeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Value sources ───────────────────────────────────────────────────────────

/// Where a written property value comes from.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PropertyValueConfig {
    /// A literal baked into the rule.
    Static { value: Value },
    /// The value bound to one of the action's parameters.
    Parameter { parameter: String },
    /// The identity of the operator submitting the action.
    CurrentUser,
    /// The moment of execution.
    CurrentTimestamp,
}

impl PropertyValueConfig {
    pub fn static_value(value: Value) -> Self {
        Self::Static { value }
    }

    pub fn from_parameter(parameter: impl Into<String>) -> Self {
        Self::Parameter {
            parameter: parameter.into(),
        }
    }

    /// The literal, when this is a static source.
    pub fn as_static(&self) -> Option<&Value> {
        match self {
            Self::Static { value } => Some(value),
            _ => None,
        }
    }
}

// ── Rules ───────────────────────────────────────────────────────────────────

/// One mutation step of an action.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionRule {
    /// Create a fresh instance of an entity type.
    CreateObject {
        object_type_id: EntityTypeId,
        properties: BTreeMap<String, PropertyValueConfig>,
    },
    /// Write properties on the instance bound to a parameter.
    ModifyObject {
        object_parameter: String,
        properties: BTreeMap<String, PropertyValueConfig>,
    },
    /// Delete the instance bound to a parameter.
    DeleteObject { object_parameter: String },
}

impl ActionRule {
    pub fn create(
        object_type_id: EntityTypeId,
        properties: BTreeMap<String, PropertyValueConfig>,
    ) -> Self {
        Self::CreateObject {
            object_type_id,
            properties,
        }
    }

    pub fn modify(
        object_parameter: impl Into<String>,
        properties: BTreeMap<String, PropertyValueConfig>,
    ) -> Self {
        Self::ModifyObject {
            object_parameter: object_parameter.into(),
            properties,
        }
    }

    pub fn delete(object_parameter: impl Into<String>) -> Self {
        Self::DeleteObject {
            object_parameter: object_parameter.into(),
        }
    }

    /// The parameter the rule operates on, for the two parameter-bound
    /// rule kinds.
    pub fn object_parameter(&self) -> Option<&str> {
        match self {
            Self::CreateObject { .. } => None,
            Self::ModifyObject {
                object_parameter, ..
            }
            | Self::DeleteObject { object_parameter } => Some(object_parameter),
        }
    }
}
