//! Property definitions for runtime-defined entity types
//!
//! A property couples a primitive type with optional constraints
//! (picklist, validation rules, reference target). Properties are
//! declared at runtime and live inside an [`EntityType`](crate::EntityType).

use serde::{Deserialize, Serialize};

use crate::EntityTypeId;

// ── Property type ───────────────────────────────────────────────────────────

/// Primitive type of a property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Timestamp,
    ObjectReference,
    Array,
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Timestamp => "timestamp",
            PropertyType::ObjectReference => "object_reference",
            PropertyType::Array => "array",
        };
        write!(f, "{name}")
    }
}

// ── Picklist ────────────────────────────────────────────────────────────────

/// Closed set of admissible values for a string property.
///
/// A single-select picklist with at least one option is what makes a
/// property state-capable: its options become candidate state nodes in
/// process graphs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PicklistConfig {
    /// Admissible values, in declaration order.
    pub options: Vec<String>,
    /// Whether the stored value may hold several options at once.
    #[serde(default)]
    pub allow_multiple: bool,
    /// Value applied when an instance is created without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl PicklistConfig {
    /// Single-select picklist over the given options.
    pub fn single(options: Vec<impl Into<String>>) -> Self {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            allow_multiple: false,
            default_value: None,
        }
    }

    /// Multi-select picklist over the given options.
    pub fn multiple(options: Vec<impl Into<String>>) -> Self {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            allow_multiple: true,
            default_value: None,
        }
    }

    /// Set the default value applied at instance creation.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Whether `value` is one of the admissible options.
    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value)
    }

    /// Single-select with at least one option.
    pub fn is_single_select(&self) -> bool {
        !self.allow_multiple && !self.options.is_empty()
    }
}

// ── Reference config ────────────────────────────────────────────────────────

/// Link target for an object-reference property.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Entity type the stored instance id must belong to.
    pub target_entity_type_id: EntityTypeId,
    /// Delete instances holding this reference when the target is deleted.
    #[serde(default)]
    pub cascade_delete: bool,
}

impl ReferenceConfig {
    pub fn new(target: EntityTypeId) -> Self {
        Self {
            target_entity_type_id: target,
            cascade_delete: false,
        }
    }

    /// Enable cascade deletion from the referenced entity type.
    pub fn cascade(mut self) -> Self {
        self.cascade_delete = true;
        self
    }
}

// ── Validation rules ────────────────────────────────────────────────────────

/// Optional per-property validation constraints.
///
/// Length bounds apply to strings, numeric bounds to numbers, and the
/// pattern is an anchored-as-written regular expression for strings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl PropertyValidation {
    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        Self {
            min_length: min,
            max_length: max,
            ..Self::default()
        }
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Self::default()
        }
    }
}

// ── Property definition ─────────────────────────────────────────────────────

/// Declaration of a single property on an entity type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Human-readable name shown in tooling.
    pub display_name: String,
    /// Primitive type of the stored value.
    pub property_type: PropertyType,
    /// Whether instance payloads must carry a non-null value.
    #[serde(default)]
    pub required: bool,
    /// Present only for object-reference properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceConfig>,
    /// Optional validation constraints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<PropertyValidation>,
    /// Present when the property draws values from a closed option set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picklist: Option<PicklistConfig>,
}

impl PropertyDef {
    pub fn string(display_name: impl Into<String>) -> Self {
        Self::of_type(display_name, PropertyType::String)
    }

    pub fn number(display_name: impl Into<String>) -> Self {
        Self::of_type(display_name, PropertyType::Number)
    }

    pub fn boolean(display_name: impl Into<String>) -> Self {
        Self::of_type(display_name, PropertyType::Boolean)
    }

    pub fn timestamp(display_name: impl Into<String>) -> Self {
        Self::of_type(display_name, PropertyType::Timestamp)
    }

    pub fn array(display_name: impl Into<String>) -> Self {
        Self::of_type(display_name, PropertyType::Array)
    }

    /// Object-reference property pointing at `target`.
    pub fn reference(display_name: impl Into<String>, target: EntityTypeId) -> Self {
        Self {
            reference: Some(ReferenceConfig::new(target)),
            ..Self::of_type(display_name, PropertyType::ObjectReference)
        }
    }

    fn of_type(display_name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            display_name: display_name.into(),
            property_type,
            required: false,
            reference: None,
            validation: None,
            picklist: None,
        }
    }

    /// Mark the property as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a picklist.
    pub fn with_picklist(mut self, picklist: PicklistConfig) -> Self {
        self.picklist = Some(picklist);
        self
    }

    /// Attach validation constraints.
    pub fn with_validation(mut self, validation: PropertyValidation) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Enable cascade deletion on an object-reference property.
    ///
    /// No effect on non-reference properties.
    pub fn cascade_delete(mut self) -> Self {
        if let Some(reference) = self.reference.as_mut() {
            reference.cascade_delete = true;
        }
        self
    }

    /// Whether this property can carry process state.
    ///
    /// State-capable means: string-typed, backed by a single-select
    /// picklist with at least one option. Each option becomes a
    /// candidate state node.
    pub fn is_state_capable(&self) -> bool {
        self.property_type == PropertyType::String
            && self
                .picklist
                .as_ref()
                .is_some_and(|p| p.is_single_select())
    }
}
