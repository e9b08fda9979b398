//! Action parameters

use ontology_types::{EntityTypeId, PropertyType};
use serde::{Deserialize, Serialize};

/// A typed input slot on an action.
///
/// Parameters share the property type universe. Object-reference
/// parameters additionally pin the entity type their bound instance
/// must belong to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionParameter {
    /// Unique within the owning action.
    pub name: String,
    pub parameter_type: PropertyType,
    #[serde(default)]
    pub required: bool,
    /// Target entity type, present only for object references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_id: Option<EntityTypeId>,
}

impl ActionParameter {
    pub fn new(name: impl Into<String>, parameter_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            required: false,
            object_type_id: None,
        }
    }

    /// Object-reference parameter bound to instances of `target`.
    pub fn object_reference(name: impl Into<String>, target: EntityTypeId) -> Self {
        Self {
            object_type_id: Some(target),
            ..Self::new(name, PropertyType::ObjectReference)
        }
    }

    /// Mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_object_reference(&self) -> bool {
        self.parameter_type == PropertyType::ObjectReference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_reference_parameter() {
        let param = ActionParameter::object_reference("deal", EntityTypeId::new("et-deal")).required();
        assert!(param.is_object_reference());
        assert!(param.required);
        assert_eq!(param.object_type_id, Some(EntityTypeId::new("et-deal")));
    }

    #[test]
    fn test_scalar_parameter() {
        let param = ActionParameter::new("note", PropertyType::String);
        assert!(!param.is_object_reference());
        assert_eq!(param.object_type_id, None);
    }
}
