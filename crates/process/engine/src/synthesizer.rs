//! Transition synthesis: turning a drawn edge into an action
//!
//! When an operator connects two state nodes on the canvas, the
//! synthesizer produces the declarative action that realizes that
//! transition. The generator is pure; the caller persists the returned
//! action and the next classification pass picks it up.

use std::collections::BTreeMap;

use action_types::{
    ActionParameter, ActionRule, ActionType, GuardExpression, PropertyPath, PropertyValueConfig,
};
use convert_case::{Case, Casing};
use ontology_types::EntityTypeId;
use serde_json::json;

// ── Input and rejection ─────────────────────────────────────────────────────

/// One selected state node: a value of a state-capable property on an
/// entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSelection {
    pub object_type_id: EntityTypeId,
    pub object_type_name: String,
    pub state_property: String,
    pub state_value: String,
}

impl StateSelection {
    pub fn new(
        object_type_id: EntityTypeId,
        object_type_name: impl Into<String>,
        state_property: impl Into<String>,
        state_value: impl Into<String>,
    ) -> Self {
        Self {
            object_type_id,
            object_type_name: object_type_name.into(),
            state_property: state_property.into(),
            state_value: state_value.into(),
        }
    }
}

/// Typed rejection of a proposed transition. An expected user-input
/// outcome, surfaced to the caller as data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransitionRejected {
    #[error("source and target states belong to different object types")]
    DifferentObjectTypes,

    #[error("source and target states use different properties")]
    DifferentStateProperties,

    #[error("source and target are the same state")]
    IdenticalStates,
}

// ── Synthesis ───────────────────────────────────────────────────────────────

/// Check whether a transition between two selected states is
/// admissible.
pub fn validate_transition(
    source: &StateSelection,
    target: &StateSelection,
) -> Result<(), TransitionRejected> {
    if source.object_type_id != target.object_type_id {
        return Err(TransitionRejected::DifferentObjectTypes);
    }
    if source.state_property != target.state_property {
        return Err(TransitionRejected::DifferentStateProperties);
    }
    if source.state_value == target.state_value {
        return Err(TransitionRejected::IdenticalStates);
    }
    Ok(())
}

/// Generate the declarative action realizing `source → target`.
///
/// The action takes a single required object-reference parameter named
/// by camel-casing the entity type's display name, guards on the
/// source value and writes the target value. Nothing is persisted.
pub fn generate(
    source: &StateSelection,
    target: &StateSelection,
) -> Result<ActionType, TransitionRejected> {
    validate_transition(source, target)?;

    let parameter_name = source.object_type_name.to_case(Case::Camel);
    let display_name = format!("{} → {}", source.state_value, target.state_value);

    let action = ActionType::declarative(display_name)
        .with_parameter(
            ActionParameter::object_reference(&parameter_name, source.object_type_id.clone())
                .required(),
        )
        .with_criterion(GuardExpression::eq(
            PropertyPath::direct(&parameter_name, &source.state_property),
            json!(source.state_value),
        ))
        .with_rule(ActionRule::modify(
            &parameter_name,
            BTreeMap::from([(
                target.state_property.clone(),
                PropertyValueConfig::static_value(json!(target.state_value)),
            )]),
        ));
    Ok(action)
}
