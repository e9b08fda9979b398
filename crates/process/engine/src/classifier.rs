//! Action classification: which actions are state transitions
//!
//! Classification is derived, never stored. It is recomputed from the
//! raw schema and actions on every graph build, so removing a picklist
//! option instantly reclassifies the actions that depended on it.

use action_types::{ActionRule, ActionType, ComparisonOperator, GuardExpression};
use ontology_types::{EntityType, EntityTypeId};

use crate::state_node_id;

// ── Classification outcome ──────────────────────────────────────────────────

/// One side of a state transition: a concrete value of a state-capable
/// property on a concrete entity type.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionEndpoint {
    pub object_type_id: EntityTypeId,
    pub object_type_name: String,
    pub state_property: String,
    pub state_value: String,
    /// The action parameter the state was read from or written to.
    pub parameter: String,
}

impl TransitionEndpoint {
    /// Composite node id joining classification output to graph nodes.
    pub fn node_id(&self) -> String {
        state_node_id(&self.object_type_name, &self.state_value)
    }
}

/// Outcome of classifying one action against the current schema.
#[derive(Clone, Debug, PartialEq)]
pub enum Classification {
    /// No state condition and no state rule.
    Regular,
    /// The action references a state value that no longer exists in
    /// its property's picklist.
    Orphaned {
        reason: String,
        missing_state_value: String,
    },
    /// The action reads and/or writes a state-capable property.
    StateTransition {
        /// Present when the guard pins a source state.
        source: Option<TransitionEndpoint>,
        /// Present when a rule writes a target state.
        target: Option<TransitionEndpoint>,
        /// True iff source and target live on different entity types.
        is_cross_object: bool,
    },
}

impl Classification {
    pub fn is_state_transition(&self) -> bool {
        matches!(self, Classification::StateTransition { .. })
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(self, Classification::Orphaned { .. })
    }

    /// Guard side only: the action leaves its source state for
    /// nowhere the graph can see.
    pub fn has_source_only(&self) -> bool {
        matches!(
            self,
            Classification::StateTransition {
                source: Some(_),
                target: None,
                ..
            }
        )
    }

    /// Effect side only: the action lands on a state without a pinned
    /// origin.
    pub fn has_target_only(&self) -> bool {
        matches!(
            self,
            Classification::StateTransition {
                source: None,
                target: Some(_),
                ..
            }
        )
    }
}

// ── Classifier ──────────────────────────────────────────────────────────────

/// Classify `action` against the entity types in scope.
///
/// Pure function: identical inputs yield identical output. Only the
/// first submission criterion is inspected for a state condition;
/// later conjuncts are ignored.
pub fn classify(action: &ActionType, entity_types: &[EntityType]) -> Classification {
    let condition = find_state_condition(action, entity_types);
    let rule = find_state_rule(action, entity_types);

    if condition.is_none() && rule.is_none() {
        return Classification::Regular;
    }

    if let Some(candidate) = &condition {
        if let Some(orphaned) = check_membership(candidate, entity_types, "guard references") {
            return orphaned;
        }
    }
    if let Some(candidate) = &rule {
        if let Some(orphaned) = check_membership(candidate, entity_types, "rule writes") {
            return orphaned;
        }
    }

    let is_cross_object = match (&condition, &rule) {
        (Some(c), Some(r)) => c.object_type_id != r.object_type_id,
        _ => false,
    };
    Classification::StateTransition {
        source: condition,
        target: rule,
        is_cross_object,
    }
}

/// A state condition: the first submission criterion, when it is an
/// equality between a state-capable property and a string literal.
fn find_state_condition(
    action: &ActionType,
    entity_types: &[EntityType],
) -> Option<TransitionEndpoint> {
    let guard = action.config.submission_criteria.first()?;
    if guard.operator != ComparisonOperator::Eq {
        return None;
    }
    let value = guard.right.as_ref()?.as_str()?;

    let entity_type = resolve_path_type(action, guard, entity_types)?;
    let property_key = &guard.left.terminal_property;
    let def = entity_type.property(property_key)?;
    if !def.is_state_capable() {
        return None;
    }

    Some(TransitionEndpoint {
        object_type_id: entity_type.id.clone(),
        object_type_name: entity_type.display_name.clone(),
        state_property: property_key.clone(),
        state_value: value.to_string(),
        parameter: guard.left.base_parameter.clone(),
    })
}

/// A state rule: the first `modify_object` entry that statically
/// writes a string into a state-capable property of the modified
/// parameter's type.
fn find_state_rule(action: &ActionType, entity_types: &[EntityType]) -> Option<TransitionEndpoint> {
    for rule in &action.config.rules {
        let ActionRule::ModifyObject {
            object_parameter,
            properties,
        } = rule
        else {
            continue;
        };
        let Some(type_id) = action
            .parameter(object_parameter)
            .and_then(|p| p.object_type_id.as_ref())
        else {
            continue;
        };
        let Some(entity_type) = lookup(entity_types, type_id) else {
            continue;
        };

        for (property_key, config) in properties {
            let Some(value) = config.as_static().and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(def) = entity_type.property(property_key) else {
                continue;
            };
            if !def.is_state_capable() {
                continue;
            }
            return Some(TransitionEndpoint {
                object_type_id: entity_type.id.clone(),
                object_type_name: entity_type.display_name.clone(),
                state_property: property_key.clone(),
                state_value: value.to_string(),
                parameter: object_parameter.clone(),
            });
        }
    }
    None
}

/// Entity type owning a guard's terminal property: the last hop's type
/// for traversing paths, the base parameter's type otherwise.
fn resolve_path_type<'a>(
    action: &ActionType,
    guard: &GuardExpression,
    entity_types: &'a [EntityType],
) -> Option<&'a EntityType> {
    let type_id = match guard.left.terminal_object_type() {
        Some(id) => id.clone(),
        None => action
            .parameter(&guard.left.base_parameter)?
            .object_type_id
            .clone()?,
    };
    lookup(entity_types, &type_id)
}

/// Verify the endpoint's value is still one of its property's picklist
/// options; produce the orphaned classification when it is not.
fn check_membership(
    endpoint: &TransitionEndpoint,
    entity_types: &[EntityType],
    verb: &str,
) -> Option<Classification> {
    let present = lookup(entity_types, &endpoint.object_type_id)
        .and_then(|et| et.property(&endpoint.state_property))
        .and_then(|def| def.picklist.as_ref())
        .is_some_and(|picklist| picklist.contains(&endpoint.state_value));
    if present {
        return None;
    }
    Some(Classification::Orphaned {
        reason: format!(
            "{verb} '{}' which is not an option of '{}'",
            endpoint.state_value, endpoint.state_property
        ),
        missing_state_value: endpoint.state_value.clone(),
    })
}

fn lookup<'a>(entity_types: &'a [EntityType], id: &EntityTypeId) -> Option<&'a EntityType> {
    entity_types.iter().find(|et| &et.id == id)
}
