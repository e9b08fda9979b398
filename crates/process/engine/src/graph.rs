//! Process graph building
//!
//! The graph is derived on every read from the raw schema and actions.
//! State nodes come from tracked state-capable picklists; action nodes
//! and their edges come from classification. Nothing here is stored.

use std::collections::BTreeSet;

use action_types::{ActionType, ActionTypeId};
use ontology_types::EntityType;
use serde::{Deserialize, Serialize};

use crate::{classify, Classification};

// ── Node identifiers ────────────────────────────────────────────────────────

/// Composite id of a state node. This exact format is the join point
/// between classification output and built graphs.
pub fn state_node_id(object_type_name: &str, value: &str) -> String {
    format!("state::{object_type_name}::{value}")
}

/// Id of an action node.
pub fn action_node_id(action_id: &ActionTypeId) -> String {
    format!("action::{action_id}")
}

// ── Nodes and edges ─────────────────────────────────────────────────────────

/// What a node represents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessNodeKind {
    /// One picklist option of a tracked state-capable property.
    State {
        object_type_name: String,
        property_key: String,
        value: String,
    },
    /// One action, whether or not it transitions state.
    Action {
        action_id: ActionTypeId,
        #[serde(default)]
        orphaned: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        orphan_reason: Option<String>,
    },
}

/// A node of the derived process graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ProcessNodeKind,
}

impl ProcessNode {
    pub fn state(object_type_name: &str, property_key: &str, value: &str) -> Self {
        Self {
            id: state_node_id(object_type_name, value),
            label: value.to_string(),
            kind: ProcessNodeKind::State {
                object_type_name: object_type_name.to_string(),
                property_key: property_key.to_string(),
                value: value.to_string(),
            },
        }
    }

    pub fn action(action: &ActionType) -> Self {
        Self {
            id: action_node_id(&action.id),
            label: action.display_name.clone(),
            kind: ProcessNodeKind::Action {
                action_id: action.id.clone(),
                orphaned: false,
                orphan_reason: None,
            },
        }
    }

    pub fn orphaned_action(action: &ActionType, reason: impl Into<String>) -> Self {
        Self {
            id: action_node_id(&action.id),
            label: action.display_name.clone(),
            kind: ProcessNodeKind::Action {
                action_id: action.id.clone(),
                orphaned: true,
                orphan_reason: Some(reason.into()),
            },
        }
    }

    pub fn is_orphaned(&self) -> bool {
        matches!(
            self.kind,
            ProcessNodeKind::Action { orphaned: true, .. }
        )
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, ProcessNodeKind::State { .. })
    }
}

/// Which side of a transition an edge encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEdgeKind {
    /// Source state into the action that guards on it.
    Guard,
    /// Action into the state its rule writes.
    Effect,
}

/// A directed edge of the derived process graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessEdge {
    pub source: String,
    pub target: String,
    pub kind: ProcessEdgeKind,
}

impl ProcessEdge {
    pub fn guard(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: ProcessEdgeKind::Guard,
        }
    }

    pub fn effect(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: ProcessEdgeKind::Effect,
        }
    }

    /// Effect edges render with an arrowhead at the target.
    pub fn arrow_terminated(&self) -> bool {
        self.kind == ProcessEdgeKind::Effect
    }
}

/// The derived graph: state and action nodes plus transition edges.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub nodes: Vec<ProcessNode>,
    pub edges: Vec<ProcessEdge>,
}

impl ProcessGraph {
    pub fn node(&self, id: &str) -> Option<&ProcessNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Build the process graph for the given scope.
///
/// State nodes are emitted for every tracked state-capable property of
/// every entity type in scope, one per picklist option. Actions are
/// classified against the same scope; transition edges are only wired
/// to state nodes that exist in the graph.
pub fn build_graph(
    entity_types: &[EntityType],
    tracked_state_properties: &BTreeSet<String>,
    actions: &[ActionType],
) -> ProcessGraph {
    let mut graph = ProcessGraph::default();
    let mut seen = BTreeSet::new();

    for entity_type in entity_types {
        for (key, def) in entity_type.state_capable_properties() {
            if !tracked_state_properties.contains(key) {
                continue;
            }
            let Some(picklist) = &def.picklist else {
                continue;
            };
            for option in &picklist.options {
                let node = ProcessNode::state(&entity_type.display_name, key, option);
                if seen.insert(node.id.clone()) {
                    graph.nodes.push(node);
                }
            }
        }
    }

    for action in actions {
        match classify(action, entity_types) {
            Classification::Regular => {
                graph.nodes.push(ProcessNode::action(action));
            }
            Classification::Orphaned { reason, .. } => {
                graph.nodes.push(ProcessNode::orphaned_action(action, reason));
            }
            Classification::StateTransition { source, target, .. } => {
                let node = ProcessNode::action(action);
                let node_id = node.id.clone();
                graph.nodes.push(node);
                if let Some(endpoint) = source {
                    let state_id = endpoint.node_id();
                    if graph.contains_node(&state_id) {
                        graph.edges.push(ProcessEdge::guard(state_id, node_id.clone()));
                    }
                }
                if let Some(endpoint) = target {
                    let state_id = endpoint.node_id();
                    if graph.contains_node(&state_id) {
                        graph.edges.push(ProcessEdge::effect(node_id.clone(), state_id));
                    }
                }
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_types::{
        ActionParameter, ActionRule, GuardExpression, PropertyPath, PropertyValueConfig,
    };
    use ontology_types::{PicklistConfig, PropertyDef};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn make_deal_type() -> EntityType {
        EntityType::new("Deal")
            .with_property("name", PropertyDef::string("Name"))
            .with_property(
                "stage",
                PropertyDef::string("Stage")
                    .with_picklist(PicklistConfig::single(vec!["Lead", "Qualified", "Won"])),
            )
    }

    fn make_qualify_action(deal: &EntityType) -> ActionType {
        ActionType::declarative("qualify")
            .with_parameter(ActionParameter::object_reference("deal", deal.id.clone()).required())
            .with_criterion(GuardExpression::eq(
                PropertyPath::direct("deal", "stage"),
                json!("Lead"),
            ))
            .with_rule(ActionRule::modify(
                "deal",
                BTreeMap::from([(
                    "stage".to_string(),
                    PropertyValueConfig::static_value(json!("Qualified")),
                )]),
            ))
    }

    fn tracked(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_state_nodes_follow_option_order() {
        let deal = make_deal_type();
        let graph = build_graph(&[deal], &tracked(&["stage"]), &[]);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "state::Deal::Lead",
                "state::Deal::Qualified",
                "state::Deal::Won"
            ]
        );
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_untracked_properties_emit_no_state_nodes() {
        let deal = make_deal_type();
        let graph = build_graph(&[deal], &BTreeSet::new(), &[]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_full_transition_wires_both_edges() {
        let deal = make_deal_type();
        let action = make_qualify_action(&deal);
        let action_node = action_node_id(&action.id);
        let graph = build_graph(&[deal], &tracked(&["stage"]), &[action]);

        assert_eq!(graph.nodes.len(), 4);
        assert_eq!(graph.edges.len(), 2);

        let guard = &graph.edges[0];
        assert_eq!(guard.kind, ProcessEdgeKind::Guard);
        assert_eq!(guard.source, "state::Deal::Lead");
        assert_eq!(guard.target, action_node);
        assert!(!guard.arrow_terminated());

        let effect = &graph.edges[1];
        assert_eq!(effect.kind, ProcessEdgeKind::Effect);
        assert_eq!(effect.source, action_node);
        assert_eq!(effect.target, "state::Deal::Qualified");
        assert!(effect.arrow_terminated());
    }

    #[test]
    fn test_transition_edges_require_existing_state_nodes() {
        let deal = make_deal_type();
        let action = make_qualify_action(&deal);
        // Stage is state-capable but untracked, so no state nodes
        // exist for the edges to land on.
        let graph = build_graph(&[deal], &BTreeSet::new(), &[action]);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_orphaned_action_renders_without_edges() {
        let mut deal = make_deal_type();
        let action = make_qualify_action(&deal);
        let stage = deal.properties.get_mut("stage").unwrap();
        stage.picklist.as_mut().unwrap().options.retain(|o| o != "Qualified");

        let graph = build_graph(&[deal], &tracked(&["stage"]), &[action]);
        let orphan = graph
            .nodes
            .iter()
            .find(|n| n.is_orphaned())
            .expect("orphaned node");
        let ProcessNodeKind::Action {
            orphan_reason: Some(reason),
            ..
        } = &orphan.kind
        else {
            panic!("expected orphan reason");
        };
        assert!(reason.contains("Qualified"));
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_regular_action_still_visible() {
        let deal = make_deal_type();
        let action = ActionType::declarative("annotate")
            .with_parameter(ActionParameter::object_reference("deal", deal.id.clone()));
        let graph = build_graph(&[deal], &tracked(&["stage"]), &[action]);
        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.edges.is_empty());
        let node = graph.nodes.last().unwrap();
        assert!(!node.is_orphaned());
        assert!(!node.is_state());
    }

    #[test]
    fn test_partial_transition_wires_one_edge() {
        let deal = make_deal_type();
        let action = ActionType::declarative("mark won")
            .with_parameter(ActionParameter::object_reference("deal", deal.id.clone()))
            .with_rule(ActionRule::modify(
                "deal",
                BTreeMap::from([(
                    "stage".to_string(),
                    PropertyValueConfig::static_value(json!("Won")),
                )]),
            ));
        let graph = build_graph(&[deal], &tracked(&["stage"]), &[action]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, ProcessEdgeKind::Effect);
        assert_eq!(graph.edges[0].target, "state::Deal::Won");
    }

    #[test]
    fn test_node_serialization_shape() {
        let node = ProcessNode::state("Deal", "stage", "Lead");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "state::Deal::Lead");
        assert_eq!(value["kind"], "state");
        assert_eq!(value["value"], "Lead");
    }
}
