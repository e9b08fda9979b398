//! Canvas rendering and editing.
//!
//! The process graph is derived fresh on every render from the stored
//! schema and actions; only node positions persist. Drawing an edge
//! between two state nodes synthesizes a transition action, and the
//! next render picks it up.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use action_types::ActionType;
use ontology_types::{SchemaError, TenantId};
use process_engine::{
    apply_layout, build_graph, generate, layout, Position, ProcessGraph, StateSelection,
    TransitionRejected,
};
use serde::{Deserialize, Serialize};
use trellis_storage::TrellisStorage;

use crate::ServiceResult;

/// One rendered canvas: the derived graph plus a position per node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Canvas {
    pub graph: ProcessGraph,
    pub positions: BTreeMap<String, Position>,
}

/// Outcome of drawing an edge between two state nodes.
#[derive(Clone, Debug)]
pub enum ConnectOutcome {
    /// The synthesized transition action, already persisted.
    Created(ActionType),
    /// The pairing is not admissible. An expected user-input outcome.
    Rejected(TransitionRejected),
}

/// Derives and lays out process canvases.
pub struct CanvasService {
    storage: Arc<dyn TrellisStorage>,
}

impl CanvasService {
    pub fn new(storage: Arc<dyn TrellisStorage>) -> Self {
        Self { storage }
    }

    /// Render the canvas for a scope.
    ///
    /// State nodes come from tracked state-capable properties, action
    /// nodes and edges from classification. Saved positions are kept
    /// verbatim; only nodes without one are laid out.
    pub async fn render(
        &self,
        tenant: &TenantId,
        scope_key: &str,
        tracked_state_properties: &BTreeSet<String>,
    ) -> ServiceResult<Canvas> {
        let entity_types = self.storage.list_entity_types(tenant).await?;
        let actions = self.storage.list_action_types(tenant).await?;
        let graph = build_graph(&entity_types, tracked_state_properties, &actions);

        let positions = match self.storage.load_layout(tenant, scope_key).await? {
            Some(saved) => apply_layout(&graph, &saved),
            None => layout(&graph),
        };
        Ok(Canvas { graph, positions })
    }

    /// Persist the positions for a scope, replacing any previous save.
    ///
    /// Saves are whole-layout upserts. Callers debounce to one write
    /// per settling period; a lost save costs a relayout, nothing more.
    pub async fn save_positions(
        &self,
        tenant: &TenantId,
        scope_key: &str,
        positions: BTreeMap<String, Position>,
    ) -> ServiceResult<()> {
        Ok(self
            .storage
            .save_layout(tenant, scope_key, positions)
            .await?)
    }

    /// Turn a drawn edge between two state nodes into a persisted
    /// transition action.
    ///
    /// Persisting the action and rebuilding the graph are separate
    /// operations; a crash in between leaves nothing dangling, the
    /// next render simply does not see the new action yet.
    pub async fn connect_states(
        &self,
        tenant: &TenantId,
        source: &StateSelection,
        target: &StateSelection,
    ) -> ServiceResult<ConnectOutcome> {
        let action = match generate(source, target) {
            Ok(action) => action,
            Err(rejected) => return Ok(ConnectOutcome::Rejected(rejected)),
        };
        if self
            .storage
            .get_entity_type(tenant, &source.object_type_id)
            .await?
            .is_none()
        {
            return Err(SchemaError::UnknownEntityType(source.object_type_id.clone()).into());
        }
        self.storage
            .create_action_type(tenant, action.clone())
            .await?;
        tracing::info!(
            tenant = %tenant,
            action = %action.id,
            name = %action.display_name,
            "transition action synthesized"
        );
        Ok(ConnectOutcome::Created(action))
    }
}
