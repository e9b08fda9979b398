//! In-memory reference implementation for Trellis storage traits.
//!
//! This adapter is deterministic and test-friendly. Production
//! deployments should use a transactional backend for source-of-truth
//! data.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use action_types::{ActionType, ActionTypeId};
use async_trait::async_trait;
use ontology_types::{
    Cardinality, EntityType, EntityTypeId, Relationship, RelationshipId, TenantId,
};
use process_engine::Position;

use crate::traits::{ActionTypeStore, EntityTypeStore, LayoutStore, RelationshipStore};
use crate::{StorageError, StorageResult};

/// In-memory Trellis storage adapter.
#[derive(Default)]
pub struct InMemoryTrellisStorage {
    entity_types: RwLock<HashMap<(TenantId, EntityTypeId), EntityType>>,
    relationships: RwLock<HashMap<(TenantId, RelationshipId), Relationship>>,
    actions: RwLock<HashMap<(TenantId, ActionTypeId), ActionType>>,
    layouts: RwLock<HashMap<(TenantId, String), BTreeMap<String, Position>>>,
}

impl InMemoryTrellisStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityTypeStore for InMemoryTrellisStorage {
    async fn create_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> StorageResult<()> {
        let mut guard = self
            .entity_types
            .write()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        let key = (tenant.clone(), entity_type.id.clone());
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "entity type {} already exists",
                entity_type.id
            )));
        }
        guard.insert(key, entity_type);
        Ok(())
    }

    async fn get_entity_type(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
    ) -> StorageResult<Option<EntityType>> {
        let guard = self
            .entity_types
            .read()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        Ok(guard.get(&(tenant.clone(), id.clone())).cloned())
    }

    async fn update_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> StorageResult<()> {
        let mut guard = self
            .entity_types
            .write()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        let key = (tenant.clone(), entity_type.id.clone());
        if !guard.contains_key(&key) {
            return Err(StorageError::NotFound(format!(
                "entity type {} not found",
                entity_type.id
            )));
        }
        guard.insert(key, entity_type);
        Ok(())
    }

    async fn delete_entity_type(&self, tenant: &TenantId, id: &EntityTypeId) -> StorageResult<()> {
        let mut guard = self
            .entity_types
            .write()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        guard
            .remove(&(tenant.clone(), id.clone()))
            .ok_or_else(|| StorageError::NotFound(format!("entity type {id} not found")))?;
        Ok(())
    }

    async fn list_entity_types(&self, tenant: &TenantId) -> StorageResult<Vec<EntityType>> {
        let guard = self
            .entity_types
            .read()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        let mut values = guard
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, v)| v.clone())
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(values)
    }
}

#[async_trait]
impl RelationshipStore for InMemoryTrellisStorage {
    async fn create_relationship(
        &self,
        tenant: &TenantId,
        mut relationship: Relationship,
    ) -> StorageResult<Relationship> {
        // Lock order here is entity types before relationships; this
        // is the only method holding both.
        let mut types = self
            .entity_types
            .write()
            .map_err(|_| StorageError::Backend("entity type lock poisoned".to_string()))?;
        let mut relationships = self
            .relationships
            .write()
            .map_err(|_| StorageError::Backend("relationship lock poisoned".to_string()))?;

        let key = (tenant.clone(), relationship.id.clone());
        if relationships.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "relationship {} already exists",
                relationship.id
            )));
        }

        let source = types
            .get(&(tenant.clone(), relationship.source_entity_type_id.clone()))
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "source entity type {} not found",
                    relationship.source_entity_type_id
                ))
            })?
            .clone();
        let target = types
            .get(&(tenant.clone(), relationship.target_entity_type_id.clone()))
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "target entity type {} not found",
                    relationship.target_entity_type_id
                ))
            })?
            .clone();

        let mut junction = None;
        if relationship.cardinality == Cardinality::ManyToMany
            && relationship.junction_object_type_id.is_none()
        {
            let synthesized = EntityType::junction(
                relationship.id.clone(),
                format!("{} ↔ {}", source.display_name, target.display_name),
                &source,
                &target,
            );
            relationship = relationship.with_junction(synthesized.id.clone());
            junction = Some(synthesized);
        }

        relationship
            .validate()
            .map_err(|e| StorageError::InvariantViolation(e.to_string()))?;
        if let Some(junction) = junction {
            types.insert((tenant.clone(), junction.id.clone()), junction);
        }
        relationships.insert(key, relationship.clone());
        Ok(relationship)
    }

    async fn get_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> StorageResult<Option<Relationship>> {
        let guard = self
            .relationships
            .read()
            .map_err(|_| StorageError::Backend("relationship lock poisoned".to_string()))?;
        Ok(guard.get(&(tenant.clone(), id.clone())).cloned())
    }

    async fn delete_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> StorageResult<()> {
        let mut guard = self
            .relationships
            .write()
            .map_err(|_| StorageError::Backend("relationship lock poisoned".to_string()))?;
        guard
            .remove(&(tenant.clone(), id.clone()))
            .ok_or_else(|| StorageError::NotFound(format!("relationship {id} not found")))?;
        Ok(())
    }

    async fn list_relationships(&self, tenant: &TenantId) -> StorageResult<Vec<Relationship>> {
        let guard = self
            .relationships
            .read()
            .map_err(|_| StorageError::Backend("relationship lock poisoned".to_string()))?;
        let mut values = guard
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, v)| v.clone())
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(values)
    }
}

#[async_trait]
impl ActionTypeStore for InMemoryTrellisStorage {
    async fn create_action_type(&self, tenant: &TenantId, action: ActionType) -> StorageResult<()> {
        let mut guard = self
            .actions
            .write()
            .map_err(|_| StorageError::Backend("action lock poisoned".to_string()))?;
        let key = (tenant.clone(), action.id.clone());
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "action type {} already exists",
                action.id
            )));
        }
        guard.insert(key, action);
        Ok(())
    }

    async fn get_action_type(
        &self,
        tenant: &TenantId,
        id: &ActionTypeId,
    ) -> StorageResult<Option<ActionType>> {
        let guard = self
            .actions
            .read()
            .map_err(|_| StorageError::Backend("action lock poisoned".to_string()))?;
        Ok(guard.get(&(tenant.clone(), id.clone())).cloned())
    }

    async fn update_action_type(&self, tenant: &TenantId, action: ActionType) -> StorageResult<()> {
        let mut guard = self
            .actions
            .write()
            .map_err(|_| StorageError::Backend("action lock poisoned".to_string()))?;
        let key = (tenant.clone(), action.id.clone());
        if !guard.contains_key(&key) {
            return Err(StorageError::NotFound(format!(
                "action type {} not found",
                action.id
            )));
        }
        guard.insert(key, action);
        Ok(())
    }

    async fn delete_action_type(&self, tenant: &TenantId, id: &ActionTypeId) -> StorageResult<()> {
        let mut guard = self
            .actions
            .write()
            .map_err(|_| StorageError::Backend("action lock poisoned".to_string()))?;
        guard
            .remove(&(tenant.clone(), id.clone()))
            .ok_or_else(|| StorageError::NotFound(format!("action type {id} not found")))?;
        Ok(())
    }

    async fn list_action_types(&self, tenant: &TenantId) -> StorageResult<Vec<ActionType>> {
        let guard = self
            .actions
            .read()
            .map_err(|_| StorageError::Backend("action lock poisoned".to_string()))?;
        let mut values = guard
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, v)| v.clone())
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(values)
    }
}

#[async_trait]
impl LayoutStore for InMemoryTrellisStorage {
    async fn load_layout(
        &self,
        tenant: &TenantId,
        scope_key: &str,
    ) -> StorageResult<Option<BTreeMap<String, Position>>> {
        let guard = self
            .layouts
            .read()
            .map_err(|_| StorageError::Backend("layout lock poisoned".to_string()))?;
        Ok(guard.get(&(tenant.clone(), scope_key.to_string())).cloned())
    }

    async fn save_layout(
        &self,
        tenant: &TenantId,
        scope_key: &str,
        positions: BTreeMap<String, Position>,
    ) -> StorageResult<()> {
        let mut guard = self
            .layouts
            .write()
            .map_err(|_| StorageError::Backend("layout lock poisoned".to_string()))?;
        guard.insert((tenant.clone(), scope_key.to_string()), positions);
        Ok(())
    }
}
