use std::collections::BTreeMap;

use action_types::{ActionType, ActionTypeId};
use async_trait::async_trait;
use ontology_types::{EntityType, EntityTypeId, Relationship, RelationshipId, TenantId};
use process_engine::Position;

use crate::StorageResult;

/// Storage interface for entity type definitions.
#[async_trait]
pub trait EntityTypeStore: Send + Sync {
    /// Insert a new entity type. Fails on id conflict.
    async fn create_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> StorageResult<()>;

    /// Get one entity type by id.
    async fn get_entity_type(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
    ) -> StorageResult<Option<EntityType>>;

    /// Replace an existing entity type.
    async fn update_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> StorageResult<()>;

    /// Remove an entity type definition.
    async fn delete_entity_type(&self, tenant: &TenantId, id: &EntityTypeId) -> StorageResult<()>;

    /// List a tenant's entity types in creation order.
    async fn list_entity_types(&self, tenant: &TenantId) -> StorageResult<Vec<EntityType>>;
}

/// Storage interface for relationships.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Insert a new relationship and return the stored form.
    ///
    /// Many-to-many creation atomically synthesizes and stores the
    /// backing junction entity type; the returned relationship carries
    /// its id.
    async fn create_relationship(
        &self,
        tenant: &TenantId,
        relationship: Relationship,
    ) -> StorageResult<Relationship>;

    /// Get one relationship by id.
    async fn get_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> StorageResult<Option<Relationship>>;

    /// Remove a relationship definition.
    async fn delete_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> StorageResult<()>;

    /// List a tenant's relationships in creation order.
    async fn list_relationships(&self, tenant: &TenantId) -> StorageResult<Vec<Relationship>>;
}

/// Storage interface for action type definitions.
#[async_trait]
pub trait ActionTypeStore: Send + Sync {
    /// Insert a new action type. Fails on id conflict.
    async fn create_action_type(&self, tenant: &TenantId, action: ActionType) -> StorageResult<()>;

    /// Get one action type by id.
    async fn get_action_type(
        &self,
        tenant: &TenantId,
        id: &ActionTypeId,
    ) -> StorageResult<Option<ActionType>>;

    /// Replace an existing action type.
    async fn update_action_type(&self, tenant: &TenantId, action: ActionType) -> StorageResult<()>;

    /// Remove an action type definition.
    async fn delete_action_type(&self, tenant: &TenantId, id: &ActionTypeId) -> StorageResult<()>;

    /// List a tenant's action types in creation order.
    async fn list_action_types(&self, tenant: &TenantId) -> StorageResult<Vec<ActionType>>;
}

/// Storage interface for saved canvas layouts.
///
/// A scope key names one canvas (for instance one entity type's
/// process view). Saves are whole-layout upserts; callers debounce.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    /// Load the saved positions for a scope, when any exist.
    async fn load_layout(
        &self,
        tenant: &TenantId,
        scope_key: &str,
    ) -> StorageResult<Option<BTreeMap<String, Position>>>;

    /// Save the positions for a scope, replacing any previous save.
    async fn save_layout(
        &self,
        tenant: &TenantId,
        scope_key: &str,
        positions: BTreeMap<String, Position>,
    ) -> StorageResult<()>;
}

/// Unified storage bundle used by Trellis service surfaces.
pub trait TrellisStorage:
    EntityTypeStore + RelationshipStore + ActionTypeStore + LayoutStore + Send + Sync
{
}

impl<T> TrellisStorage for T where
    T: EntityTypeStore + RelationshipStore + ActionTypeStore + LayoutStore + Send + Sync
{
}
