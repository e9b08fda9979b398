//! Tenant-checked object lifecycle.
//!
//! The runtime keys instances by globally unique ids and knows nothing
//! about tenants. This service resolves every operation through the
//! tenant's stored schema first, so instances of another tenant's
//! types read as absent rather than forbidden.

use std::collections::BTreeMap;
use std::sync::Arc;

use ontology_types::{EntityTypeId, ObjectInstance, ObjectInstanceId, SchemaError, TenantId};
use serde_json::Value;
use trellis_runtime::{ActionRuntime, RuntimeError};
use trellis_storage::TrellisStorage;

use crate::ServiceResult;

/// Instance CRUD behind the tenant visibility gate.
pub struct ObjectService {
    storage: Arc<dyn TrellisStorage>,
    runtime: Arc<dyn ActionRuntime>,
}

impl ObjectService {
    pub fn new(storage: Arc<dyn TrellisStorage>, runtime: Arc<dyn ActionRuntime>) -> Self {
        Self { storage, runtime }
    }

    /// Create an instance of a tenant-owned entity type.
    pub async fn create_object(
        &self,
        tenant: &TenantId,
        object_type_id: &EntityTypeId,
        data: BTreeMap<String, Value>,
    ) -> ServiceResult<ObjectInstance> {
        self.require_visible_type(tenant, object_type_id).await?;
        Ok(self.runtime.create_instance(object_type_id, data).await?)
    }

    /// Fetch one instance.
    pub async fn get_object(
        &self,
        tenant: &TenantId,
        id: &ObjectInstanceId,
    ) -> ServiceResult<Option<ObjectInstance>> {
        let Some(instance) = self.runtime.get_instance(id).await? else {
            return Ok(None);
        };
        let visible = self
            .storage
            .get_entity_type(tenant, &instance.object_type_id)
            .await?
            .is_some();
        Ok(visible.then_some(instance))
    }

    /// Merge `changes` into an instance payload, re-validating the
    /// merged result.
    pub async fn update_object(
        &self,
        tenant: &TenantId,
        id: &ObjectInstanceId,
        changes: BTreeMap<String, Value>,
    ) -> ServiceResult<ObjectInstance> {
        self.require_visible_instance(tenant, id).await?;
        Ok(self.runtime.update_instance(id, changes).await?)
    }

    /// Delete an instance plus everything owned through cascade
    /// references. Returns the deleted ids, the root first.
    pub async fn delete_object(
        &self,
        tenant: &TenantId,
        id: &ObjectInstanceId,
    ) -> ServiceResult<Vec<ObjectInstanceId>> {
        self.require_visible_instance(tenant, id).await?;
        let deleted = self.runtime.delete_instance(id).await?;
        tracing::info!(tenant = %tenant, root = %id, total = deleted.len(), "object deleted");
        Ok(deleted)
    }

    /// List instances of a tenant-owned entity type in creation order.
    pub async fn list_objects(
        &self,
        tenant: &TenantId,
        object_type_id: &EntityTypeId,
    ) -> ServiceResult<Vec<ObjectInstance>> {
        self.require_visible_type(tenant, object_type_id).await?;
        Ok(self.runtime.list_instances(object_type_id).await?)
    }

    /// Count instances of a tenant-owned entity type.
    pub async fn count_objects(
        &self,
        tenant: &TenantId,
        object_type_id: &EntityTypeId,
    ) -> ServiceResult<usize> {
        self.require_visible_type(tenant, object_type_id).await?;
        Ok(self.runtime.count_instances(object_type_id).await?)
    }

    /// Human-readable label for an instance: the value under its
    /// type's title key, falling back to the semantic id.
    pub async fn object_title(
        &self,
        tenant: &TenantId,
        id: &ObjectInstanceId,
    ) -> ServiceResult<Option<String>> {
        let Some(instance) = self.get_object(tenant, id).await? else {
            return Ok(None);
        };
        match self
            .storage
            .get_entity_type(tenant, &instance.object_type_id)
            .await?
        {
            Some(entity_type) => Ok(Some(instance.title(&entity_type))),
            None => Ok(None),
        }
    }

    async fn require_visible_type(
        &self,
        tenant: &TenantId,
        object_type_id: &EntityTypeId,
    ) -> ServiceResult<()> {
        self.storage
            .get_entity_type(tenant, object_type_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| SchemaError::UnknownEntityType(object_type_id.clone()).into())
    }

    /// Cross-tenant instance ids read as unknown, not as forbidden.
    async fn require_visible_instance(
        &self,
        tenant: &TenantId,
        id: &ObjectInstanceId,
    ) -> ServiceResult<()> {
        match self.get_object(tenant, id).await? {
            Some(_) => Ok(()),
            None => Err(RuntimeError::UnknownInstance(id.clone()).into()),
        }
    }
}
