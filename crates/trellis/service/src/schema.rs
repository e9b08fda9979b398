//! Schema administration.
//!
//! The single write path for entity types, relationships and action
//! types. Every mutation runs its integrity checks here, before
//! anything reaches persistence, and pushes the resulting definitions
//! to the action runtime so guard traversal and instance validation
//! always see the schema that storage holds.

use std::sync::Arc;

use action_types::{ActionRule, ActionType, ActionTypeId};
use ontology_types::{
    Cardinality, EntityType, EntityTypeId, PropertyDef, Relationship, RelationshipId, SchemaError,
    TenantId,
};
use ontology_validator::validate_pattern;
use trellis_runtime::ActionRuntime;
use trellis_storage::TrellisStorage;

use crate::{ServiceError, ServiceResult};

/// Validated CRUD over a tenant's schema.
pub struct SchemaService {
    storage: Arc<dyn TrellisStorage>,
    runtime: Arc<dyn ActionRuntime>,
}

impl SchemaService {
    pub fn new(storage: Arc<dyn TrellisStorage>, runtime: Arc<dyn ActionRuntime>) -> Self {
        Self { storage, runtime }
    }

    // ── Entity types ────────────────────────────────────────────────────────

    /// Create an entity type and register it with the runtime.
    pub async fn create_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> ServiceResult<EntityType> {
        entity_type.validate()?;
        for (key, def) in &entity_type.properties {
            check_pattern(key, def)?;
        }
        self.storage
            .create_entity_type(tenant, entity_type.clone())
            .await?;
        self.runtime
            .register_entity_type(entity_type.clone())
            .await?;
        tracing::info!(
            tenant = %tenant,
            entity_type = %entity_type.id,
            name = %entity_type.display_name,
            "entity type created"
        );
        Ok(entity_type)
    }

    /// Fetch one entity type.
    pub async fn get_entity_type(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
    ) -> ServiceResult<Option<EntityType>> {
        Ok(self.storage.get_entity_type(tenant, id).await?)
    }

    /// List the tenant's entity types in creation order.
    pub async fn list_entity_types(&self, tenant: &TenantId) -> ServiceResult<Vec<EntityType>> {
        Ok(self.storage.list_entity_types(tenant).await?)
    }

    /// Add a property to an existing entity type.
    pub async fn add_property(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
        key: &str,
        def: PropertyDef,
    ) -> ServiceResult<EntityType> {
        check_pattern(key, &def)?;
        let mut entity_type = self.require_entity_type(tenant, id).await?;
        entity_type.add_property(key, def)?;
        self.persist_entity_type(tenant, entity_type).await
    }

    /// Replace an existing property definition, picklist options
    /// included. Actions depending on a removed option classify as
    /// orphaned on the next graph build.
    pub async fn update_property(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
        key: &str,
        def: PropertyDef,
    ) -> ServiceResult<EntityType> {
        check_pattern(key, &def)?;
        let mut entity_type = self.require_entity_type(tenant, id).await?;
        entity_type.replace_property(key, def)?;
        self.persist_entity_type(tenant, entity_type).await
    }

    /// Remove a property. The title key is cleared when it named the
    /// removed property.
    pub async fn remove_property(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
        key: &str,
    ) -> ServiceResult<EntityType> {
        let mut entity_type = self.require_entity_type(tenant, id).await?;
        entity_type.remove_property(key)?;
        self.persist_entity_type(tenant, entity_type).await
    }

    /// Point the title key at an existing property.
    pub async fn set_title_key(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
        key: &str,
    ) -> ServiceResult<EntityType> {
        let mut entity_type = self.require_entity_type(tenant, id).await?;
        entity_type.set_title_key(key)?;
        self.persist_entity_type(tenant, entity_type).await
    }

    /// Drop the title key; instance labels fall back to semantic ids.
    pub async fn clear_title_key(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
    ) -> ServiceResult<EntityType> {
        let mut entity_type = self.require_entity_type(tenant, id).await?;
        entity_type.clear_title_key();
        self.persist_entity_type(tenant, entity_type).await
    }

    /// Delete an entity type.
    ///
    /// Refused while a relationship references the type on either end
    /// or as its junction. Refused while instances exist unless
    /// `cascade_instances` is set, in which case the runtime drops
    /// them together with the definition.
    pub async fn delete_entity_type(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
        cascade_instances: bool,
    ) -> ServiceResult<()> {
        let entity_type = self.require_entity_type(tenant, id).await?;
        for relationship in self.storage.list_relationships(tenant).await? {
            if relationship.involves(id)
                || relationship.junction_object_type_id.as_ref() == Some(id)
            {
                return Err(SchemaError::EntityTypeInUse {
                    entity_type: entity_type.display_name,
                    relationship: relationship.display_name,
                }
                .into());
            }
        }
        let count = self.runtime.count_instances(id).await?;
        if count > 0 && !cascade_instances {
            return Err(SchemaError::InstancesExist {
                entity_type: entity_type.display_name,
                count,
            }
            .into());
        }
        self.storage.delete_entity_type(tenant, id).await?;
        self.runtime.forget_entity_type(id).await?;
        tracing::info!(
            tenant = %tenant,
            entity_type = %id,
            instances_dropped = count,
            "entity type deleted"
        );
        Ok(())
    }

    // ── Relationships ───────────────────────────────────────────────────────

    /// Create a relationship between two existing entity types.
    ///
    /// Reference-backed cardinalities must name an object-reference
    /// property on the many side pointing at the other endpoint.
    /// Many-to-many creation synthesizes the backing junction entity
    /// type in storage and registers it with the runtime.
    pub async fn create_relationship(
        &self,
        tenant: &TenantId,
        relationship: Relationship,
    ) -> ServiceResult<Relationship> {
        let source = self
            .require_entity_type(tenant, &relationship.source_entity_type_id)
            .await?;
        let target = self
            .require_entity_type(tenant, &relationship.target_entity_type_id)
            .await?;

        if relationship.cardinality != Cardinality::ManyToMany {
            relationship.validate()?;
            // The many side owns the backing reference.
            let (owner, referenced) = match relationship.cardinality {
                Cardinality::OneToMany => (&target, &source),
                _ => (&source, &target),
            };
            check_backing_property(&relationship, owner, referenced)?;
        }

        let stored = self
            .storage
            .create_relationship(tenant, relationship)
            .await?;
        if let Some(junction_id) = &stored.junction_object_type_id {
            if let Some(junction) = self.storage.get_entity_type(tenant, junction_id).await? {
                self.runtime.register_entity_type(junction).await?;
            }
        }
        tracing::info!(
            tenant = %tenant,
            relationship = %stored.id,
            cardinality = %stored.cardinality,
            "relationship created"
        );
        Ok(stored)
    }

    /// Fetch one relationship.
    pub async fn get_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> ServiceResult<Option<Relationship>> {
        Ok(self.storage.get_relationship(tenant, id).await?)
    }

    /// List the tenant's relationships in creation order.
    pub async fn list_relationships(&self, tenant: &TenantId) -> ServiceResult<Vec<Relationship>> {
        Ok(self.storage.list_relationships(tenant).await?)
    }

    /// Delete a relationship.
    ///
    /// A junction dies with its relationship: the synthesized entity
    /// type and its link instances are removed as well.
    pub async fn delete_relationship(
        &self,
        tenant: &TenantId,
        id: &RelationshipId,
    ) -> ServiceResult<()> {
        let relationship = self
            .storage
            .get_relationship(tenant, id)
            .await?
            .ok_or_else(|| ServiceError::RelationshipNotFound(id.clone()))?;
        self.storage.delete_relationship(tenant, id).await?;
        if let Some(junction_id) = &relationship.junction_object_type_id {
            self.storage.delete_entity_type(tenant, junction_id).await?;
            self.runtime.forget_entity_type(junction_id).await?;
        }
        tracing::info!(tenant = %tenant, relationship = %id, "relationship deleted");
        Ok(())
    }

    // ── Action types ────────────────────────────────────────────────────────

    /// Create an action type.
    ///
    /// The definition must hang together internally and every entity
    /// type it names must exist for the tenant.
    pub async fn create_action_type(
        &self,
        tenant: &TenantId,
        action: ActionType,
    ) -> ServiceResult<ActionType> {
        action.validate()?;
        self.check_action_targets(tenant, &action).await?;
        self.storage
            .create_action_type(tenant, action.clone())
            .await?;
        tracing::info!(
            tenant = %tenant,
            action = %action.id,
            name = %action.display_name,
            "action type created"
        );
        Ok(action)
    }

    /// Fetch one action type.
    pub async fn get_action_type(
        &self,
        tenant: &TenantId,
        id: &ActionTypeId,
    ) -> ServiceResult<Option<ActionType>> {
        Ok(self.storage.get_action_type(tenant, id).await?)
    }

    /// List the tenant's action types in creation order.
    pub async fn list_action_types(&self, tenant: &TenantId) -> ServiceResult<Vec<ActionType>> {
        Ok(self.storage.list_action_types(tenant).await?)
    }

    /// Replace an existing action type.
    pub async fn update_action_type(
        &self,
        tenant: &TenantId,
        action: ActionType,
    ) -> ServiceResult<ActionType> {
        action.validate()?;
        self.check_action_targets(tenant, &action).await?;
        if self
            .storage
            .get_action_type(tenant, &action.id)
            .await?
            .is_none()
        {
            return Err(ServiceError::ActionTypeNotFound(action.id.clone()));
        }
        self.storage
            .update_action_type(tenant, action.clone())
            .await?;
        Ok(action)
    }

    /// Delete an action type.
    pub async fn delete_action_type(
        &self,
        tenant: &TenantId,
        id: &ActionTypeId,
    ) -> ServiceResult<()> {
        if self.storage.get_action_type(tenant, id).await?.is_none() {
            return Err(ServiceError::ActionTypeNotFound(id.clone()));
        }
        self.storage.delete_action_type(tenant, id).await?;
        tracing::info!(tenant = %tenant, action = %id, "action type deleted");
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    async fn require_entity_type(
        &self,
        tenant: &TenantId,
        id: &EntityTypeId,
    ) -> ServiceResult<EntityType> {
        self.storage
            .get_entity_type(tenant, id)
            .await?
            .ok_or_else(|| SchemaError::UnknownEntityType(id.clone()).into())
    }

    async fn persist_entity_type(
        &self,
        tenant: &TenantId,
        entity_type: EntityType,
    ) -> ServiceResult<EntityType> {
        self.storage
            .update_entity_type(tenant, entity_type.clone())
            .await?;
        self.runtime
            .register_entity_type(entity_type.clone())
            .await?;
        Ok(entity_type)
    }

    async fn check_action_targets(
        &self,
        tenant: &TenantId,
        action: &ActionType,
    ) -> ServiceResult<()> {
        for parameter in &action.config.parameters {
            if let Some(target) = &parameter.object_type_id {
                self.require_entity_type(tenant, target).await?;
            }
        }
        for rule in &action.config.rules {
            if let ActionRule::CreateObject { object_type_id, .. } = rule {
                self.require_entity_type(tenant, object_type_id).await?;
            }
        }
        Ok(())
    }
}

/// Pattern constraints must compile before a definition is accepted,
/// so the instance gate never meets an uncompilable pattern.
fn check_pattern(key: &str, def: &PropertyDef) -> ServiceResult<()> {
    if let Some(pattern) = def.validation.as_ref().and_then(|v| v.pattern.as_deref()) {
        validate_pattern(pattern).map_err(|message| ServiceError::InvalidPattern {
            property: key.to_string(),
            message,
        })?;
    }
    Ok(())
}

/// The named property must exist on the owning side, be an object
/// reference, and point at the opposite endpoint.
fn check_backing_property(
    relationship: &Relationship,
    owner: &EntityType,
    referenced: &EntityType,
) -> ServiceResult<()> {
    let Some(name) = relationship.property_name.as_deref() else {
        return Err(SchemaError::MissingReferenceProperty {
            display_name: relationship.display_name.clone(),
        }
        .into());
    };
    let def = owner
        .property(name)
        .ok_or_else(|| SchemaError::UnknownProperty {
            entity_type: owner.display_name.clone(),
            property: name.to_string(),
        })?;
    match &def.reference {
        Some(reference) if reference.target_entity_type_id == referenced.id => Ok(()),
        _ => Err(SchemaError::MissingReferenceProperty {
            display_name: relationship.display_name.clone(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_types::ActionParameter;
    use ontology_types::{PicklistConfig, PropertyValidation};
    use serde_json::json;
    use std::collections::BTreeMap;
    use trellis_runtime::memory::InMemoryActionRuntime;
    use trellis_runtime::InstanceAdmin;
    use trellis_storage::memory::InMemoryTrellisStorage;
    use trellis_storage::{ActionTypeStore, EntityTypeStore};

    fn tenant() -> TenantId {
        TenantId::new("acme")
    }

    fn fixtures() -> (
        SchemaService,
        Arc<InMemoryTrellisStorage>,
        Arc<InMemoryActionRuntime>,
    ) {
        let storage = Arc::new(InMemoryTrellisStorage::new());
        let runtime = Arc::new(InMemoryActionRuntime::new());
        let service = SchemaService::new(storage.clone(), runtime.clone());
        (service, storage, runtime)
    }

    fn make_deal() -> EntityType {
        EntityType::new("Deal")
            .with_property("name", PropertyDef::string("Name").required())
            .with_property(
                "stage",
                PropertyDef::string("Stage")
                    .with_picklist(PicklistConfig::single(vec!["Lead", "Qualified", "Won"])),
            )
    }

    #[tokio::test]
    async fn test_created_entity_type_is_usable_by_runtime() {
        let (service, _, runtime) = fixtures();
        let deal = service
            .create_entity_type(&tenant(), make_deal())
            .await
            .unwrap();

        let instance = runtime
            .create_instance(
                &deal.id,
                BTreeMap::from([("name".to_string(), json!("Acme renewal"))]),
            )
            .await
            .unwrap();
        assert_eq!(instance.object_type_id, deal.id);
    }

    #[tokio::test]
    async fn test_uncompilable_pattern_rejected_before_persistence() {
        let (service, storage, _) = fixtures();
        let bad = EntityType::new("Contact").with_property(
            "email",
            PropertyDef::string("Email").with_validation(PropertyValidation::pattern("[")),
        );

        let result = service.create_entity_type(&tenant(), bad).await;
        assert!(matches!(
            result,
            Err(ServiceError::InvalidPattern { property, .. }) if property == "email"
        ));
        assert!(storage.list_entity_types(&tenant()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_property_clears_title_key() {
        let (service, _, _) = fixtures();
        let deal = service
            .create_entity_type(&tenant(), make_deal())
            .await
            .unwrap();
        service
            .set_title_key(&tenant(), &deal.id, "name")
            .await
            .unwrap();

        let updated = service
            .remove_property(&tenant(), &deal.id, "name")
            .await
            .unwrap();
        assert_eq!(updated.title_key, None);
        assert!(!updated.properties.contains_key("name"));
    }

    #[tokio::test]
    async fn test_delete_refused_while_relationship_references_type() {
        let (service, _, _) = fixtures();
        let company = service
            .create_entity_type(
                &tenant(),
                EntityType::new("Company").with_property("name", PropertyDef::string("Name")),
            )
            .await
            .unwrap();
        let deal = service
            .create_entity_type(
                &tenant(),
                make_deal().with_property(
                    "company",
                    PropertyDef::reference("Company", company.id.clone()),
                ),
            )
            .await
            .unwrap();
        service
            .create_relationship(
                &tenant(),
                Relationship::one_to_many(
                    "Company Deals",
                    company.id.clone(),
                    deal.id.clone(),
                    "company",
                ),
            )
            .await
            .unwrap();

        let result = service.delete_entity_type(&tenant(), &company.id, false).await;
        assert!(matches!(
            result,
            Err(ServiceError::Schema(SchemaError::EntityTypeInUse { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_refused_while_instances_exist_unless_cascading() {
        let (service, storage, runtime) = fixtures();
        let deal = service
            .create_entity_type(&tenant(), make_deal())
            .await
            .unwrap();
        runtime
            .create_instance(
                &deal.id,
                BTreeMap::from([("name".to_string(), json!("Acme renewal"))]),
            )
            .await
            .unwrap();

        let result = service.delete_entity_type(&tenant(), &deal.id, false).await;
        assert!(matches!(
            result,
            Err(ServiceError::Schema(SchemaError::InstancesExist { count: 1, .. }))
        ));

        service
            .delete_entity_type(&tenant(), &deal.id, true)
            .await
            .unwrap();
        assert!(storage
            .get_entity_type(&tenant(), &deal.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(runtime.count_instances(&deal.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_one_to_many_requires_backing_reference_on_target() {
        let (service, _, _) = fixtures();
        let company = service
            .create_entity_type(
                &tenant(),
                EntityType::new("Company").with_property("name", PropertyDef::string("Name")),
            )
            .await
            .unwrap();
        let deal = service
            .create_entity_type(&tenant(), make_deal())
            .await
            .unwrap();

        // No "company" property on Deal at all.
        let result = service
            .create_relationship(
                &tenant(),
                Relationship::one_to_many(
                    "Company Deals",
                    company.id.clone(),
                    deal.id.clone(),
                    "company",
                ),
            )
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Schema(SchemaError::UnknownProperty { property, .. }))
                if property == "company"
        ));

        // A non-reference property with the right name is not enough.
        service
            .add_property(&tenant(), &deal.id, "company", PropertyDef::string("Company"))
            .await
            .unwrap();
        let result = service
            .create_relationship(
                &tenant(),
                Relationship::one_to_many(
                    "Company Deals",
                    company.id.clone(),
                    deal.id.clone(),
                    "company",
                ),
            )
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Schema(SchemaError::MissingReferenceProperty { .. }))
        ));
    }

    #[tokio::test]
    async fn test_many_to_many_registers_junction_with_runtime() {
        let (service, storage, runtime) = fixtures();
        let deal = service
            .create_entity_type(&tenant(), make_deal())
            .await
            .unwrap();
        let campaign = service
            .create_entity_type(
                &tenant(),
                EntityType::new("Campaign").with_property("name", PropertyDef::string("Name")),
            )
            .await
            .unwrap();

        let stored = service
            .create_relationship(
                &tenant(),
                Relationship::many_to_many("Deal Campaigns", deal.id.clone(), campaign.id.clone()),
            )
            .await
            .unwrap();
        let junction_id = stored.junction_object_type_id.clone().unwrap();
        assert_eq!(storage.list_entity_types(&tenant()).await.unwrap().len(), 3);

        let d = runtime
            .create_instance(&deal.id, BTreeMap::from([("name".to_string(), json!("D"))]))
            .await
            .unwrap();
        let c = runtime
            .create_instance(&campaign.id, BTreeMap::new())
            .await
            .unwrap();
        let link = runtime
            .create_instance(
                &junction_id,
                BTreeMap::from([
                    ("deal".to_string(), json!(d.id.as_str())),
                    ("campaign".to_string(), json!(c.id.as_str())),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(link.object_type_id, junction_id);

        service
            .delete_relationship(&tenant(), &stored.id)
            .await
            .unwrap();
        assert_eq!(storage.list_entity_types(&tenant()).await.unwrap().len(), 2);
        assert_eq!(runtime.count_instances(&junction_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_action_naming_unknown_entity_type_rejected() {
        let (service, storage, _) = fixtures();
        let action = ActionType::declarative("qualify").with_parameter(
            ActionParameter::object_reference("deal", EntityTypeId::new("et-ghost")).required(),
        );

        let result = service.create_action_type(&tenant(), action).await;
        assert!(matches!(
            result,
            Err(ServiceError::Schema(SchemaError::UnknownEntityType(_)))
        ));
        assert!(storage.list_action_types(&tenant()).await.unwrap().is_empty());
    }
}
