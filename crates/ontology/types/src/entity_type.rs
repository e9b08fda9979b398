//! Runtime-defined entity types
//!
//! An entity type is a tenant-scoped schema declared at runtime: a named
//! mapping of property keys to [`PropertyDef`]s, an optional title key,
//! and junction metadata when the type was synthesized to back a
//! many-to-many relationship.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

use crate::{
    PropertyDef, RelationshipId, SchemaError, SchemaResult,
};

// ── Identifier ──────────────────────────────────────────────────────────────

/// Unique identifier for an entity type
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityTypeId(pub String);

impl EntityTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("et-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Junction metadata ───────────────────────────────────────────────────────

/// Provenance of an auto-created junction entity type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JunctionMetadata {
    /// The many-to-many relationship this type was synthesized for.
    pub relationship_id: RelationshipId,
    pub source_entity_type_id: EntityTypeId,
    pub target_entity_type_id: EntityTypeId,
}

// ── Entity type ─────────────────────────────────────────────────────────────

/// A runtime-defined schema for object instances.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityType {
    pub id: EntityTypeId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Property declarations keyed by property name.
    ///
    /// BTreeMap: graph builds and validation walk properties in key
    /// order, which keeps derived output deterministic.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
    /// Property key used as the human-readable label for instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_key: Option<String>,
    /// Set when this type was synthesized to back a many-to-many
    /// relationship.
    #[serde(default)]
    pub is_junction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<JunctionMetadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityType {
    /// Create an empty entity type with a fresh id.
    pub fn new(display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: EntityTypeId::generate(),
            display_name: display_name.into(),
            description: None,
            properties: BTreeMap::new(),
            title_key: None,
            is_junction: false,
            junction: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Synthesize the junction entity type backing a many-to-many
    /// relationship.
    ///
    /// The junction carries one required cascade-deleting
    /// object-reference property per endpoint, keyed by the camel-cased
    /// endpoint display name. Junction types have no title key.
    pub fn junction(
        relationship_id: RelationshipId,
        display_name: impl Into<String>,
        source: &EntityType,
        target: &EntityType,
    ) -> Self {
        let mut junction = Self::new(display_name);
        junction.is_junction = true;
        junction.junction = Some(JunctionMetadata {
            relationship_id,
            source_entity_type_id: source.id.clone(),
            target_entity_type_id: target.id.clone(),
        });
        for endpoint in [source, target] {
            let key = endpoint.display_name.to_case(Case::Camel);
            junction.properties.insert(
                key,
                PropertyDef::reference(endpoint.display_name.clone(), endpoint.id.clone())
                    .required()
                    .cascade_delete(),
            );
        }
        junction
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a property during construction.
    pub fn with_property(mut self, key: impl Into<String>, def: PropertyDef) -> Self {
        self.properties.insert(key.into(), def);
        self
    }

    /// Add a property, refusing duplicates.
    pub fn add_property(&mut self, key: impl Into<String>, def: PropertyDef) -> SchemaResult<()> {
        let key = key.into();
        if self.properties.contains_key(&key) {
            return Err(SchemaError::DuplicateProperty {
                entity_type: self.display_name.clone(),
                property: key,
            });
        }
        self.properties.insert(key, def);
        self.touch();
        Ok(())
    }

    /// Replace an existing property definition.
    pub fn replace_property(&mut self, key: &str, def: PropertyDef) -> SchemaResult<()> {
        match self.properties.get_mut(key) {
            Some(slot) => {
                *slot = def;
                self.touch();
                Ok(())
            }
            None => Err(SchemaError::UnknownProperty {
                entity_type: self.display_name.clone(),
                property: key.to_string(),
            }),
        }
    }

    /// Remove a property, returning its definition.
    ///
    /// Clears the title key when it named the removed property.
    pub fn remove_property(&mut self, key: &str) -> SchemaResult<PropertyDef> {
        let removed = self
            .properties
            .remove(key)
            .ok_or_else(|| SchemaError::UnknownProperty {
                entity_type: self.display_name.clone(),
                property: key.to_string(),
            })?;
        if self.title_key.as_deref() == Some(key) {
            self.title_key = None;
        }
        self.touch();
        Ok(removed)
    }

    /// Set the title key to an existing property.
    pub fn set_title_key(&mut self, key: impl Into<String>) -> SchemaResult<()> {
        let key = key.into();
        if !self.properties.contains_key(&key) {
            return Err(SchemaError::TitleKeyUnknownProperty {
                entity_type: self.display_name.clone(),
                property: key,
            });
        }
        self.title_key = Some(key);
        self.touch();
        Ok(())
    }

    /// Drop the title key, falling back to semantic ids for labels.
    pub fn clear_title_key(&mut self) {
        self.title_key = None;
        self.touch();
    }

    /// Look up a property definition by key.
    pub fn property(&self, key: &str) -> Option<&PropertyDef> {
        self.properties.get(key)
    }

    /// Properties able to carry process state, in key order.
    pub fn state_capable_properties(&self) -> impl Iterator<Item = (&String, &PropertyDef)> {
        self.properties
            .iter()
            .filter(|(_, def)| def.is_state_capable())
    }

    /// Whether at least one property is state-capable.
    pub fn is_state_capable(&self) -> bool {
        self.state_capable_properties().next().is_some()
    }

    /// Check internal invariants.
    ///
    /// The title key, when present, must name an existing property.
    pub fn validate(&self) -> SchemaResult<()> {
        if let Some(title_key) = &self.title_key {
            if !self.properties.contains_key(title_key) {
                return Err(SchemaError::TitleKeyUnknownProperty {
                    entity_type: self.display_name.clone(),
                    property: title_key.clone(),
                });
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PicklistConfig;

    fn make_deal_type() -> EntityType {
        EntityType::new("Deal")
            .with_property("name", PropertyDef::string("Name").required())
            .with_property(
                "stage",
                PropertyDef::string("Stage")
                    .with_picklist(PicklistConfig::single(vec!["Lead", "Qualified", "Won"])),
            )
            .with_property("amount", PropertyDef::number("Amount"))
    }

    #[test]
    fn test_add_property_rejects_duplicate() {
        let mut deal = make_deal_type();
        let result = deal.add_property("name", PropertyDef::string("Name Again"));
        assert!(matches!(
            result,
            Err(SchemaError::DuplicateProperty { property, .. }) if property == "name"
        ));
    }

    #[test]
    fn test_remove_property_clears_title_key() {
        let mut deal = make_deal_type();
        deal.set_title_key("name").unwrap();
        deal.remove_property("name").unwrap();
        assert_eq!(deal.title_key, None);
    }

    #[test]
    fn test_remove_property_keeps_unrelated_title_key() {
        let mut deal = make_deal_type();
        deal.set_title_key("name").unwrap();
        deal.remove_property("amount").unwrap();
        assert_eq!(deal.title_key.as_deref(), Some("name"));
    }

    #[test]
    fn test_set_title_key_requires_existing_property() {
        let mut deal = make_deal_type();
        assert!(matches!(
            deal.set_title_key("nonexistent"),
            Err(SchemaError::TitleKeyUnknownProperty { .. })
        ));
    }

    #[test]
    fn test_state_capable_properties() {
        let deal = make_deal_type();
        let keys: Vec<&String> = deal.state_capable_properties().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["stage"]);
        assert!(deal.is_state_capable());
    }

    #[test]
    fn test_junction_synthesis() {
        let deal = make_deal_type();
        let campaign = EntityType::new("Marketing Campaign");
        let junction = EntityType::junction(
            RelationshipId::new("rel-1"),
            "Deal ↔ Marketing Campaign",
            &deal,
            &campaign,
        );

        assert!(junction.is_junction);
        assert_eq!(junction.title_key, None);
        let meta = junction.junction.as_ref().unwrap();
        assert_eq!(meta.source_entity_type_id, deal.id);
        assert_eq!(meta.target_entity_type_id, campaign.id);

        let deal_ref = junction.property("deal").unwrap();
        assert!(deal_ref.required);
        let reference = deal_ref.reference.as_ref().unwrap();
        assert_eq!(reference.target_entity_type_id, deal.id);
        assert!(reference.cascade_delete);

        let campaign_ref = junction.property("marketingCampaign").unwrap();
        assert_eq!(
            campaign_ref.reference.as_ref().unwrap().target_entity_type_id,
            campaign.id
        );
    }

    #[test]
    fn test_validate_detects_dangling_title_key() {
        let mut deal = make_deal_type();
        deal.title_key = Some("ghost".to_string());
        assert!(deal.validate().is_err());
    }
}
