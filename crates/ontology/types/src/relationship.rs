//! Relationships between entity types
//!
//! A relationship links two entity types with a declared cardinality.
//! One-to-many and many-to-one are backed by an object-reference
//! property on the many side; many-to-many is backed by a synthesized
//! junction entity type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntityTypeId, SchemaError, SchemaResult};

// ── Identifier ──────────────────────────────────────────────────────────────

/// Unique identifier for a relationship
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipId(pub String);

impl RelationshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("rel-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Cardinality ─────────────────────────────────────────────────────────────

/// Cardinality of a relationship, read source to target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cardinality {
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Whether traversing a hop of this cardinality yields several
    /// instances. Multi-valued hops need a quantifier in property paths.
    pub fn is_multi_valued(&self) -> bool {
        !matches!(self, Cardinality::ManyToOne)
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Cardinality::OneToMany => "ONE_TO_MANY",
            Cardinality::ManyToOne => "MANY_TO_ONE",
            Cardinality::ManyToMany => "MANY_TO_MANY",
        };
        write!(f, "{name}")
    }
}

// ── Relationship ────────────────────────────────────────────────────────────

/// A cardinality-typed link between two entity types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub display_name: String,
    pub cardinality: Cardinality,
    pub source_entity_type_id: EntityTypeId,
    pub target_entity_type_id: EntityTypeId,
    /// Label shown when reading the relationship source to target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_label: Option<String>,
    /// Label shown when reading the relationship target to source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_label: Option<String>,
    /// Object-reference property on the many side backing a
    /// one-to-many or many-to-one relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    /// Junction entity type backing a many-to-many relationship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction_object_type_id: Option<EntityTypeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// One source relates to many targets; each target holds the
    /// backing reference property pointing at its source.
    pub fn one_to_many(
        display_name: impl Into<String>,
        source: EntityTypeId,
        target: EntityTypeId,
        property_name: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(display_name, Cardinality::OneToMany, source, target)
            .backed_by(property_name)
    }

    /// Many sources relate to one target; each source holds the
    /// backing reference property pointing at its target.
    pub fn many_to_one(
        display_name: impl Into<String>,
        source: EntityTypeId,
        target: EntityTypeId,
        property_name: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(display_name, Cardinality::ManyToOne, source, target)
            .backed_by(property_name)
    }

    /// Many-to-many relationship. The backing junction entity type is
    /// synthesized and attached by the schema layer at creation time.
    pub fn many_to_many(
        display_name: impl Into<String>,
        source: EntityTypeId,
        target: EntityTypeId,
    ) -> Self {
        Self::with_cardinality(display_name, Cardinality::ManyToMany, source, target)
    }

    fn with_cardinality(
        display_name: impl Into<String>,
        cardinality: Cardinality,
        source: EntityTypeId,
        target: EntityTypeId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RelationshipId::generate(),
            display_name: display_name.into(),
            cardinality,
            source_entity_type_id: source,
            target_entity_type_id: target,
            forward_label: None,
            reverse_label: None,
            property_name: None,
            junction_object_type_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn backed_by(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = Some(property_name.into());
        self
    }

    /// Set the per-direction display labels.
    pub fn with_labels(
        mut self,
        forward: impl Into<String>,
        reverse: impl Into<String>,
    ) -> Self {
        self.forward_label = Some(forward.into());
        self.reverse_label = Some(reverse.into());
        self
    }

    /// Attach the synthesized junction entity type.
    pub fn with_junction(mut self, junction: EntityTypeId) -> Self {
        self.junction_object_type_id = Some(junction);
        self
    }

    /// Whether the relationship touches the given entity type on
    /// either side.
    pub fn involves(&self, entity_type: &EntityTypeId) -> bool {
        &self.source_entity_type_id == entity_type || &self.target_entity_type_id == entity_type
    }

    /// Check internal invariants.
    ///
    /// Self-relationships are only admissible as many-to-many;
    /// reference-backed cardinalities must name their property and
    /// many-to-many must carry its junction.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.source_entity_type_id == self.target_entity_type_id
            && self.cardinality != Cardinality::ManyToMany
        {
            return Err(SchemaError::SelfRelationship {
                display_name: self.display_name.clone(),
            });
        }
        match self.cardinality {
            Cardinality::OneToMany | Cardinality::ManyToOne => {
                if self.property_name.is_none() {
                    return Err(SchemaError::MissingReferenceProperty {
                        display_name: self.display_name.clone(),
                    });
                }
            }
            Cardinality::ManyToMany => {
                if self.junction_object_type_id.is_none() {
                    return Err(SchemaError::MissingJunction {
                        display_name: self.display_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_to_many_requires_property() {
        let mut rel = Relationship::one_to_many(
            "Deal Tasks",
            EntityTypeId::new("et-deal"),
            EntityTypeId::new("et-task"),
            "deal",
        );
        assert!(rel.validate().is_ok());
        rel.property_name = None;
        assert!(matches!(
            rel.validate(),
            Err(SchemaError::MissingReferenceProperty { .. })
        ));
    }

    #[test]
    fn test_many_to_many_requires_junction() {
        let rel = Relationship::many_to_many(
            "Deal Campaigns",
            EntityTypeId::new("et-deal"),
            EntityTypeId::new("et-campaign"),
        );
        assert!(matches!(
            rel.validate(),
            Err(SchemaError::MissingJunction { .. })
        ));
        let rel = rel.with_junction(EntityTypeId::new("et-junction"));
        assert!(rel.validate().is_ok());
    }

    #[test]
    fn test_self_relationship_only_many_to_many() {
        let deal = EntityTypeId::new("et-deal");
        let rel = Relationship::many_to_one("Parent Deal", deal.clone(), deal.clone(), "parent");
        assert!(matches!(
            rel.validate(),
            Err(SchemaError::SelfRelationship { .. })
        ));

        let rel = Relationship::many_to_many("Related Deals", deal.clone(), deal)
            .with_junction(EntityTypeId::new("et-junction"));
        assert!(rel.validate().is_ok());
    }

    #[test]
    fn test_cardinality_multi_valued() {
        assert!(Cardinality::OneToMany.is_multi_valued());
        assert!(Cardinality::ManyToMany.is_multi_valued());
        assert!(!Cardinality::ManyToOne.is_multi_valued());
    }

    #[test]
    fn test_cardinality_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Cardinality::OneToMany).unwrap();
        assert_eq!(json, "\"ONE_TO_MANY\"");
    }

    #[test]
    fn test_involves() {
        let rel = Relationship::many_to_one(
            "Deal Owner",
            EntityTypeId::new("et-deal"),
            EntityTypeId::new("et-user"),
            "owner",
        );
        assert!(rel.involves(&EntityTypeId::new("et-deal")));
        assert!(rel.involves(&EntityTypeId::new("et-user")));
        assert!(!rel.involves(&EntityTypeId::new("et-task")));
    }
}
