//! Property paths: traversals from a parameter to a terminal property
//!
//! A path starts at an object-reference parameter, walks zero or more
//! relationship hops, and lands on a property of the final type. Every
//! multi-valued hop carries a quantifier saying how the fan-out is
//! collapsed. The quantifier is preserved per segment exactly as
//! authored; evaluation happens in the action runtime.

use ontology_types::{Cardinality, EntityTypeId};
use serde::{Deserialize, Serialize};

use crate::{ActionError, ActionResult};

// ── Quantifier ──────────────────────────────────────────────────────────────

/// How a multi-valued relationship hop is collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quantifier {
    /// At least one traversed instance must satisfy the remainder.
    Any,
    /// Every traversed instance must satisfy the remainder.
    All,
}

impl std::fmt::Display for Quantifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantifier::Any => write!(f, "ANY"),
            Quantifier::All => write!(f, "ALL"),
        }
    }
}

// ── Path segment ────────────────────────────────────────────────────────────

/// One relationship hop in a property path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathSegment {
    /// Property on the current type that carries the hop. For
    /// many-to-one this is the reference property itself; for the
    /// multi-valued cardinalities it names the relationship as seen
    /// from the current type.
    pub property_key: String,
    /// Entity type the hop lands on.
    pub object_type_id: EntityTypeId,
    pub cardinality: Cardinality,
    /// Required for multi-valued hops, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<Quantifier>,
}

impl PathSegment {
    /// Hop across a many-to-one reference. Single-valued, no
    /// quantifier.
    pub fn many_to_one(property_key: impl Into<String>, target: EntityTypeId) -> Self {
        Self {
            property_key: property_key.into(),
            object_type_id: target,
            cardinality: Cardinality::ManyToOne,
            quantifier: None,
        }
    }

    /// Hop across the many side of a one-to-many relationship.
    pub fn one_to_many(
        property_key: impl Into<String>,
        target: EntityTypeId,
        quantifier: Quantifier,
    ) -> Self {
        Self {
            property_key: property_key.into(),
            object_type_id: target,
            cardinality: Cardinality::OneToMany,
            quantifier: Some(quantifier),
        }
    }

    /// Hop across a many-to-many relationship.
    pub fn many_to_many(
        property_key: impl Into<String>,
        target: EntityTypeId,
        quantifier: Quantifier,
    ) -> Self {
        Self {
            property_key: property_key.into(),
            object_type_id: target,
            cardinality: Cardinality::ManyToMany,
            quantifier: Some(quantifier),
        }
    }

    /// Check the quantifier rule for this segment's cardinality.
    pub fn validate(&self) -> ActionResult<()> {
        match (self.cardinality.is_multi_valued(), self.quantifier) {
            (true, None) => Err(ActionError::MissingQuantifier {
                property_key: self.property_key.clone(),
            }),
            (false, Some(_)) => Err(ActionError::UnexpectedQuantifier {
                property_key: self.property_key.clone(),
            }),
            _ => Ok(()),
        }
    }
}

// ── Property path ───────────────────────────────────────────────────────────

/// A traversal from an action parameter to a terminal property.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyPath {
    /// Name of the object-reference parameter the path starts from.
    pub base_parameter: String,
    /// Relationship hops, applied in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<PathSegment>,
    /// Property read on the type the final hop lands on.
    pub terminal_property: String,
}

impl PropertyPath {
    /// Path with no hops: a property directly on the base parameter's
    /// type.
    pub fn direct(base_parameter: impl Into<String>, terminal_property: impl Into<String>) -> Self {
        Self {
            base_parameter: base_parameter.into(),
            segments: Vec::new(),
            terminal_property: terminal_property.into(),
        }
    }

    /// Append a hop.
    pub fn via(mut self, segment: PathSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Entity type of the final hop, when the path traverses at all.
    ///
    /// A hop-free path reads from the base parameter's own type, which
    /// lives on the parameter declaration, not here.
    pub fn terminal_object_type(&self) -> Option<&EntityTypeId> {
        self.segments.last().map(|s| &s.object_type_id)
    }

    /// Check every segment's quantifier rule.
    pub fn validate(&self) -> ActionResult<()> {
        for segment in &self.segments {
            segment.validate()?;
        }
        Ok(())
    }

    /// Render the path for display, e.g. `deal.campaigns[ANY].status`.
    pub fn describe(&self) -> String {
        let mut out = self.base_parameter.clone();
        for segment in &self.segments {
            out.push('.');
            out.push_str(&segment.property_key);
            if let Some(q) = segment.quantifier {
                out.push_str(&format!("[{q}]"));
            }
        }
        out.push('.');
        out.push_str(&self.terminal_property);
        out
    }
}
