//! Object instances
//!
//! An instance is a dynamic property bag conforming to its entity type.
//! Every instance carries an immutable, human-facing semantic id
//! alongside its opaque primary id.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EntityType, EntityTypeId};

// ── Identifier ──────────────────────────────────────────────────────────────

/// Unique identifier for an object instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectInstanceId(pub String);

impl ObjectInstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("obj-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectInstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Object instance ─────────────────────────────────────────────────────────

/// A concrete record conforming to an entity type's property set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub id: ObjectInstanceId,
    pub object_type_id: EntityTypeId,
    /// Human-facing identifier, generated at creation, never mutated.
    pub semantic_id: String,
    /// Property values keyed by property name.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ObjectInstance {
    /// Create an instance of `entity_type` with the given payload.
    ///
    /// The payload is taken as-is; validation happens at the
    /// instance-validator gate before this constructor is reached.
    pub fn new(entity_type: &EntityType, data: BTreeMap<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectInstanceId::generate(),
            object_type_id: entity_type.id.clone(),
            semantic_id: generate_semantic_id(&entity_type.display_name),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read a property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Write a property value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    /// Human-readable label for this instance.
    ///
    /// Resolves the entity type's title key against the payload,
    /// falling back to the semantic id when the title property is
    /// absent or not a string.
    pub fn title(&self, entity_type: &EntityType) -> String {
        entity_type
            .title_key
            .as_deref()
            .and_then(|key| self.data.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.semantic_id.clone())
    }
}

/// Semantic id: an uppercase prefix drawn from the type's display name
/// plus a short random suffix, e.g. `DEAL-9f86d081`.
fn generate_semantic_id(display_name: &str) -> String {
    let prefix: String = display_name
        .chars()
        .filter(|c| c.is_alphabetic())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    let prefix = if prefix.is_empty() {
        "OBJ".to_string()
    } else {
        prefix
    };
    let suffix: String = uuid::Uuid::new_v4().to_string().chars().take(8).collect();
    format!("{prefix}-{suffix}")
}
