//! Parameter bindings and execution reports.

use std::collections::BTreeMap;

use ontology_types::ObjectInstanceId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Bindings ────────────────────────────────────────────────────────────────

/// Values bound to an action's parameters for one submission.
///
/// Object-reference parameters bind the instance id as a string;
/// scalar parameters bind the literal value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParameterBindings {
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

impl ParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an object-reference parameter to an instance.
    pub fn bind_instance(
        mut self,
        parameter: impl Into<String>,
        instance: &ObjectInstanceId,
    ) -> Self {
        self.values
            .insert(parameter.into(), Value::String(instance.as_str().to_string()));
        self
    }

    /// Bind a scalar parameter.
    pub fn bind_value(mut self, parameter: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(parameter.into(), value.into());
        self
    }

    pub fn get(&self, parameter: &str) -> Option<&Value> {
        self.values.get(parameter)
    }

    /// The instance id a parameter is bound to, when the binding
    /// exists and is a string.
    pub fn instance_id(&self, parameter: &str) -> Option<ObjectInstanceId> {
        self.values
            .get(parameter)
            .and_then(Value::as_str)
            .map(ObjectInstanceId::new)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

// ── Reports ─────────────────────────────────────────────────────────────────

/// What a rule execution changed, in rule order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub created: Vec<ObjectInstanceId>,
    pub modified: Vec<ObjectInstanceId>,
    pub deleted: Vec<ObjectInstanceId>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.created.len() + self.modified.len() + self.deleted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_instance_stores_string_id() {
        let id = ObjectInstanceId::new("obj-1");
        let bindings = ParameterBindings::new().bind_instance("deal", &id);
        assert_eq!(bindings.get("deal"), Some(&json!("obj-1")));
        assert_eq!(bindings.instance_id("deal"), Some(id));
    }

    #[test]
    fn test_instance_id_rejects_non_string_bindings() {
        let bindings = ParameterBindings::new().bind_value("amount", 100);
        assert_eq!(bindings.instance_id("amount"), None);
        assert_eq!(bindings.instance_id("missing"), None);
    }

    #[test]
    fn test_report_counts() {
        let mut report = ExecutionReport::new();
        assert!(report.is_empty());
        report.created.push(ObjectInstanceId::new("obj-1"));
        report.deleted.push(ObjectInstanceId::new("obj-2"));
        assert!(!report.is_empty());
        assert_eq!(report.total_changes(), 2);
    }
}
