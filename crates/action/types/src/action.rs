//! Action types: named, parameterized units of automation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ActionError, ActionParameter, ActionResult, ActionRule, GuardExpression,
};

// ── Identifier ──────────────────────────────────────────────────────────────

/// Unique identifier for an action type
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionTypeId(pub String);

impl ActionTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("act-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Execution type ──────────────────────────────────────────────────────────

/// How an action's effects are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionType {
    /// Effects are fully described by the declared rules.
    Declarative,
    /// Effects are produced by an external function; rules and guards
    /// still describe intent for classification and display.
    FunctionBacked,
}

// ── Action config and action type ───────────────────────────────────────────

/// Declarative body of an action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionConfig {
    pub execution_type: ExecutionType,
    /// Input slots, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ActionParameter>,
    /// Mutation steps, applied in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ActionRule>,
    /// Conjunctive guard expressions; all must hold for eligibility.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submission_criteria: Vec<GuardExpression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActionConfig {
    pub fn declarative() -> Self {
        Self {
            execution_type: ExecutionType::Declarative,
            parameters: Vec::new(),
            rules: Vec::new(),
            submission_criteria: Vec::new(),
            description: None,
        }
    }
}

/// A named, tenant-scoped automation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionType {
    pub id: ActionTypeId,
    pub display_name: String,
    pub config: ActionConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionType {
    /// Empty declarative action with a fresh id.
    pub fn declarative(display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ActionTypeId::generate(),
            display_name: display_name.into(),
            config: ActionConfig::declarative(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, parameter: ActionParameter) -> Self {
        self.config.parameters.push(parameter);
        self
    }

    pub fn with_rule(mut self, rule: ActionRule) -> Self {
        self.config.rules.push(rule);
        self
    }

    pub fn with_criterion(mut self, guard: GuardExpression) -> Self {
        self.config.submission_criteria.push(guard);
        self
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ActionParameter> {
        self.config.parameters.iter().find(|p| p.name == name)
    }

    /// Check the action's internal consistency.
    ///
    /// Parameter names must be unique; object-reference parameters
    /// must carry a target type; every rule and guard must refer to an
    /// existing object-reference parameter; guards must be well-formed.
    pub fn validate(&self) -> ActionResult<()> {
        let mut seen = std::collections::BTreeSet::new();
        for parameter in &self.config.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(ActionError::DuplicateParameter {
                    action: self.display_name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
            if parameter.is_object_reference() && parameter.object_type_id.is_none() {
                return Err(ActionError::MissingReferenceTarget {
                    parameter: parameter.name.clone(),
                });
            }
        }

        for rule in &self.config.rules {
            if let Some(name) = rule.object_parameter() {
                self.require_object_parameter(name)?;
            }
        }

        for guard in &self.config.submission_criteria {
            guard.validate()?;
            self.require_object_parameter(&guard.left.base_parameter)?;
        }

        Ok(())
    }

    fn require_object_parameter(&self, name: &str) -> ActionResult<()> {
        let parameter = self
            .parameter(name)
            .ok_or_else(|| ActionError::UnknownParameter {
                action: self.display_name.clone(),
                parameter: name.to_string(),
            })?;
        if !parameter.is_object_reference() {
            return Err(ActionError::NotObjectReference {
                parameter: name.to_string(),
            });
        }
        Ok(())
    }
}
