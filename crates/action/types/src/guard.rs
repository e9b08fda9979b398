//! Guard expressions: comparison preconditions on actions
//!
//! A guard compares the value at the end of a property path against a
//! literal. An action's submission criteria are a conjunction of
//! guards; every one must hold before the action may execute.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionError, ActionResult, PropertyPath};

// ── Operator ────────────────────────────────────────────────────────────────

/// Comparison operator of a guard expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    IsNotNull,
}

impl ComparisonOperator {
    /// Whether the operator compares against a right-hand literal.
    pub fn is_binary(&self) -> bool {
        !matches!(self, ComparisonOperator::IsNull | ComparisonOperator::IsNotNull)
    }

    /// Display symbol used when rendering guards.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Neq => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::IsNull => "is null",
            ComparisonOperator::IsNotNull => "is not null",
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// ── Guard expression ────────────────────────────────────────────────────────

/// A single comparison precondition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GuardExpression {
    pub left: PropertyPath,
    pub operator: ComparisonOperator,
    /// Absent for the two null-check operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Value>,
}

impl GuardExpression {
    /// Binary comparison against a literal.
    pub fn compare(left: PropertyPath, operator: ComparisonOperator, right: Value) -> Self {
        Self {
            left,
            operator,
            right: Some(right),
        }
    }

    /// Equality against a literal.
    pub fn eq(left: PropertyPath, right: Value) -> Self {
        Self::compare(left, ComparisonOperator::Eq, right)
    }

    /// Null check.
    pub fn is_null(left: PropertyPath) -> Self {
        Self {
            left,
            operator: ComparisonOperator::IsNull,
            right: None,
        }
    }

    /// Non-null check.
    pub fn is_not_null(left: PropertyPath) -> Self {
        Self {
            left,
            operator: ComparisonOperator::IsNotNull,
            right: None,
        }
    }

    /// Check operator arity and the left path's segments.
    pub fn validate(&self) -> ActionResult<()> {
        self.left.validate()?;
        match (self.operator.is_binary(), &self.right) {
            (true, None) => Err(ActionError::MissingComparisonValue {
                operator: self.operator.symbol().to_string(),
            }),
            (false, Some(_)) => Err(ActionError::UnexpectedComparisonValue {
                operator: self.operator.symbol().to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Render the guard for display, e.g. `deal.stage = "Lead"`.
    pub fn describe(&self) -> String {
        match &self.right {
            Some(value) => format!("{} {} {}", self.left.describe(), self.operator.symbol(), value),
            None => format!("{} {}", self.left.describe(), self.operator.symbol()),
        }
    }
}
