//! Boundary contracts for the action runtime.
//!
//! Guard evaluation and rule execution are the two operations the
//! engine core delegates outward. `InstanceAdmin` is the lifecycle
//! surface both of them sit on top of: every write passes the
//! instance validator gate.

use std::collections::BTreeMap;

use action_types::{ActionRule, GuardExpression};
use async_trait::async_trait;
use ontology_types::{EntityType, EntityTypeId, ObjectInstance, ObjectInstanceId, UserId};
use serde_json::Value;

use crate::bindings::{ExecutionReport, ParameterBindings};
use crate::error::RuntimeResult;

/// Evaluates guard expressions against bound instances.
#[async_trait]
pub trait GuardEvaluator: Send + Sync {
    /// Evaluate one expression, honoring the property path's
    /// traversal and quantifier semantics exactly as authored.
    async fn evaluate(
        &self,
        expression: &GuardExpression,
        bindings: &ParameterBindings,
    ) -> RuntimeResult<bool>;

    /// Evaluate a conjunction, short-circuiting on the first
    /// expression that does not hold.
    async fn evaluate_all(
        &self,
        expressions: &[GuardExpression],
        bindings: &ParameterBindings,
    ) -> RuntimeResult<bool> {
        for expression in expressions {
            if !self.evaluate(expression, bindings).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Applies mutation rules in declared order.
///
/// Property value sources are resolved immediately before each write,
/// so a `current_timestamp` in a later rule observes a later instant.
#[async_trait]
pub trait RuleExecutor: Send + Sync {
    async fn execute(
        &self,
        rules: &[ActionRule],
        bindings: &ParameterBindings,
        current_user: &UserId,
    ) -> RuntimeResult<ExecutionReport>;
}

/// Validator-gated instance lifecycle.
///
/// The schema owner pushes entity type definitions here as they
/// change; the runtime validates and traverses against the pushed
/// snapshot.
#[async_trait]
pub trait InstanceAdmin: Send + Sync {
    /// Register or replace an entity type definition.
    async fn register_entity_type(&self, entity_type: EntityType) -> RuntimeResult<()>;

    /// Remove an entity type together with every instance of it.
    async fn forget_entity_type(&self, id: &EntityTypeId) -> RuntimeResult<()>;

    /// Create an instance. The payload must name only declared
    /// properties and pass the instance validator.
    async fn create_instance(
        &self,
        object_type_id: &EntityTypeId,
        data: BTreeMap<String, Value>,
    ) -> RuntimeResult<ObjectInstance>;

    async fn get_instance(&self, id: &ObjectInstanceId) -> RuntimeResult<Option<ObjectInstance>>;

    /// Merge `changes` into the instance payload, re-validating the
    /// merged result before committing.
    async fn update_instance(
        &self,
        id: &ObjectInstanceId,
        changes: BTreeMap<String, Value>,
    ) -> RuntimeResult<ObjectInstance>;

    /// Delete an instance plus everything owned through
    /// cascade-delete references. Returns all deleted ids, the root
    /// first.
    async fn delete_instance(&self, id: &ObjectInstanceId)
        -> RuntimeResult<Vec<ObjectInstanceId>>;

    async fn list_instances(
        &self,
        object_type_id: &EntityTypeId,
    ) -> RuntimeResult<Vec<ObjectInstance>>;

    async fn count_instances(&self, object_type_id: &EntityTypeId) -> RuntimeResult<usize>;
}

/// Full runtime surface.
pub trait ActionRuntime: GuardEvaluator + RuleExecutor + InstanceAdmin + Send + Sync {}

impl<T> ActionRuntime for T where T: GuardEvaluator + RuleExecutor + InstanceAdmin + Send + Sync {}
