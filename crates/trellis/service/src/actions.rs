//! Action submission.
//!
//! Submission gates on the action's criteria in declared order and
//! executes the rules only when every guard holds. A failing guard is
//! an expected outcome, reported with the guard's description; runtime
//! failures surface verbatim.

use std::sync::Arc;

use action_types::{ActionType, ActionTypeId, ExecutionType, GuardExpression};
use ontology_types::{TenantId, UserId};
use trellis_runtime::{ActionRuntime, ExecutionReport, ParameterBindings};
use trellis_storage::TrellisStorage;

use crate::{ServiceError, ServiceResult};

/// Outcome of submitting an action.
#[derive(Clone, Debug)]
pub enum SubmissionOutcome {
    /// Every criterion held and the rules ran.
    Executed(ExecutionReport),
    /// A submission criterion did not hold; nothing was executed.
    Rejected {
        /// Description of the first failing guard.
        guard: String,
    },
}

/// Submits declarative actions to the runtime.
pub struct ActionService {
    storage: Arc<dyn TrellisStorage>,
    runtime: Arc<dyn ActionRuntime>,
}

impl ActionService {
    pub fn new(storage: Arc<dyn TrellisStorage>, runtime: Arc<dyn ActionRuntime>) -> Self {
        Self { storage, runtime }
    }

    /// Submit an action with the given parameter bindings.
    ///
    /// Criteria are conjunctive and checked in declared order; the
    /// first failure rejects the submission. Rule execution is not
    /// retried on failure, rules are not assumed idempotent.
    pub async fn submit(
        &self,
        tenant: &TenantId,
        action_id: &ActionTypeId,
        bindings: &ParameterBindings,
        current_user: &UserId,
    ) -> ServiceResult<SubmissionOutcome> {
        let action = self.require_action(tenant, action_id).await?;
        if action.config.execution_type == ExecutionType::FunctionBacked {
            return Err(ServiceError::FunctionBacked(action.id));
        }
        for parameter in &action.config.parameters {
            if parameter.required && bindings.get(&parameter.name).is_none() {
                return Err(ServiceError::MissingParameter(parameter.name.clone()));
            }
        }

        if let Some(guard) = self
            .first_unsatisfied(&action.config.submission_criteria, bindings)
            .await?
        {
            tracing::info!(tenant = %tenant, action = %action.id, %guard, "submission rejected");
            return Ok(SubmissionOutcome::Rejected { guard });
        }

        let report = self
            .runtime
            .execute(&action.config.rules, bindings, current_user)
            .await?;
        tracing::info!(
            tenant = %tenant,
            action = %action.id,
            created = report.created.len(),
            modified = report.modified.len(),
            deleted = report.deleted.len(),
            "action executed"
        );
        Ok(SubmissionOutcome::Executed(report))
    }

    /// Check eligibility without executing anything: the description
    /// of the first failing criterion, or `None` when the action may
    /// run against the given bindings.
    pub async fn check_eligibility(
        &self,
        tenant: &TenantId,
        action_id: &ActionTypeId,
        bindings: &ParameterBindings,
    ) -> ServiceResult<Option<String>> {
        let action = self.require_action(tenant, action_id).await?;
        self.first_unsatisfied(&action.config.submission_criteria, bindings)
            .await
    }

    async fn require_action(
        &self,
        tenant: &TenantId,
        action_id: &ActionTypeId,
    ) -> ServiceResult<ActionType> {
        self.storage
            .get_action_type(tenant, action_id)
            .await?
            .ok_or_else(|| ServiceError::ActionTypeNotFound(action_id.clone()))
    }

    async fn first_unsatisfied(
        &self,
        criteria: &[GuardExpression],
        bindings: &ParameterBindings,
    ) -> ServiceResult<Option<String>> {
        for guard in criteria {
            if !self.runtime.evaluate(guard, bindings).await? {
                return Ok(Some(guard.describe()));
            }
        }
        Ok(None)
    }
}
