//! In-memory action runtime.
//!
//! Reference implementation of the runtime boundary: instances live in
//! process memory, guard evaluation walks relationships over that
//! store, and rules mutate it behind the instance validator gate.
//!
//! Hop semantics:
//! - many-to-one follows the reference property on the current
//!   instance; a missing or dangling reference yields an empty hop.
//! - one-to-many collects instances of the segment type whose backing
//!   reference points at the current instance.
//! - many-to-many crosses the junction type bridging the two endpoint
//!   types.
//!
//! A multi-valued hop collapses under its quantifier: ANY over an
//! empty hop is false, ALL over an empty hop is true. A many-to-one
//! hop collapses like ANY over its zero-or-one instances, so a broken
//! reference makes the whole comparison false regardless of operator.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::RwLock;

use action_types::{
    ActionRule, ComparisonOperator, GuardExpression, PathSegment, PropertyValueConfig, Quantifier,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ontology_types::{
    Cardinality, EntityType, EntityTypeId, ObjectInstance, ObjectInstanceId, UserId,
};
use ontology_validator::InstanceValidator;
use serde_json::Value;

use crate::bindings::{ExecutionReport, ParameterBindings};
use crate::error::{RuntimeError, RuntimeResult};
use crate::traits::{GuardEvaluator, InstanceAdmin, RuleExecutor};

// ── Adapter ─────────────────────────────────────────────────────────────────

/// In-memory action runtime adapter.
///
/// Entity types are registered by the schema owner as they change;
/// traversal and validation read the registered snapshot. Instance ids
/// are globally unique, so the store is not partitioned further.
#[derive(Default)]
pub struct InMemoryActionRuntime {
    entity_types: RwLock<HashMap<EntityTypeId, EntityType>>,
    instances: RwLock<HashMap<ObjectInstanceId, ObjectInstance>>,
    validator: InstanceValidator,
}

impl InMemoryActionRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

// ── Guard evaluation ────────────────────────────────────────────────────────

#[async_trait]
impl GuardEvaluator for InMemoryActionRuntime {
    async fn evaluate(
        &self,
        expression: &GuardExpression,
        bindings: &ParameterBindings,
    ) -> RuntimeResult<bool> {
        let base_id = bindings
            .instance_id(&expression.left.base_parameter)
            .ok_or_else(|| {
                RuntimeError::UnboundParameter(expression.left.base_parameter.clone())
            })?;

        let types = self
            .entity_types
            .read()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        let instances = self
            .instances
            .read()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        let base = instances
            .get(&base_id)
            .ok_or_else(|| RuntimeError::UnknownInstance(base_id.clone()))?;

        Ok(eval_path(
            &types,
            &instances,
            base,
            &expression.left.segments,
            &expression.left.terminal_property,
            expression.operator,
            expression.right.as_ref(),
        ))
    }
}

fn eval_path(
    types: &HashMap<EntityTypeId, EntityType>,
    instances: &HashMap<ObjectInstanceId, ObjectInstance>,
    current: &ObjectInstance,
    segments: &[PathSegment],
    terminal: &str,
    operator: ComparisonOperator,
    right: Option<&Value>,
) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return compare(current.get(terminal), operator, right);
    };

    let hops = traverse(types, instances, current, segment);
    // A multi-valued segment without a quantifier is rejected at
    // authoring time; Any keeps evaluation total if one slips through.
    let quantifier = match segment.cardinality {
        Cardinality::ManyToOne => Quantifier::Any,
        _ => segment.quantifier.unwrap_or(Quantifier::Any),
    };
    match quantifier {
        Quantifier::Any => hops
            .iter()
            .any(|hop| eval_path(types, instances, hop, rest, terminal, operator, right)),
        Quantifier::All => hops
            .iter()
            .all(|hop| eval_path(types, instances, hop, rest, terminal, operator, right)),
    }
}

fn traverse(
    types: &HashMap<EntityTypeId, EntityType>,
    instances: &HashMap<ObjectInstanceId, ObjectInstance>,
    current: &ObjectInstance,
    segment: &PathSegment,
) -> Vec<ObjectInstance> {
    match segment.cardinality {
        Cardinality::ManyToOne => current
            .get(&segment.property_key)
            .and_then(Value::as_str)
            .map(ObjectInstanceId::new)
            .and_then(|id| instances.get(&id))
            .filter(|hop| hop.object_type_id == segment.object_type_id)
            .map(|hop| vec![hop.clone()])
            .unwrap_or_default(),

        Cardinality::OneToMany => {
            let mut hops: Vec<ObjectInstance> = instances
                .values()
                .filter(|candidate| candidate.object_type_id == segment.object_type_id)
                .filter(|candidate| {
                    candidate.get(&segment.property_key).and_then(Value::as_str)
                        == Some(current.id.as_str())
                })
                .cloned()
                .collect();
            hops.sort_by(|a, b| a.id.cmp(&b.id));
            hops
        }

        Cardinality::ManyToMany => traverse_junction(types, instances, current, segment),
    }
}

fn traverse_junction(
    types: &HashMap<EntityTypeId, EntityType>,
    instances: &HashMap<ObjectInstanceId, ObjectInstance>,
    current: &ObjectInstance,
    segment: &PathSegment,
) -> Vec<ObjectInstance> {
    let Some((junction_id, near_key, far_key)) =
        find_junction(types, &current.object_type_id, &segment.object_type_id)
    else {
        return Vec::new();
    };

    let mut far_ids: Vec<ObjectInstanceId> = instances
        .values()
        .filter(|row| row.object_type_id == junction_id)
        .filter(|row| row.get(&near_key).and_then(Value::as_str) == Some(current.id.as_str()))
        .filter_map(|row| {
            row.get(&far_key)
                .and_then(Value::as_str)
                .map(ObjectInstanceId::new)
        })
        .collect();
    far_ids.sort();
    far_ids.dedup();

    far_ids
        .into_iter()
        .filter_map(|id| instances.get(&id))
        .filter(|hop| hop.object_type_id == segment.object_type_id)
        .cloned()
        .collect()
}

/// Junction type bridging `near` and `far`, plus the property keys
/// holding each side's reference.
fn find_junction(
    types: &HashMap<EntityTypeId, EntityType>,
    near: &EntityTypeId,
    far: &EntityTypeId,
) -> Option<(EntityTypeId, String, String)> {
    let mut candidates: Vec<&EntityType> = types
        .values()
        .filter(|candidate| {
            candidate.junction.as_ref().is_some_and(|metadata| {
                (metadata.source_entity_type_id == *near
                    && metadata.target_entity_type_id == *far)
                    || (metadata.source_entity_type_id == *far
                        && metadata.target_entity_type_id == *near)
            })
        })
        .collect();
    candidates.sort_by(|a, b| a.id.cmp(&b.id));
    candidates.into_iter().find_map(|junction| {
        let near_key = reference_key(junction, near)?;
        let far_key = reference_key(junction, far)?;
        Some((junction.id.clone(), near_key, far_key))
    })
}

/// First property on `junction` whose reference targets `target`.
fn reference_key(junction: &EntityType, target: &EntityTypeId) -> Option<String> {
    junction.properties.iter().find_map(|(key, def)| {
        def.reference
            .as_ref()
            .filter(|config| config.target_entity_type_id == *target)
            .map(|_| key.clone())
    })
}

// ── Comparison ──────────────────────────────────────────────────────────────

fn compare(actual: Option<&Value>, operator: ComparisonOperator, right: Option<&Value>) -> bool {
    match operator {
        ComparisonOperator::IsNull => is_absent(actual),
        ComparisonOperator::IsNotNull => !is_absent(actual),
        ComparisonOperator::Eq => match (actual, right) {
            (Some(a), Some(b)) => values_equal(a, b),
            _ => false,
        },
        ComparisonOperator::Neq => match (actual, right) {
            (Some(a), Some(b)) => !values_equal(a, b),
            (None, Some(_)) => true,
            _ => false,
        },
        ComparisonOperator::Gt => ordering(actual, right) == Some(Ordering::Greater),
        ComparisonOperator::Gte => matches!(
            ordering(actual, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        ComparisonOperator::Lt => ordering(actual, right) == Some(Ordering::Less),
        ComparisonOperator::Lte => matches!(
            ordering(actual, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

/// Relative order of two values, when they are comparable: both
/// number-coercible, or both timestamps.
fn ordering(actual: Option<&Value>, right: Option<&Value>) -> Option<Ordering> {
    let (a, b) = (actual?, right?);
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_timestamp(a), as_timestamp(b)) {
        return Some(x.cmp(&y));
    }
    None
}

/// Numbers compare numerically even when one side arrives as a
/// numeric string; the validator accepts both encodings for number
/// properties.
fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    a == b
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

// ── Rule execution ──────────────────────────────────────────────────────────

#[async_trait]
impl RuleExecutor for InMemoryActionRuntime {
    async fn execute(
        &self,
        rules: &[ActionRule],
        bindings: &ParameterBindings,
        current_user: &UserId,
    ) -> RuntimeResult<ExecutionReport> {
        let mut report = ExecutionReport::new();
        for rule in rules {
            match rule {
                ActionRule::CreateObject {
                    object_type_id,
                    properties,
                } => {
                    let data = resolve_properties(properties, bindings, current_user)?;
                    let created = self.create_instance(object_type_id, data).await?;
                    report.created.push(created.id);
                }
                ActionRule::ModifyObject {
                    object_parameter,
                    properties,
                } => {
                    let id = bindings.instance_id(object_parameter).ok_or_else(|| {
                        RuntimeError::UnboundParameter(object_parameter.clone())
                    })?;
                    let changes = resolve_properties(properties, bindings, current_user)?;
                    let updated = self.update_instance(&id, changes).await?;
                    report.modified.push(updated.id);
                }
                ActionRule::DeleteObject { object_parameter } => {
                    let id = bindings.instance_id(object_parameter).ok_or_else(|| {
                        RuntimeError::UnboundParameter(object_parameter.clone())
                    })?;
                    report.deleted.extend(self.delete_instance(&id).await?);
                }
            }
        }
        tracing::debug!(
            created = report.created.len(),
            modified = report.modified.len(),
            deleted = report.deleted.len(),
            "rules executed"
        );
        Ok(report)
    }
}

fn resolve_properties(
    properties: &BTreeMap<String, PropertyValueConfig>,
    bindings: &ParameterBindings,
    current_user: &UserId,
) -> RuntimeResult<BTreeMap<String, Value>> {
    let mut resolved = BTreeMap::new();
    for (key, config) in properties {
        resolved.insert(key.clone(), resolve_value(config, bindings, current_user)?);
    }
    Ok(resolved)
}

fn resolve_value(
    config: &PropertyValueConfig,
    bindings: &ParameterBindings,
    current_user: &UserId,
) -> RuntimeResult<Value> {
    Ok(match config {
        PropertyValueConfig::Static { value } => value.clone(),
        PropertyValueConfig::Parameter { parameter } => bindings
            .get(parameter)
            .cloned()
            .ok_or_else(|| RuntimeError::UnboundParameter(parameter.clone()))?,
        PropertyValueConfig::CurrentUser => Value::String(current_user.as_str().to_string()),
        PropertyValueConfig::CurrentTimestamp => Value::String(Utc::now().to_rfc3339()),
    })
}

// ── Instance lifecycle ──────────────────────────────────────────────────────

#[async_trait]
impl InstanceAdmin for InMemoryActionRuntime {
    async fn register_entity_type(&self, entity_type: EntityType) -> RuntimeResult<()> {
        let mut types = self
            .entity_types
            .write()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        types.insert(entity_type.id.clone(), entity_type);
        Ok(())
    }

    async fn forget_entity_type(&self, id: &EntityTypeId) -> RuntimeResult<()> {
        let mut types = self
            .entity_types
            .write()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        types.remove(id);
        instances.retain(|_, instance| instance.object_type_id != *id);
        Ok(())
    }

    async fn create_instance(
        &self,
        object_type_id: &EntityTypeId,
        data: BTreeMap<String, Value>,
    ) -> RuntimeResult<ObjectInstance> {
        let types = self
            .entity_types
            .read()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;

        let entity_type = types
            .get(object_type_id)
            .ok_or_else(|| RuntimeError::UnknownEntityType(object_type_id.clone()))?;
        ensure_declared(entity_type, data.keys())?;
        let errors = self.validator.validate(&data, &entity_type.properties);
        if !errors.is_empty() {
            return Err(RuntimeError::Validation {
                entity_type: entity_type.id.clone(),
                fields: errors,
            });
        }

        let instance = ObjectInstance::new(entity_type, data);
        instances.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    async fn get_instance(&self, id: &ObjectInstanceId) -> RuntimeResult<Option<ObjectInstance>> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        Ok(instances.get(id).cloned())
    }

    async fn update_instance(
        &self,
        id: &ObjectInstanceId,
        changes: BTreeMap<String, Value>,
    ) -> RuntimeResult<ObjectInstance> {
        let types = self
            .entity_types
            .read()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;

        let instance = instances
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownInstance(id.clone()))?;
        let entity_type = types
            .get(&instance.object_type_id)
            .ok_or_else(|| RuntimeError::UnknownEntityType(instance.object_type_id.clone()))?;
        ensure_declared(entity_type, changes.keys())?;

        let mut merged = instance.data.clone();
        merged.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        let errors = self.validator.validate(&merged, &entity_type.properties);
        if !errors.is_empty() {
            return Err(RuntimeError::Validation {
                entity_type: entity_type.id.clone(),
                fields: errors,
            });
        }

        for (key, value) in changes {
            instance.set(key, value);
        }
        Ok(instance.clone())
    }

    async fn delete_instance(
        &self,
        id: &ObjectInstanceId,
    ) -> RuntimeResult<Vec<ObjectInstanceId>> {
        let types = self
            .entity_types
            .read()
            .map_err(|_| RuntimeError::Backend("entity type lock poisoned".to_string()))?;
        let mut instances = self
            .instances
            .write()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        if !instances.contains_key(id) {
            return Err(RuntimeError::UnknownInstance(id.clone()));
        }

        let mut deleted = Vec::new();
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(next) = queue.pop_front() {
            let Some(removed) = instances.remove(&next) else {
                continue;
            };
            // Instances holding a cascade-delete reference to the
            // removed one die with it, transitively.
            let mut dependents: Vec<ObjectInstanceId> = instances
                .values()
                .filter(|candidate| references_with_cascade(&types, candidate, &removed.id))
                .map(|candidate| candidate.id.clone())
                .collect();
            dependents.sort();
            queue.extend(dependents);
            deleted.push(next);
        }

        if deleted.len() > 1 {
            tracing::debug!(root = %id, cascaded = deleted.len() - 1, "cascade delete");
        }
        Ok(deleted)
    }

    async fn list_instances(
        &self,
        object_type_id: &EntityTypeId,
    ) -> RuntimeResult<Vec<ObjectInstance>> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        let mut values: Vec<ObjectInstance> = instances
            .values()
            .filter(|instance| instance.object_type_id == *object_type_id)
            .cloned()
            .collect();
        values.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(values)
    }

    async fn count_instances(&self, object_type_id: &EntityTypeId) -> RuntimeResult<usize> {
        let instances = self
            .instances
            .read()
            .map_err(|_| RuntimeError::Backend("instance lock poisoned".to_string()))?;
        Ok(instances
            .values()
            .filter(|instance| instance.object_type_id == *object_type_id)
            .count())
    }
}

fn ensure_declared<'a>(
    entity_type: &EntityType,
    keys: impl Iterator<Item = &'a String>,
) -> RuntimeResult<()> {
    for key in keys {
        if !entity_type.properties.contains_key(key) {
            return Err(RuntimeError::UnknownProperty {
                entity_type: entity_type.id.clone(),
                property: key.clone(),
            });
        }
    }
    Ok(())
}

fn references_with_cascade(
    types: &HashMap<EntityTypeId, EntityType>,
    candidate: &ObjectInstance,
    target: &ObjectInstanceId,
) -> bool {
    let Some(entity_type) = types.get(&candidate.object_type_id) else {
        return false;
    };
    entity_type.properties.iter().any(|(key, def)| {
        def.reference
            .as_ref()
            .is_some_and(|config| config.cascade_delete)
            && candidate.get(key).and_then(Value::as_str) == Some(target.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_types::PropertyPath;
    use ontology_types::{PicklistConfig, PropertyDef, RelationshipId};
    use serde_json::json;

    fn make_company() -> EntityType {
        EntityType::new("Company").with_property("name", PropertyDef::string("Name").required())
    }

    fn make_deal(company: &EntityType) -> EntityType {
        EntityType::new("Deal")
            .with_property("name", PropertyDef::string("Name").required())
            .with_property(
                "stage",
                PropertyDef::string("Stage").with_picklist(PicklistConfig::single(vec![
                    "Lead",
                    "Qualified",
                    "Won",
                ])),
            )
            .with_property("amount", PropertyDef::number("Amount"))
            .with_property("owner", PropertyDef::string("Owner"))
            .with_property("company", PropertyDef::reference("Company", company.id.clone()))
    }

    fn make_campaign() -> EntityType {
        EntityType::new("Campaign")
            .with_property("name", PropertyDef::string("Name").required())
            .with_property(
                "status",
                PropertyDef::string("Status")
                    .with_picklist(PicklistConfig::single(vec!["Draft", "Active"])),
            )
    }

    async fn runtime_with_deal() -> (InMemoryActionRuntime, EntityType, EntityType) {
        let runtime = InMemoryActionRuntime::new();
        let company = make_company();
        let deal = make_deal(&company);
        runtime.register_entity_type(company.clone()).await.unwrap();
        runtime.register_entity_type(deal.clone()).await.unwrap();
        (runtime, company, deal)
    }

    fn deal_data(name: &str, stage: &str) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("name".to_string(), json!(name)),
            ("stage".to_string(), json!(stage)),
        ])
    }

    #[tokio::test]
    async fn test_create_gate_rejects_missing_required() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let result = runtime.create_instance(&deal.id, BTreeMap::new()).await;
        match result {
            Err(RuntimeError::Validation { fields, .. }) => {
                assert!(fields.contains_key("name"), "fields: {fields:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_gate_rejects_undeclared_property() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let mut data = deal_data("Acme Renewal", "Lead");
        data.insert("ghost".to_string(), json!("boo"));
        let result = runtime.create_instance(&deal.id, data).await;
        assert!(matches!(
            result,
            Err(RuntimeError::UnknownProperty { property, .. }) if property == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_create_requires_registered_type() {
        let runtime = InMemoryActionRuntime::new();
        let result = runtime
            .create_instance(&EntityTypeId::new("et-ghost"), BTreeMap::new())
            .await;
        assert!(matches!(result, Err(RuntimeError::UnknownEntityType(_))));
    }

    #[tokio::test]
    async fn test_update_merges_and_revalidates() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let instance = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();

        let updated = runtime
            .update_instance(
                &instance.id,
                BTreeMap::from([("stage".to_string(), json!("Qualified"))]),
            )
            .await
            .unwrap();
        assert_eq!(updated.get("stage"), Some(&json!("Qualified")));
        assert_eq!(updated.get("name"), Some(&json!("Acme Renewal")));

        let result = runtime
            .update_instance(
                &instance.id,
                BTreeMap::from([("stage".to_string(), json!("NotAStage"))]),
            )
            .await;
        assert!(matches!(result, Err(RuntimeError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_direct_guard_on_picklist() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let instance = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let bindings = ParameterBindings::new().bind_instance("deal", &instance.id);

        let guard = GuardExpression::eq(PropertyPath::direct("deal", "stage"), json!("Lead"));
        assert!(runtime.evaluate(&guard, &bindings).await.unwrap());

        let guard = GuardExpression::eq(PropertyPath::direct("deal", "stage"), json!("Won"));
        assert!(!runtime.evaluate(&guard, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_many_to_one_hop_reads_parent_property() {
        let (runtime, company, deal) = runtime_with_deal().await;
        let acme = runtime
            .create_instance(
                &company.id,
                BTreeMap::from([("name".to_string(), json!("Acme"))]),
            )
            .await
            .unwrap();
        let mut data = deal_data("Acme Renewal", "Lead");
        data.insert("company".to_string(), json!(acme.id.as_str()));
        let instance = runtime.create_instance(&deal.id, data).await.unwrap();
        let bindings = ParameterBindings::new().bind_instance("deal", &instance.id);

        let path = PropertyPath::direct("deal", "name")
            .via(PathSegment::many_to_one("company", company.id.clone()));
        let guard = GuardExpression::eq(path, json!("Acme"));
        assert!(runtime.evaluate(&guard, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_broken_reference_hop_is_false() {
        let (runtime, company, deal) = runtime_with_deal().await;
        let instance = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let bindings = ParameterBindings::new().bind_instance("deal", &instance.id);

        let path = PropertyPath::direct("deal", "name")
            .via(PathSegment::many_to_one("company", company.id.clone()));
        let eq = GuardExpression::eq(path.clone(), json!("Acme"));
        assert!(!runtime.evaluate(&eq, &bindings).await.unwrap());

        // The path does not resolve, so even a null check fails.
        let null_check = GuardExpression::is_null(path);
        assert!(!runtime.evaluate(&null_check, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_one_to_many_any_and_all() {
        let (runtime, company, deal) = runtime_with_deal().await;
        let acme = runtime
            .create_instance(
                &company.id,
                BTreeMap::from([("name".to_string(), json!("Acme"))]),
            )
            .await
            .unwrap();
        for (name, stage) in [("First", "Lead"), ("Second", "Won")] {
            let mut data = deal_data(name, stage);
            data.insert("company".to_string(), json!(acme.id.as_str()));
            runtime.create_instance(&deal.id, data).await.unwrap();
        }
        let bindings = ParameterBindings::new().bind_instance("company", &acme.id);

        let any_won = GuardExpression::eq(
            PropertyPath::direct("company", "stage").via(PathSegment::one_to_many(
                "company",
                deal.id.clone(),
                Quantifier::Any,
            )),
            json!("Won"),
        );
        assert!(runtime.evaluate(&any_won, &bindings).await.unwrap());

        let all_won = GuardExpression::eq(
            PropertyPath::direct("company", "stage").via(PathSegment::one_to_many(
                "company",
                deal.id.clone(),
                Quantifier::All,
            )),
            json!("Won"),
        );
        assert!(!runtime.evaluate(&all_won, &bindings).await.unwrap());

        // A company with no deals: ANY is vacuously false, ALL
        // vacuously true.
        let lonely = runtime
            .create_instance(
                &company.id,
                BTreeMap::from([("name".to_string(), json!("Lonely"))]),
            )
            .await
            .unwrap();
        let bindings = ParameterBindings::new().bind_instance("company", &lonely.id);
        assert!(!runtime.evaluate(&any_won, &bindings).await.unwrap());
        assert!(runtime.evaluate(&all_won, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_many_to_many_traverses_junction() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let campaign = make_campaign();
        let junction = EntityType::junction(
            RelationshipId::generate(),
            "Deal ↔ Campaign",
            &deal,
            &campaign,
        );
        runtime.register_entity_type(campaign.clone()).await.unwrap();
        runtime.register_entity_type(junction.clone()).await.unwrap();

        let this_deal = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let mut campaign_ids = Vec::new();
        for (name, status) in [("Spring", "Draft"), ("Summer", "Active")] {
            let created = runtime
                .create_instance(
                    &campaign.id,
                    BTreeMap::from([
                        ("name".to_string(), json!(name)),
                        ("status".to_string(), json!(status)),
                    ]),
                )
                .await
                .unwrap();
            campaign_ids.push(created.id);
        }
        for campaign_id in &campaign_ids {
            runtime
                .create_instance(
                    &junction.id,
                    BTreeMap::from([
                        ("deal".to_string(), json!(this_deal.id.as_str())),
                        ("campaign".to_string(), json!(campaign_id.as_str())),
                    ]),
                )
                .await
                .unwrap();
        }
        let bindings = ParameterBindings::new().bind_instance("deal", &this_deal.id);

        let any_active = GuardExpression::eq(
            PropertyPath::direct("deal", "status").via(PathSegment::many_to_many(
                "campaigns",
                campaign.id.clone(),
                Quantifier::Any,
            )),
            json!("Active"),
        );
        assert!(runtime.evaluate(&any_active, &bindings).await.unwrap());

        let all_active = GuardExpression::eq(
            PropertyPath::direct("deal", "status").via(PathSegment::many_to_many(
                "campaigns",
                campaign.id.clone(),
                Quantifier::All,
            )),
            json!("Active"),
        );
        assert!(!runtime.evaluate(&all_active, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_numeric_comparison_coerces_strings() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let mut data = deal_data("Acme Renewal", "Lead");
        data.insert("amount".to_string(), json!("150"));
        let instance = runtime.create_instance(&deal.id, data).await.unwrap();
        let bindings = ParameterBindings::new().bind_instance("deal", &instance.id);

        let above = GuardExpression::compare(
            PropertyPath::direct("deal", "amount"),
            ComparisonOperator::Gt,
            json!(100),
        );
        assert!(runtime.evaluate(&above, &bindings).await.unwrap());

        let below = GuardExpression::compare(
            PropertyPath::direct("deal", "amount"),
            ComparisonOperator::Lte,
            json!(100),
        );
        assert!(!runtime.evaluate(&below, &bindings).await.unwrap());
    }

    #[tokio::test]
    async fn test_rules_resolve_sources_in_order() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let instance = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let bindings = ParameterBindings::new()
            .bind_instance("deal", &instance.id)
            .bind_value("newName", "Renamed Deal");
        let user = UserId::new("user-7");

        let rules = vec![ActionRule::modify(
            "deal",
            BTreeMap::from([
                (
                    "stage".to_string(),
                    PropertyValueConfig::static_value(json!("Qualified")),
                ),
                ("owner".to_string(), PropertyValueConfig::CurrentUser),
                (
                    "name".to_string(),
                    PropertyValueConfig::from_parameter("newName"),
                ),
            ]),
        )];
        let report = runtime.execute(&rules, &bindings, &user).await.unwrap();
        assert_eq!(report.modified, vec![instance.id.clone()]);

        let updated = runtime.get_instance(&instance.id).await.unwrap().unwrap();
        assert_eq!(updated.get("stage"), Some(&json!("Qualified")));
        assert_eq!(updated.get("owner"), Some(&json!("user-7")));
        assert_eq!(updated.get("name"), Some(&json!("Renamed Deal")));
    }

    #[tokio::test]
    async fn test_create_rule_writes_timestamp_source() {
        let runtime = InMemoryActionRuntime::new();
        let task = EntityType::new("Task")
            .with_property("title", PropertyDef::string("Title").required())
            .with_property("logged_at", PropertyDef::timestamp("Logged At"));
        runtime.register_entity_type(task.clone()).await.unwrap();

        let rules = vec![ActionRule::create(
            task.id.clone(),
            BTreeMap::from([
                (
                    "title".to_string(),
                    PropertyValueConfig::static_value(json!("Follow up")),
                ),
                ("logged_at".to_string(), PropertyValueConfig::CurrentTimestamp),
            ]),
        )];
        let report = runtime
            .execute(&rules, &ParameterBindings::new(), &UserId::new("user-1"))
            .await
            .unwrap();
        assert_eq!(report.created.len(), 1);

        let created = runtime
            .get_instance(&report.created[0])
            .await
            .unwrap()
            .unwrap();
        let logged_at = created.get("logged_at").and_then(Value::as_str).unwrap();
        assert!(DateTime::parse_from_rfc3339(logged_at).is_ok());
    }

    #[tokio::test]
    async fn test_delete_rule_cascades_junction_rows() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let campaign = make_campaign();
        let junction = EntityType::junction(
            RelationshipId::generate(),
            "Deal ↔ Campaign",
            &deal,
            &campaign,
        );
        runtime.register_entity_type(campaign.clone()).await.unwrap();
        runtime.register_entity_type(junction.clone()).await.unwrap();

        let this_deal = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let spring = runtime
            .create_instance(
                &campaign.id,
                BTreeMap::from([
                    ("name".to_string(), json!("Spring")),
                    ("status".to_string(), json!("Active")),
                ]),
            )
            .await
            .unwrap();
        runtime
            .create_instance(
                &junction.id,
                BTreeMap::from([
                    ("deal".to_string(), json!(this_deal.id.as_str())),
                    ("campaign".to_string(), json!(spring.id.as_str())),
                ]),
            )
            .await
            .unwrap();

        let bindings = ParameterBindings::new().bind_instance("deal", &this_deal.id);
        let report = runtime
            .execute(
                &[ActionRule::delete("deal")],
                &bindings,
                &UserId::new("user-1"),
            )
            .await
            .unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert_eq!(report.deleted[0], this_deal.id);
        assert_eq!(runtime.count_instances(&junction.id).await.unwrap(), 0);
        // The campaign itself is not owned by the deal.
        assert_eq!(runtime.count_instances(&campaign.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_all_is_conjunctive() {
        let (runtime, _, deal) = runtime_with_deal().await;
        let instance = runtime
            .create_instance(&deal.id, deal_data("Acme Renewal", "Lead"))
            .await
            .unwrap();
        let bindings = ParameterBindings::new().bind_instance("deal", &instance.id);

        let guards = vec![
            GuardExpression::eq(PropertyPath::direct("deal", "stage"), json!("Lead")),
            GuardExpression::compare(
                PropertyPath::direct("deal", "amount"),
                ComparisonOperator::Gt,
                json!(1000),
            ),
        ];
        assert!(!runtime.evaluate_all(&guards, &bindings).await.unwrap());
        assert!(runtime
            .evaluate_all(&guards[..1], &bindings)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unbound_parameter_is_an_error() {
        let (runtime, _, _) = runtime_with_deal().await;
        let guard = GuardExpression::eq(PropertyPath::direct("deal", "stage"), json!("Lead"));
        let result = runtime.evaluate(&guard, &ParameterBindings::new()).await;
        assert!(matches!(
            result,
            Err(RuntimeError::UnboundParameter(parameter)) if parameter == "deal"
        ));
    }

    #[tokio::test]
    async fn test_forget_entity_type_drops_instances() {
        let (runtime, _, deal) = runtime_with_deal().await;
        runtime
            .create_instance(&deal.id, deal_data("One", "Lead"))
            .await
            .unwrap();
        runtime
            .create_instance(&deal.id, deal_data("Two", "Won"))
            .await
            .unwrap();
        assert_eq!(runtime.count_instances(&deal.id).await.unwrap(), 2);

        runtime.forget_entity_type(&deal.id).await.unwrap();
        assert_eq!(runtime.count_instances(&deal.id).await.unwrap(), 0);
        assert!(matches!(
            runtime.create_instance(&deal.id, deal_data("Three", "Lead")).await,
            Err(RuntimeError::UnknownEntityType(_))
        ));
    }
}
