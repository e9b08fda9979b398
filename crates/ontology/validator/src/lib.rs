//! Instance Validation for Trellis
//!
//! Checks a candidate instance payload against an entity type's
//! property set and reports every violation as a `field → message`
//! map. An empty map means the payload is valid.
//!
//! The validator is a pure function over in-memory data. It never
//! touches storage: in particular, object-reference values are only
//! checked for shape (a non-empty identifier), not for the existence
//! of the referenced row. Referential integrity is a runtime concern.

#![deny(unsafe_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use ontology_types::{PicklistConfig, PropertyDef, PropertyType, PropertyValidation};
use serde_json::Value;

/// Validation outcome: property key to human-readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Compile check for a pattern constraint.
///
/// Schema mutations should call this before accepting a property
/// definition so the instance gate never meets an uncompilable
/// pattern.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Validates instance payloads against property definitions.
pub struct InstanceValidator;

impl InstanceValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check `data` against `properties`.
    ///
    /// Keys in `data` without a matching property definition are
    /// ignored. Optional properties that are absent or null are
    /// skipped entirely.
    pub fn validate(
        &self,
        data: &BTreeMap<String, Value>,
        properties: &BTreeMap<String, PropertyDef>,
    ) -> FieldErrors {
        let mut errors = FieldErrors::new();

        for (key, def) in properties {
            let value = data.get(key);
            if is_absent(value) {
                if def.required {
                    errors.insert(key.clone(), format!("{} is required", def.display_name));
                }
                continue;
            }
            let value = value.unwrap_or(&Value::Null);
            if let Some(message) = check_value(value, def) {
                errors.insert(key.clone(), message);
            }
        }

        errors
    }
}

impl Default for InstanceValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Per-type checks ─────────────────────────────────────────────────────────

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn check_value(value: &Value, def: &PropertyDef) -> Option<String> {
    match def.property_type {
        PropertyType::String => check_string(value, def),
        PropertyType::Number => check_number(value, def),
        PropertyType::Boolean => check_boolean(value, def),
        PropertyType::Timestamp => check_timestamp(value, def),
        PropertyType::ObjectReference => check_reference(value, def),
        PropertyType::Array => check_array(value, def),
    }
}

fn check_string(value: &Value, def: &PropertyDef) -> Option<String> {
    if let Some(picklist) = &def.picklist {
        return check_picklist(value, def, picklist);
    }

    let Value::String(s) = value else {
        return Some(format!("{} must be a string", def.display_name));
    };

    let validation = def.validation.as_ref();
    if let Some(min) = validation.and_then(|v| v.min_length) {
        if s.chars().count() < min {
            return Some(format!(
                "{} must be at least {min} characters",
                def.display_name
            ));
        }
    }
    if let Some(max) = validation.and_then(|v| v.max_length) {
        if s.chars().count() > max {
            return Some(format!(
                "{} must be at most {max} characters",
                def.display_name
            ));
        }
    }
    if let Some(pattern) = validation.and_then(|v| v.pattern.as_deref()) {
        match regex::Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(s) {
                    return Some(format!(
                        "{} does not match the required pattern",
                        def.display_name
                    ));
                }
            }
            Err(_) => {
                return Some(format!(
                    "{} has an invalid pattern configuration",
                    def.display_name
                ));
            }
        }
    }
    None
}

fn check_picklist(value: &Value, def: &PropertyDef, picklist: &PicklistConfig) -> Option<String> {
    if picklist.allow_multiple {
        let Value::Array(items) = value else {
            return Some(format!(
                "{} must be a list of picklist options",
                def.display_name
            ));
        };
        for item in items {
            let valid = item.as_str().is_some_and(|s| picklist.contains(s));
            if !valid {
                return Some(format!(
                    "{} contains a value that is not an allowed option",
                    def.display_name
                ));
            }
        }
        return None;
    }

    let valid = value.as_str().is_some_and(|s| picklist.contains(s));
    if !valid {
        return Some(format!(
            "{} must be one of: {}",
            def.display_name,
            picklist.options.join(", ")
        ));
    }
    None
}

fn check_number(value: &Value, def: &PropertyDef) -> Option<String> {
    // Numbers arrive either as JSON numbers or as numeric strings.
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(n) = parsed else {
        return Some(format!("{} must be a number", def.display_name));
    };

    let validation = def.validation.as_ref();
    if let Some(min) = validation.and_then(|v| v.min) {
        if n < min {
            return Some(format!("{} must be at least {min}", def.display_name));
        }
    }
    if let Some(max) = validation.and_then(|v| v.max) {
        if n > max {
            return Some(format!("{} must be at most {max}", def.display_name));
        }
    }
    None
}

fn check_boolean(value: &Value, def: &PropertyDef) -> Option<String> {
    if value.is_boolean() {
        None
    } else {
        Some(format!("{} must be true or false", def.display_name))
    }
}

fn check_timestamp(value: &Value, def: &PropertyDef) -> Option<String> {
    let parses = value.as_str().is_some_and(|s| {
        DateTime::parse_from_rfc3339(s).is_ok()
            || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
    });
    if parses {
        None
    } else {
        Some(format!("{} must be a valid date", def.display_name))
    }
}

fn check_reference(value: &Value, def: &PropertyDef) -> Option<String> {
    let valid = value.as_str().is_some_and(|s| !s.trim().is_empty());
    if valid {
        None
    } else {
        Some(format!("{} must reference an object", def.display_name))
    }
}

fn check_array(value: &Value, def: &PropertyDef) -> Option<String> {
    if value.is_array() {
        None
    } else {
        Some(format!("{} must be a list", def.display_name))
    }
}
