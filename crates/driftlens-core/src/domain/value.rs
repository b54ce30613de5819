// SPDX-License-Identifier: Apache-2.0

//! Nested reads and removals over the untyped document tree.
//!
//! Documents are `serde_json::Value` trees: mappings, sequences and scalars.
//! Reads descend by literal segment; removals additionally understand regex
//! steps that fan out over matching mapping keys.

use serde_json::Value;

use crate::domain::path::{FieldPath, PathStep};
use crate::errors::{CoreError, ErrorCode, Result};

/// Fetch the value at a literal field chain.
///
/// Absent keys yield `Ok(None)`. A sequence step must parse as a nonnegative
/// index; an index past the end is absent, not an error. Descending into a
/// scalar is a type error carrying the dotted prefix reached so far.
pub fn nested_field<'a>(obj: &'a Value, fields: &[String]) -> Result<Option<&'a Value>> {
    let mut current = obj;
    for (depth, field) in fields.iter().enumerate() {
        match current {
            Value::Null => return Ok(None),
            Value::Object(map) => match map.get(field) {
                Some(next) => current = next,
                None => return Ok(None),
            },
            Value::Array(seq) => {
                let index: usize = field.parse().map_err(|_| {
                    CoreError::new(
                        ErrorCode::Traverse,
                        format!(
                            "{} accessor error: found sequence but segment {field} is not an index",
                            dotted(&fields[..=depth])
                        ),
                    )
                })?;
                match seq.get(index) {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
            other => {
                return Err(CoreError::new(
                    ErrorCode::Traverse,
                    format!(
                        "{} accessor error: cannot descend into {}",
                        dotted(&fields[..=depth]),
                        kind_name(other)
                    ),
                ))
            }
        }
    }
    Ok(Some(current))
}

/// Fetch a string at a literal field chain; a present non-string value is a
/// type error, absence is `Ok(None)`.
pub fn nested_string<'a>(obj: &'a Value, fields: &[String]) -> Result<Option<&'a str>> {
    match nested_field(obj, fields)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(CoreError::new(
            ErrorCode::Traverse,
            format!(
                "{} accessor error: expected string, found {}",
                dotted(fields),
                kind_name(other)
            ),
        )),
    }
}

/// Remove the addressed field(s) from the document.
///
/// The terminal step deletes the mapping key or splices the sequence index
/// (later elements renumber). Inner containers left empty by the removal are
/// deleted on the way back up. Regex steps apply at mappings and remove every
/// matching key; at sequences they match nothing.
pub fn remove_path(obj: &mut Value, path: &FieldPath) {
    if !path.steps().is_empty() {
        remove_steps(obj, path.steps());
    }
}

fn remove_steps(obj: &mut Value, steps: &[PathStep]) -> bool {
    let Some((step, rest)) = steps.split_first() else {
        return false;
    };
    match obj {
        Value::Object(map) => {
            let keys: Vec<String> = map
                .keys()
                .filter(|key| step.matches(key))
                .cloned()
                .collect();
            for key in keys {
                if rest.is_empty() {
                    map.remove(&key);
                } else if let Some(child) = map.get_mut(&key) {
                    if remove_steps(child, rest) {
                        map.remove(&key);
                    }
                }
            }
            map.is_empty()
        }
        Value::Array(seq) => {
            let Some(index) = step.as_literal().and_then(|s| s.parse::<usize>().ok()) else {
                return false;
            };
            if index >= seq.len() {
                return false;
            }
            if rest.is_empty() || remove_steps(&mut seq[index], rest) {
                seq.remove(index);
            }
            seq.is_empty()
        }
        _ => false,
    }
}

/// Deep-merge `overlay` onto `base`: mapping keys recurse, everything else in
/// the overlay replaces the base value, keys only present in `base` survive.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, other) => *slot = other.clone(),
    }
}

fn dotted(fields: &[String]) -> String {
    format!(".{}", fields.join("."))
}

const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
