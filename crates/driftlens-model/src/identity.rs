// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

const FIELD_SEPARATOR: &str = "_";

#[must_use]
pub fn api_version(doc: &Value) -> &str {
    doc.get("apiVersion").and_then(Value::as_str).unwrap_or("")
}

#[must_use]
pub fn kind(doc: &Value) -> &str {
    doc.get("kind").and_then(Value::as_str).unwrap_or("")
}

#[must_use]
pub fn name(doc: &Value) -> &str {
    doc.get("metadata")
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

#[must_use]
pub fn namespace(doc: &Value) -> Option<&str> {
    doc.get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
        .filter(|ns| !ns.is_empty())
}

/// Canonical resource key: `apiVersion_kind_name`, or
/// `apiVersion_kind_namespace_name` for namespaced resources. Used for exact
/// matching, unmatched reporting and override correlation.
#[must_use]
pub fn resource_key(doc: &Value) -> String {
    let mut parts = vec![api_version(doc), kind(doc)];
    if let Some(ns) = namespace(doc) {
        parts.push(ns);
    }
    parts.push(name(doc));
    parts.join(FIELD_SEPARATOR)
}
