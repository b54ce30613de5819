// SPDX-License-Identifier: Apache-2.0

//! Applying user overrides to expanded templates, and generating merge-patch
//! overrides from observed drift.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use driftlens_core::TemplateEngine;
use driftlens_model::{api_version, kind, name, namespace, resource_key, PatchType, UserOverride};

use crate::adapters::HandlebarsEngine;
use crate::correlate::ExactMatchCorrelator;
use crate::error::CompareError;

/// Nested `go-template` payloads must resolve to a concrete patch within this
/// many rounds.
const MAX_PATCH_NESTING: usize = 8;

/// Apply an override to an expanded template. The input is never mutated: on
/// any failure the caller keeps the unpatched document.
pub fn apply_override(resource: &Value, user_override: &UserOverride) -> Result<Value, CompareError> {
    apply_patch(
        resource,
        user_override.patch_type,
        &user_override.patch,
        0,
    )
}

fn patch_error(resource: &Value, message: impl Into<String>) -> CompareError {
    CompareError::PatchApply {
        key: resource_key(resource),
        message: message.into(),
    }
}

fn apply_patch(
    resource: &Value,
    patch_type: PatchType,
    patch: &str,
    depth: usize,
) -> Result<Value, CompareError> {
    match patch_type {
        PatchType::Merge => {
            let patch_value: Value = serde_yaml::from_str(patch)
                .map_err(|e| patch_error(resource, format!("failed to decode merge patch: {e}")))?;
            let mut doc = resource.clone();
            json_patch::merge(&mut doc, &patch_value);
            Ok(doc)
        }
        PatchType::Rfc6902 => {
            let ops: json_patch::Patch = serde_yaml::from_str(patch)
                .map_err(|e| patch_error(resource, format!("failed to decode patch ops: {e}")))?;
            let mut doc = resource.clone();
            json_patch::patch(&mut doc, &ops)
                .map_err(|e| patch_error(resource, format!("failed to apply patch ops: {e}")))?;
            Ok(doc)
        }
        PatchType::GoTemplate => {
            if depth >= MAX_PATCH_NESTING {
                return Err(patch_error(
                    resource,
                    format!("templated patch nesting exceeded {MAX_PATCH_NESTING} levels"),
                ));
            }
            let mut engine = HandlebarsEngine::new();
            engine
                .compile("override-patch", patch)
                .map_err(|e| patch_error(resource, e.to_string()))?;
            let rendered = engine
                .render("override-patch", resource)
                .map_err(|e| patch_error(resource, e.to_string()))?;
            let rendered = String::from_utf8_lossy(&rendered).into_owned();
            let nested: NestedPatch = serde_yaml::from_str(&rendered).map_err(|e| {
                patch_error(resource, format!("templated patch did not render an override: {e}"))
            })?;
            apply_patch(resource, nested.patch_type, &nested.patch, depth + 1)
        }
    }
}

/// The payload a templated patch must render to.
#[derive(Debug, Deserialize)]
struct NestedPatch {
    #[serde(rename = "type")]
    patch_type: PatchType,
    patch: String,
}

/// Capture live drift as a reviewable merge-patch override: applying the
/// generated patch to `reference` reproduces `live`.
pub fn generate_merge_patch(
    reference: &Value,
    live: &Value,
    diff_output: Option<String>,
) -> Result<UserOverride, CompareError> {
    let patch = merge_patch_between(reference, live);
    let to_text = |value: &Value| {
        serde_json::to_string(value)
            .map_err(|e| patch_error(live, format!("failed to serialize patch side: {e}")))
    };
    Ok(UserOverride {
        name: name(live).to_string(),
        api_version: api_version(live).to_string(),
        kind: kind(live).to_string(),
        namespace: namespace(live).unwrap_or("").to_string(),
        exact_match: String::new(),
        patch_type: PatchType::Merge,
        patch: to_text(&patch)?,
        reference_value: Some(to_text(reference)?),
        cluster_value: Some(to_text(live)?),
        diff_output,
    })
}

/// Structural RFC 7396 generation: keys absent from `live` map to null,
/// changed mappings recurse, everything else (scalars, sequences) is replaced
/// wholesale by the live value.
fn merge_patch_between(reference: &Value, live: &Value) -> Value {
    match (reference, live) {
        (Value::Object(reference_map), Value::Object(live_map)) => {
            let mut patch = Map::new();
            for (key, reference_value) in reference_map {
                match live_map.get(key) {
                    None => {
                        patch.insert(key.clone(), Value::Null);
                    }
                    Some(live_value) if live_value != reference_value => {
                        patch.insert(key.clone(), merge_patch_between(reference_value, live_value));
                    }
                    Some(_) => {}
                }
            }
            for (key, live_value) in live_map {
                if !reference_map.contains_key(key) {
                    patch.insert(key.clone(), live_value.clone());
                }
            }
            Value::Object(patch)
        }
        _ => live.clone(),
    }
}

/// Override correlation: exact keys only, with an explicit `exactMatch`
/// taking priority over the metadata-derived key.
pub struct OverrideLookup {
    inner: ExactMatchCorrelator<UserOverride>,
}

impl OverrideLookup {
    #[must_use]
    pub fn new(overrides: Vec<UserOverride>) -> Self {
        let mut table = BTreeMap::new();
        for user_override in overrides {
            let key = if user_override.exact_match.is_empty() {
                resource_key(&user_override.metadata())
            } else {
                user_override.exact_match.clone()
            };
            table.insert(key, Arc::new(user_override));
        }
        Self {
            inner: ExactMatchCorrelator::from_table(table),
        }
    }

    /// The override correlated to this resource, if any.
    #[must_use]
    pub fn for_resource(&self, doc: &Value) -> Option<Arc<UserOverride>> {
        use crate::correlate::Correlate;
        self.inner.matching(doc).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn override_of(patch_type: PatchType, patch: &str) -> UserOverride {
        UserOverride {
            name: "x".to_string(),
            api_version: "v1".to_string(),
            kind: "Deployment".to_string(),
            namespace: String::new(),
            exact_match: String::new(),
            patch_type,
            patch: patch.to_string(),
            reference_value: None,
            cluster_value: None,
            diff_output: None,
        }
    }

    #[test]
    fn merge_patch_overwrites_and_deletes() {
        let resource = json!({"spec": {"replicas": 1, "paused": true}});
        let patched = apply_override(
            &resource,
            &override_of(PatchType::Merge, r#"{"spec": {"replicas": 3, "paused": null}}"#),
        )
        .expect("apply");
        assert_eq!(patched, json!({"spec": {"replicas": 3}}));
    }

    #[test]
    fn rfc6902_replace_applies() {
        let resource = json!({"spec": {"replicas": 1}});
        let patched = apply_override(
            &resource,
            &override_of(
                PatchType::Rfc6902,
                r#"[{"op": "replace", "path": "/spec/replicas", "value": 3}]"#,
            ),
        )
        .expect("apply");
        assert_eq!(patched, json!({"spec": {"replicas": 3}}));
    }

    #[test]
    fn failing_op_reports_and_leaves_resource_untouched() {
        let resource = json!({"spec": {"replicas": 1}});
        let err = apply_override(
            &resource,
            &override_of(
                PatchType::Rfc6902,
                r#"[{"op": "replace", "path": "/spec/missing", "value": 3}]"#,
            ),
        )
        .expect_err("must fail");
        assert_eq!(err.code(), driftlens_core::ErrorCode::PatchApply);
        assert_eq!(resource, json!({"spec": {"replicas": 1}}));
    }

    #[test]
    fn templated_patch_matches_direct_merge_patch() {
        let resource = json!({"kind": "Deployment", "spec": {"replicas": 1}});
        let templated = override_of(
            PatchType::GoTemplate,
            "type: mergepatch\npatch: '{\"metadata\": {\"app\": \"{{ kind }}\"} }'\n",
        );
        let direct = override_of(
            PatchType::Merge,
            r#"{"metadata": {"app": "Deployment"} }"#,
        );
        let via_template = apply_override(&resource, &templated).expect("templated");
        let via_merge = apply_override(&resource, &direct).expect("direct");
        assert_eq!(via_template, via_merge);
    }

    #[test]
    fn runaway_template_nesting_is_cut_off() {
        // renders to another go-template override with the same payload
        let looping = override_of(
            PatchType::GoTemplate,
            "type: go-template\npatch: \"type: go-template\\npatch: ''\\n\"\n",
        );
        let resource = json!({"kind": "Pod"});
        let err = apply_override(&resource, &looping).expect_err("must terminate");
        assert_eq!(err.code(), driftlens_core::ErrorCode::PatchApply);
    }

    #[test]
    fn generated_patch_reproduces_live_when_applied() {
        let reference = json!({"spec": {"replicas": 1, "paused": true}, "kind": "Deployment"});
        let live = json!({"spec": {"replicas": 3}, "kind": "Deployment", "metadata": {"name": "x"}});
        let generated = generate_merge_patch(&reference, &live, None).expect("generate");
        assert_eq!(generated.patch_type, PatchType::Merge);
        let reapplied = apply_override(&reference, &generated).expect("apply");
        assert_eq!(reapplied, live);
    }

    #[test]
    fn lookup_prefers_exact_match_key() {
        let mut with_key = override_of(PatchType::Merge, "{}");
        with_key.exact_match = "v1_Service_special".to_string();
        let lookup = OverrideLookup::new(vec![with_key]);
        let doc = json!({"apiVersion": "v1", "kind": "Service", "metadata": {"name": "special"}});
        assert!(lookup.for_resource(&doc).is_some());
        let other = json!({"apiVersion": "v1", "kind": "Deployment", "metadata": {"name": "x"}});
        assert!(lookup.for_resource(&other).is_none());
    }
}
