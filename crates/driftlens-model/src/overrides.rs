// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::reference::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchType {
    #[serde(rename = "mergepatch")]
    Merge,
    #[serde(rename = "rfc6902")]
    Rfc6902,
    #[serde(rename = "go-template")]
    GoTemplate,
}

/// A user-supplied patch applied to an expanded template before diffing.
/// The provenance fields (`referenceValue`, `clusterValue`, `diffOutput`) are
/// written by the interactive editor and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UserOverride {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Direct resource-key correlation, bypassing the metadata-derived key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exact_match: String,
    #[serde(rename = "type")]
    pub patch_type: PatchType,
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_output: Option<String>,
}

impl UserOverride {
    /// Synthesized metadata document, shaped like a resource, so overrides
    /// correlate through the same machinery as templates.
    #[must_use]
    pub fn metadata(&self) -> Value {
        json!({
            "apiVersion": self.api_version,
            "kind": self.kind,
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
            },
        })
    }

    /// Parse an ordered override list from a YAML payload.
    pub fn load_all(text: &str) -> Result<Vec<Self>, ValidationError> {
        serde_yaml::from_str(text)
            .map_err(|e| ValidationError(format!("failed to load user overrides: {e}")))
    }

    /// Serialize an override list back out, preserving order.
    pub fn dump_all(overrides: &[Self]) -> Result<String, ValidationError> {
        serde_yaml::to_string(overrides)
            .map_err(|e| ValidationError(format!("failed to dump overrides: {e}")))
    }
}
