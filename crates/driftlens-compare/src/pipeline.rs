// SPDX-License-Identifier: Apache-2.0

//! Per-resource diffing: correlate, expand, merge, override, normalize, diff.

use serde_json::Value;
use tracing::error;

use driftlens_core::{deep_merge, remove_path, CoreError, ErrorCode, TextDiff};
use driftlens_model::resource_key;

use crate::correlate::MetricsCorrelator;
use crate::error::CompareError;
use crate::overrides::{apply_override, OverrideLookup};

/// Outcome of diffing one live resource against its correlated template.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResourceDiff {
    pub key: String,
    pub template_path: String,
    /// Raw collaborator output; empty when the sides are identical after
    /// normalization.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<u8>,
    pub clean: bool,
    pub patched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_error: Option<String>,
}

/// Everything needed to process resources; immutable apart from the metrics
/// collector, so one context serves any number of workers.
pub struct DiffContext<'a> {
    correlator: &'a MetricsCorrelator,
    overrides: &'a OverrideLookup,
    diff: &'a (dyn TextDiff + Sync),
}

impl<'a> DiffContext<'a> {
    #[must_use]
    pub fn new(
        correlator: &'a MetricsCorrelator,
        overrides: &'a OverrideLookup,
        diff: &'a (dyn TextDiff + Sync),
    ) -> Self {
        Self {
            correlator,
            overrides,
            diff,
        }
    }

    /// Diff one live resource. `params` feeds template expansion; when absent
    /// the live resource itself is the render context, so templates can echo
    /// live values for fields the reference does not pin.
    pub fn run_for(&self, live: &Value, params: Option<&Value>) -> Result<ResourceDiff, CompareError> {
        let template = self.correlator.matching(live)?;

        let render_params = params.unwrap_or(live);
        let mut expanded = template.expand(render_params)?;

        if template.config().allow_merge {
            let mut merged = live.clone();
            deep_merge(&mut merged, &expanded);
            expanded = merged;
        }

        let mut patched = false;
        let mut patch_error = None;
        if let Some(user_override) = self.overrides.for_resource(live) {
            match apply_override(&expanded, &user_override) {
                Ok(updated) => {
                    expanded = updated;
                    patched = true;
                }
                Err(err) => {
                    error!(resource = %resource_key(live), %err, "override not applied");
                    patch_error = Some(err.to_string());
                }
            }
        }

        let mut cluster_side = live.clone();
        for path in template.omit_paths() {
            remove_path(&mut cluster_side, path);
            remove_path(&mut expanded, path);
        }

        let reference_text = to_yaml_bytes(&expanded)?;
        let cluster_text = to_yaml_bytes(&cluster_side)?;
        let output = self.diff.run(&reference_text, &cluster_text);

        Ok(ResourceDiff {
            key: resource_key(live),
            template_path: template.path().to_string(),
            clean: output.is_empty(),
            diff: output,
            patched,
            patch_error,
        })
    }
}

fn to_yaml_bytes(doc: &Value) -> Result<Vec<u8>, CompareError> {
    serde_yaml::to_string(doc)
        .map(String::into_bytes)
        .map_err(|e| {
            CompareError::Core(CoreError::new(
                ErrorCode::Io,
                format!("failed to serialize diff side: {e}"),
            ))
        })
}
