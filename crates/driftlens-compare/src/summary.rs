// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use driftlens_core::ExitCode;
use driftlens_model::{MissingReport, Reference};

use crate::correlate::MetricsCorrelator;
use crate::pipeline::ResourceDiff;

/// Aggregate result of a run: which templates matched, which resources did
/// not correlate, which required templates never appeared, and which matched
/// resources still differ.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Summary {
    pub fingerprint: Option<String>,
    pub matched_templates: BTreeSet<String>,
    pub unmatched_resources: Vec<String>,
    pub missing: MissingReport,
    pub differing_resources: Vec<String>,
}

impl Summary {
    #[must_use]
    pub fn build(
        reference: &Reference,
        metrics: &MetricsCorrelator,
        diffs: &[ResourceDiff],
        fingerprint: Option<String>,
    ) -> Self {
        let matched_templates = metrics.matched_templates();
        let missing = reference.missing_required(&matched_templates);
        let differing_resources = diffs
            .iter()
            .filter(|diff| !diff.clean)
            .map(|diff| diff.key.clone())
            .collect();
        Self {
            fingerprint,
            matched_templates,
            unmatched_resources: metrics.unmatched_resources(),
            missing,
            differing_resources,
        }
    }

    /// Exit mapping for drivers: differences, uncorrelated resources and
    /// missing required templates are all non-zero.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.unmatched_resources.is_empty()
            && self.missing.count == 0
            && self.differing_resources.is_empty()
        {
            ExitCode::Success
        } else {
            ExitCode::Differences
        }
    }
}
