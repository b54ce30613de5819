#![forbid(unsafe_code)]
//! The driftlens engine: loads a curated reference bundle, correlates live
//! cluster resources to its templates, applies user overrides, and reports
//! per-resource diffs plus a run summary.

pub mod adapters;
mod correlate;
mod error;
mod fingerprint;
mod groups;
mod loader;
mod overrides;
mod pipeline;
mod summary;
mod template;

pub use correlate::{
    default_field_groups, Correlate, ExactMatchCorrelator, GroupCorrelator, MetricsCorrelator,
    MultiCorrelator,
};
pub use error::{CompareError, ErrorList};
pub use fingerprint::fingerprint_reference;
pub use loader::{load_reference, LoadedReference, OmissionSets};
pub use overrides::{apply_override, generate_merge_patch, OverrideLookup};
pub use pipeline::{DiffContext, ResourceDiff};
pub use summary::Summary;
pub use template::{CorrelationTarget, ReferenceTemplate, NO_VALUE_SENTINEL};

use driftlens_core::ErrorCode;
use driftlens_model::UserConfig;

pub const CRATE_NAME: &str = "driftlens-compare";

/// Assemble the standard correlator chain over a loaded reference: manual
/// exact pairs (when configured) in front of group hashing, wrapped in the
/// metrics decorator. `ignored_codes` lists the miss kinds that should not
/// count a resource as unmatched.
pub fn build_correlator(
    loaded: &LoadedReference,
    user_config: &UserConfig,
    ignored_codes: Vec<ErrorCode>,
) -> Result<MetricsCorrelator, CompareError> {
    let mut chain: Vec<Box<dyn Correlate<ReferenceTemplate>>> = Vec::new();
    let pairs = &user_config
        .correlation_settings
        .manual_correlation
        .correlation_pairs;
    if !pairs.is_empty() {
        chain.push(Box::new(ExactMatchCorrelator::new(pairs, &loaded.templates)?));
    }
    chain.push(Box::new(GroupCorrelator::new(
        default_field_groups(),
        &loaded.templates,
    )?));
    Ok(MetricsCorrelator::new(
        MultiCorrelator::new(chain),
        ignored_codes,
    ))
}
