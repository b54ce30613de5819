// SPDX-License-Identifier: Apache-2.0

//! Resource-to-template correlation: exact match by canonical key, group
//! hashing over field groups, the ordered chain, and the metrics decorator.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use driftlens_core::ErrorCode;
use driftlens_model::resource_key;

use crate::error::CompareError;
use crate::groups;
use crate::template::{CorrelationTarget, ReferenceTemplate};

pub trait Correlate<T: CorrelationTarget>: Send + Sync {
    fn matching(&self, doc: &Value) -> Result<Arc<T>, CompareError>;
}

/// Field groups tried by default, most specific first. Each inner list is one
/// group; each group member is a field chain into the document.
#[must_use]
pub fn default_field_groups() -> Vec<Vec<Vec<String>>> {
    let chains: &[&[&[&str]]] = &[
        &[&["apiVersion"], &["kind"], &["metadata", "namespace"], &["metadata", "name"]],
        &[&["apiVersion"], &["kind"], &["metadata", "namespace"]],
        &[&["apiVersion"], &["kind"], &["metadata", "name"]],
        &[&["apiVersion"], &["kind"]],
        &[&["kind"], &["metadata", "namespace"], &["metadata", "name"]],
        &[&["kind"], &["metadata", "namespace"]],
        &[&["kind"], &["metadata", "name"]],
        &[&["kind"]],
    ];
    chains
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|field| field.iter().map(|s| (*s).to_string()).collect())
                .collect()
        })
        .collect()
}

/// Correlates by the canonical `apiVersion_kind[_namespace]_name` key against
/// a user-maintained table of resource-key → template-name pairs.
#[derive(Debug)]
pub struct ExactMatchCorrelator<T> {
    table: BTreeMap<String, Arc<T>>,
}

impl<T: CorrelationTarget> ExactMatchCorrelator<T> {
    /// Build from manual pairs; a pair naming an unknown target fails the
    /// whole construction.
    pub fn new(pairs: &BTreeMap<String, String>, targets: &[Arc<T>]) -> Result<Self, CompareError> {
        let by_name: BTreeMap<&str, &Arc<T>> =
            targets.iter().map(|target| (target.name(), target)).collect();
        let mut table = BTreeMap::new();
        for (key, target_name) in pairs {
            let Some(target) = by_name.get(target_name.as_str()) else {
                return Err(CompareError::Config {
                    code: ErrorCode::ConfigMalformed,
                    message: format!(
                        "manual correlation for resource {key}: no template named {target_name}"
                    ),
                });
            };
            table.insert(key.clone(), Arc::clone(target));
        }
        Ok(Self { table })
    }

    /// Build from a ready-made key table (used for override correlation,
    /// where keys derive from each target's own metadata).
    pub(crate) fn from_table(table: BTreeMap<String, Arc<T>>) -> Self {
        Self { table }
    }
}

impl<T: CorrelationTarget + Send + Sync> Correlate<T> for ExactMatchCorrelator<T> {
    fn matching(&self, doc: &Value) -> Result<Arc<T>, CompareError> {
        let key = resource_key(doc);
        match self.table.get(&key) {
            Some(target) => Ok(Arc::clone(target)),
            None => Err(CompareError::UnknownMatch { key }),
        }
    }
}

struct GroupTable<T> {
    fields: Vec<Vec<String>>,
    buckets: groups::Buckets<T>,
}

/// Correlates by hashing groups of indexed fields, most specific group first.
/// Templates are indexed where their rendered metadata fully defines the
/// group; resources fall through to coarser groups until a distinct match.
pub struct GroupCorrelator<T> {
    tables: Vec<GroupTable<T>>,
}

impl<T: CorrelationTarget> GroupCorrelator<T> {
    pub fn new(
        mut field_groups: Vec<Vec<Vec<String>>>,
        targets: &[Arc<T>],
    ) -> Result<Self, CompareError> {
        field_groups.sort_by(|a, b| b.len().cmp(&a.len()));
        let buckets = groups::divide(&field_groups, targets)?;
        for (fields, table) in field_groups.iter().zip(&buckets) {
            for (hash, entries) in groups::oversized(table, 1) {
                let mut names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
                names.sort_unstable();
                warn!(
                    group = %format_fields(fields),
                    %hash,
                    templates = %names.join(", "),
                    "more than one template shares this correlation hash; resources landing on it \
                     can only resolve through manual matching or a coarser group"
                );
            }
        }
        let tables = field_groups
            .into_iter()
            .zip(buckets)
            .filter(|(_, buckets)| !buckets.is_empty())
            .map(|(fields, buckets)| GroupTable { fields, buckets })
            .collect();
        Ok(Self { tables })
    }
}

fn format_fields(fields: &[Vec<String>]) -> String {
    fields
        .iter()
        .map(|field| field.join("_"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl<T: CorrelationTarget + Send + Sync> Correlate<T> for GroupCorrelator<T> {
    fn matching(&self, doc: &Value) -> Result<Arc<T>, CompareError> {
        let mut multiple: Option<CompareError> = None;
        for table in &self.tables {
            let Some(hash) = groups::match_hash(doc, &table.fields) else {
                continue;
            };
            match table.buckets.get(&hash).map(Vec::as_slice) {
                Some([single]) => return Ok(Arc::clone(single)),
                Some(bucket) if bucket.len() > 1 && multiple.is_none() => {
                    let mut names: Vec<String> =
                        bucket.iter().map(|entry| entry.name().to_string()).collect();
                    names.sort_unstable();
                    multiple = Some(CompareError::MultipleMatches {
                        key: resource_key(doc),
                        names,
                    });
                }
                _ => {}
            }
        }
        Err(multiple.unwrap_or_else(|| CompareError::UnknownMatch {
            key: resource_key(doc),
        }))
    }
}

/// Tries sub-correlators in order; the first success wins. Misses accumulate
/// and join; any error that is not a miss short-circuits.
pub struct MultiCorrelator<T> {
    correlators: Vec<Box<dyn Correlate<T>>>,
}

impl<T: CorrelationTarget> MultiCorrelator<T> {
    #[must_use]
    pub fn new(correlators: Vec<Box<dyn Correlate<T>>>) -> Self {
        Self { correlators }
    }
}

const MISS_CODES: [ErrorCode; 2] = [ErrorCode::UnknownMatch, ErrorCode::MultipleMatches];

impl<T: CorrelationTarget + Send + Sync> Correlate<T> for MultiCorrelator<T> {
    fn matching(&self, doc: &Value) -> Result<Arc<T>, CompareError> {
        let mut misses = Vec::new();
        for correlator in &self.correlators {
            match correlator.matching(doc) {
                Ok(target) => return Ok(target),
                Err(err) if MISS_CODES.contains(&err.code()) => misses.push(err),
                Err(err) => return Err(err),
            }
        }
        Err(CompareError::joined(misses))
    }
}

/// Decorator gathering summary data while matching. Safe for concurrent use:
/// the matched-name set and the unmatched list sit behind independent locks.
pub struct MetricsCorrelator {
    inner: MultiCorrelator<ReferenceTemplate>,
    matched: Mutex<BTreeSet<String>>,
    unmatched: Mutex<Vec<String>>,
    ignored_codes: Vec<ErrorCode>,
}

impl MetricsCorrelator {
    #[must_use]
    pub fn new(inner: MultiCorrelator<ReferenceTemplate>, ignored_codes: Vec<ErrorCode>) -> Self {
        Self {
            inner,
            matched: Mutex::new(BTreeSet::new()),
            unmatched: Mutex::new(Vec::new()),
            ignored_codes,
        }
    }

    pub fn matching(&self, doc: &Value) -> Result<Arc<ReferenceTemplate>, CompareError> {
        match self.inner.matching(doc) {
            Ok(template) => {
                self.matched
                    .lock()
                    .expect("matched set lock poisoned")
                    .insert(template.path().to_string());
                Ok(template)
            }
            Err(err) => {
                if !err.only_codes(&self.ignored_codes) {
                    self.unmatched
                        .lock()
                        .expect("unmatched list lock poisoned")
                        .push(resource_key(doc));
                }
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn matched_templates(&self) -> BTreeSet<String> {
        self.matched
            .lock()
            .expect("matched set lock poisoned")
            .clone()
    }

    /// Unmatched resource keys in arrival order.
    #[must_use]
    pub fn unmatched_resources(&self) -> Vec<String> {
        self.unmatched
            .lock()
            .expect("unmatched list lock poisoned")
            .clone()
    }
}
