// SPDX-License-Identifier: Apache-2.0

//! Hash-table construction for the group correlator: dividing targets into
//! per-group buckets, finding oversized buckets and pruning empty tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use driftlens_core::nested_string;

use crate::error::CompareError;
use crate::template::CorrelationTarget;

const HASH_SEPARATOR: &str = "_";

pub(crate) type Buckets<T> = BTreeMap<String, Vec<Arc<T>>>;

/// Join the group's field values on the target side. A target is only
/// claimable by a group when every field resolves to a non-empty string in its
/// rendered metadata.
fn claim_hash(metadata: &Value, fields: &[Vec<String>]) -> Option<String> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        match nested_string(metadata, field) {
            Ok(Some(value)) if !value.is_empty() => values.push(value),
            _ => return None,
        }
    }
    Some(values.join(HASH_SEPARATOR))
}

/// Join the group's field values on the resource side. Empty strings are
/// allowed here; a missing or non-string field makes the group inapplicable.
pub(crate) fn match_hash(doc: &Value, fields: &[Vec<String>]) -> Option<String> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        match nested_string(doc, field) {
            Ok(Some(value)) => values.push(value),
            _ => return None,
        }
    }
    Some(values.join(HASH_SEPARATOR))
}

/// Index every target into the most specific group(s) claiming it. Groups must
/// already be sorted descending by arity; a target fully defined for several
/// groups of the same maximal arity lands in each of them, and is offered to
/// no coarser group. Metadata extraction failures abort the division.
pub(crate) fn divide<T: CorrelationTarget>(
    field_groups: &[Vec<Vec<String>>],
    targets: &[Arc<T>],
) -> Result<Vec<Buckets<T>>, CompareError> {
    let mut tables: Vec<Buckets<T>> = vec![BTreeMap::new(); field_groups.len()];
    let mut errors = Vec::new();
    for target in targets {
        let metadata = match target.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        let mut claimed_arity = 0;
        for (index, fields) in field_groups.iter().enumerate() {
            if claimed_arity > 0 && fields.len() < claimed_arity {
                break;
            }
            if let Some(hash) = claim_hash(&metadata, fields) {
                claimed_arity = fields.len();
                tables[index].entry(hash).or_default().push(Arc::clone(target));
            }
        }
    }
    if errors.is_empty() {
        Ok(tables)
    } else {
        Err(CompareError::joined(errors))
    }
}

/// Buckets holding more entries than the threshold, for duplicate reporting.
pub(crate) fn oversized<'a, T>(
    buckets: &'a Buckets<T>,
    threshold: usize,
) -> impl Iterator<Item = (&'a String, &'a [Arc<T>])> {
    buckets
        .iter()
        .filter(move |(_, entries)| entries.len() > threshold)
        .map(|(hash, entries)| (hash, entries.as_slice()))
}
