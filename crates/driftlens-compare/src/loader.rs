// SPDX-License-Identifier: Apache-2.0

//! Loading the reference bundle: descriptor parsing, omission-policy
//! processing, and template compilation into the shared engine environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use driftlens_core::{ErrorCode, Fetcher, FieldPath, TemplateEngine};
use driftlens_model::{Reference, TemplateConfig};

use crate::error::{CompareError, ErrorList};
use crate::template::ReferenceTemplate;

/// Omission sets with every path pre-parsed, plus the resolved default key.
#[derive(Debug, Clone)]
pub struct OmissionSets {
    default_key: String,
    sets: BTreeMap<String, Vec<FieldPath>>,
}

impl OmissionSets {
    #[must_use]
    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[FieldPath]> {
        self.sets.get(name).map(Vec::as_slice)
    }

    /// The active omission paths for a template: the default set when it
    /// declares no refs, otherwise the union of the named sets. Unknown names
    /// are warned and skipped.
    #[must_use]
    pub fn resolve(&self, refs: &[String]) -> Vec<FieldPath> {
        if refs.is_empty() {
            return self.get(&self.default_key).unwrap_or_default().to_vec();
        }
        let mut paths = Vec::new();
        for name in refs {
            match self.get(name) {
                Some(set) => paths.extend_from_slice(set),
                None => warn!(set = name.as_str(), "fieldsToOmitRefs names an unknown omission set, skipping"),
            }
        }
        paths
    }
}

/// The immutable product of a successful load, shared across workers.
#[derive(Debug)]
pub struct LoadedReference {
    pub reference: Reference,
    pub templates: Vec<Arc<ReferenceTemplate>>,
    pub omissions: OmissionSets,
}

/// Read, validate and compile the reference bundle.
///
/// Fatal problems (missing descriptor, malformed descriptor, unknown default
/// key) abort with an error. Per-template compile failures are collected in
/// the returned [`ErrorList`] and those templates are skipped, so callers get
/// the partially-built reference for diagnostics.
pub fn load_reference(
    fetcher: &dyn Fetcher,
    mut engine: Box<dyn TemplateEngine + Send + Sync>,
    descriptor_path: &str,
) -> Result<(LoadedReference, ErrorList), CompareError> {
    let bytes = fetcher.read(descriptor_path).map_err(|e| {
        if e.code() == ErrorCode::ConfigNotFound {
            CompareError::Config {
                code: ErrorCode::ConfigNotFound,
                message: format!("reference descriptor not found: {e}"),
            }
        } else {
            CompareError::Core(e)
        }
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let mut reference: Reference =
        serde_yaml::from_str(&text).map_err(|e| CompareError::Config {
            code: ErrorCode::ConfigMalformed,
            message: format!("reference descriptor is not in the expected format: {e}"),
        })?;

    reference.fields_to_omit.seed_built_in();
    reference
        .fields_to_omit
        .validate()
        .map_err(|e| CompareError::Config {
            code: ErrorCode::ConfigMalformed,
            message: e.to_string(),
        })?;
    let omissions = parse_omission_sets(&reference);

    let mut errors = ErrorList::new();
    for file in &reference.template_function_files {
        if let Err(err) = read_and_compile(fetcher, engine.as_mut(), file, true) {
            errors.push(err);
        }
    }

    let mut pending: Vec<(String, TemplateConfig)> = Vec::new();
    for spec in reference.template_specs() {
        match read_and_compile(fetcher, engine.as_mut(), &spec.path, false) {
            Ok(()) => pending.push((spec.path.clone(), spec.config.clone())),
            Err(err) => errors.push(err),
        }
    }

    let engine: Arc<dyn TemplateEngine + Send + Sync> = Arc::from(engine);
    let templates = pending
        .into_iter()
        .map(|(path, config)| {
            let omit_paths = omissions.resolve(&config.fields_to_omit_refs);
            Arc::new(ReferenceTemplate::new(path, config, omit_paths, Arc::clone(&engine)))
        })
        .collect();

    Ok((
        LoadedReference {
            reference,
            templates,
            omissions,
        },
        errors,
    ))
}

fn read_and_compile(
    fetcher: &dyn Fetcher,
    engine: &mut (dyn TemplateEngine + Send + Sync),
    path: &str,
    helpers: bool,
) -> Result<(), CompareError> {
    let bytes = fetcher.read(path).map_err(|e| CompareError::Compile {
        template: path.to_string(),
        message: e.to_string(),
    })?;
    let source = String::from_utf8_lossy(&bytes);
    let result = if helpers {
        engine.compile_helpers(path, &source)
    } else {
        engine.compile(path, &source)
    };
    result.map_err(|e| CompareError::Compile {
        template: path.to_string(),
        message: e.to_string(),
    })
}

/// Pre-parse every omission path. Malformed paths are dropped with a warning,
/// never aborting the load; a set left without any valid path is dropped too.
fn parse_omission_sets(reference: &Reference) -> OmissionSets {
    let mut sets = BTreeMap::new();
    for (name, raw_paths) in &reference.fields_to_omit.items {
        let mut parsed = Vec::with_capacity(raw_paths.len());
        for raw in raw_paths {
            match FieldPath::parse(raw) {
                Ok(path) => parsed.push(path),
                Err(err) => {
                    warn!(set = name.as_str(), path = raw.as_str(), %err, "skipping malformed omission path");
                }
            }
        }
        if parsed.is_empty() {
            warn!(set = name.as_str(), "skipping omission set: no valid paths");
        } else {
            sets.insert(name.clone(), parsed);
        }
    }
    OmissionSets {
        default_key: reference.fields_to_omit.config.default_key.clone(),
        sets,
    }
}
