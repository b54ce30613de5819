// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use serde_json::{Map, Value};

use driftlens_core::{FieldPath, TemplateEngine};
use driftlens_model::{TemplateConfig, UserOverride};

use crate::error::CompareError;

/// Some template runtimes render missing optional parameters as this literal;
/// it is scrubbed from the rendered bytes before structural parsing.
pub const NO_VALUE_SENTINEL: &str = "<no value>";

/// A compiled reference template bound to the shared engine environment,
/// carrying its per-template config and resolved omission paths.
pub struct ReferenceTemplate {
    path: String,
    config: TemplateConfig,
    omit_paths: Vec<FieldPath>,
    engine: Arc<dyn TemplateEngine + Send + Sync>,
}

impl ReferenceTemplate {
    pub(crate) fn new(
        path: String,
        config: TemplateConfig,
        omit_paths: Vec<FieldPath>,
        engine: Arc<dyn TemplateEngine + Send + Sync>,
    ) -> Self {
        Self {
            path,
            config,
            omit_paths,
            engine,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    #[must_use]
    pub fn omit_paths(&self) -> &[FieldPath] {
        &self.omit_paths
    }

    /// Render with the given parameters and parse the result as a YAML
    /// document. The rendered text is part of the error on parse failure.
    pub fn expand(&self, params: &Value) -> Result<Value, CompareError> {
        let rendered = self
            .engine
            .render(&self.path, params)
            .map_err(|e| CompareError::Expand {
                template: self.path.clone(),
                message: e.to_string(),
            })?;
        parse_rendered(&self.path, &rendered)
    }

    /// Expansion with an empty parameter map; every template must yield valid
    /// metadata this way so it can be indexed for correlation.
    pub fn metadata(&self) -> Result<Value, CompareError> {
        self.expand(&Value::Object(Map::new()))
    }
}

impl std::fmt::Debug for ReferenceTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceTemplate")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("omit_paths", &self.omit_paths)
            .finish_non_exhaustive()
    }
}

fn parse_rendered(name: &str, rendered: &[u8]) -> Result<Value, CompareError> {
    let text = String::from_utf8_lossy(rendered).replace(NO_VALUE_SENTINEL, "");
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let doc: Value = serde_yaml::from_str(&text).map_err(|e| CompareError::Expand {
        template: name.to_string(),
        message: format!("not a YAML document after expansion: {e}. The rendered text: {text}"),
    })?;
    if doc.is_null() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(doc)
}

/// The capability shared by everything the correlators can index: reference
/// templates and user overrides both expose a name and resource-shaped
/// metadata.
pub trait CorrelationTarget {
    fn name(&self) -> &str;
    fn metadata(&self) -> Result<Value, CompareError>;
}

impl CorrelationTarget for ReferenceTemplate {
    fn name(&self) -> &str {
        self.path()
    }

    fn metadata(&self) -> Result<Value, CompareError> {
        ReferenceTemplate::metadata(self)
    }
}

impl CorrelationTarget for UserOverride {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> Result<Value, CompareError> {
        Ok(UserOverride::metadata(self))
    }
}
