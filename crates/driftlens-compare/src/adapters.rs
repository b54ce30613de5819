// SPDX-License-Identifier: Apache-2.0

//! Default implementations of the collaborator ports. Drivers embedding the
//! engine can swap any of these for their own.

use std::path::PathBuf;

use handlebars::Handlebars;
use serde_json::Value;

use driftlens_core::{CoreError, ErrorCode, Fetcher, Result, TemplateEngine, TextDiff};

/// Reads reference files below a root directory.
#[derive(Debug, Clone)]
pub struct DirFetcher {
    root: PathBuf,
}

impl DirFetcher {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Fetcher for DirFetcher {
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        std::fs::read(self.root.join(path)).map_err(CoreError::from)
    }
}

/// Line-based unified diff with `reference` / `cluster` labels.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedTextDiff;

impl TextDiff for UnifiedTextDiff {
    fn run(&self, reference: &[u8], cluster: &[u8]) -> Vec<u8> {
        if reference == cluster {
            return Vec::new();
        }
        let left = String::from_utf8_lossy(reference);
        let right = String::from_utf8_lossy(cluster);
        let diff = similar::TextDiff::from_lines(left.as_ref(), right.as_ref());
        diff.unified_diff()
            .header("reference", "cluster")
            .to_string()
            .into_bytes()
    }
}

/// Handlebars-backed template environment. Function-only files register as
/// partials callable from every template; unset parameters render empty.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl HandlebarsEngine {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        // templates render YAML, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn compile(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| {
                CoreError::new(
                    ErrorCode::TemplateCompile,
                    format!("template {name} failed to compile: {e}"),
                )
            })
    }

    fn compile_helpers(&mut self, name: &str, source: &str) -> Result<()> {
        // partial references resolve against the registered template names
        self.registry
            .register_template_string(name, source)
            .map_err(|e| {
                CoreError::new(
                    ErrorCode::TemplateCompile,
                    format!("template function file {name} failed to compile: {e}"),
                )
            })
    }

    fn render(&self, name: &str, params: &Value) -> Result<Vec<u8>> {
        self.registry
            .render(name, params)
            .map(String::into_bytes)
            .map_err(|e| {
                CoreError::new(
                    ErrorCode::TemplateExpand,
                    format!("template {name} failed to render: {e}"),
                )
            })
    }
}
