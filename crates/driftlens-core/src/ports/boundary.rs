// SPDX-License-Identifier: Apache-2.0

//! Contracts for the external collaborators the engine depends on. The engine
//! never touches the filesystem, a diff binary or a template runtime directly;
//! drivers supply implementations (defaults live in the compare crate).

use serde_json::Value;

use crate::errors::Result;

/// Byte-level read access to the reference bundle. A missing file surfaces as
/// `ErrorCode::ConfigNotFound`.
pub trait Fetcher {
    fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Textual diff over the two serialized sides. Empty output means the sides
/// are identical after normalization.
pub trait TextDiff {
    fn run(&self, reference: &[u8], cluster: &[u8]) -> Vec<u8>;
}

/// Parameterized text templating. Compilation failures map to
/// `ErrorCode::TemplateCompile`, render failures to `ErrorCode::TemplateExpand`.
pub trait TemplateEngine {
    /// Compile a template under a stable name.
    fn compile(&mut self, name: &str, source: &str) -> Result<()>;

    /// Compile a function-only file whose definitions become callable from
    /// every template in this environment.
    fn compile_helpers(&mut self, name: &str, source: &str) -> Result<()>;

    /// Render a previously compiled template with the given parameters.
    fn render(&self, name: &str, params: &Value) -> Result<Vec<u8>>;
}
