#![forbid(unsafe_code)]

pub mod domain;
pub mod errors;
pub mod ports;

pub use crate::domain::hash::{sha256, sha256_hex, Hash256, Sha256Stream};
pub use crate::domain::path::{FieldPath, PathStep};
pub use crate::domain::value::{deep_merge, nested_field, nested_string, remove_path};
pub use crate::errors::{CoreError, ErrorCode, ExitCode, Result};
pub use crate::ports::{Fetcher, TemplateEngine, TextDiff};

pub const CRATE_NAME: &str = "driftlens-core";
