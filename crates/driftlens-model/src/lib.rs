#![forbid(unsafe_code)]
//! Wire model of the reference bundle: parts, components, templates, the
//! field-omission policy, user overrides and the user correlation config.
//! Pure data and validation; loading and correlation live in the compare
//! crate.

mod identity;
mod omissions;
mod overrides;
mod reference;
mod user_config;

pub use identity::{api_version, kind, name, namespace, resource_key};
pub use omissions::{FieldsToOmit, OmitConfig, BUILT_IN_KEY, BUILT_IN_PATHS};
pub use overrides::{PatchType, UserOverride};
pub use reference::{
    Component, ComponentKind, MissingReport, Part, Reference, TemplateConfig, TemplateSpec,
    ValidationError,
};
pub use user_config::{CorrelationSettings, ManualCorrelation, UserConfig};

pub const CRATE_NAME: &str = "driftlens-model";
