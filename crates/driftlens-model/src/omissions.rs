// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reference::ValidationError;

/// Reserved omission set seeded by the engine on every load.
pub const BUILT_IN_KEY: &str = "built-in";

/// Platform-standard runtime-only fields stripped from both sides before
/// diffing.
pub const BUILT_IN_PATHS: [&str; 9] = [
    "metadata.resourceVersion",
    "metadata.generation",
    "metadata.uid",
    "metadata.generateName",
    "metadata.creationTimestamp",
    "metadata.finalizers",
    "\"kubectl.kubernetes.io/last-applied-configuration\"",
    "metadata.annotations.\"kubectl.kubernetes.io/last-applied-configuration\"",
    "status",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FieldsToOmit {
    #[serde(default)]
    pub config: OmitConfig,
    #[serde(default)]
    pub items: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OmitConfig {
    #[serde(default, rename = "defaultKey", skip_serializing_if = "String::is_empty")]
    pub default_key: String,
}

impl FieldsToOmit {
    /// Install the reserved set, overwriting whatever the user put under the
    /// reserved key, and fall back the default key to it when unset.
    pub fn seed_built_in(&mut self) {
        if self.items.contains_key(BUILT_IN_KEY) {
            warn!(key = BUILT_IN_KEY, "fieldsToOmit entry uses the reserved key, replacing with the seeded list");
        }
        self.items.insert(
            BUILT_IN_KEY.to_string(),
            BUILT_IN_PATHS.iter().map(|p| (*p).to_string()).collect(),
        );
        if self.config.default_key.is_empty() {
            self.config.default_key = BUILT_IN_KEY.to_string();
        }
    }

    /// The default key must name a set once seeding ran.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.contains_key(&self.config.default_key) {
            Ok(())
        } else {
            Err(ValidationError(format!(
                "fieldsToOmit defaultKey \"{}\" does not name an omission set",
                self.config.default_key
            )))
        }
    }
}
