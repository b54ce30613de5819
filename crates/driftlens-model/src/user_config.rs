// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Driver-side settings: manual resource-to-template pairs consumed by the
/// exact-match correlator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UserConfig {
    #[serde(default)]
    pub correlation_settings: CorrelationSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CorrelationSettings {
    #[serde(default)]
    pub manual_correlation: ManualCorrelation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ManualCorrelation {
    /// Resource key (`apiVersion_kind[_namespace]_name`) → template path.
    #[serde(default)]
    pub correlation_pairs: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_correlation_pairs() {
        let raw = "
correlationSettings:
  manualCorrelation:
    correlationPairs:
      v1_Service_default_x: svc.yaml
";
        let config: UserConfig = serde_yaml::from_str(raw).expect("parse");
        assert_eq!(
            config
                .correlation_settings
                .manual_correlation
                .correlation_pairs
                .get("v1_Service_default_x"),
            Some(&"svc.yaml".to_string())
        );
    }

    #[test]
    fn empty_payload_defaults() {
        let config: UserConfig = serde_yaml::from_str("{}").expect("parse");
        assert!(config
            .correlation_settings
            .manual_correlation
            .correlation_pairs
            .is_empty());
    }
}
