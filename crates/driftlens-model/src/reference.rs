// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::omissions::FieldsToOmit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ValidationError {}

/// The reference descriptor: an ordered hierarchy of parts that own
/// components that own templates, plus the omission policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Reference {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_function_files: Vec<String>,
    #[serde(default)]
    pub fields_to_omit: FieldsToOmit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Part {
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// Classification of a component. Independent from the per-template
/// required/optional lists: an Optional component still carries required
/// templates, they just only count once the component is partially present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ComponentKind {
    #[default]
    Required,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_templates: Vec<TemplateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_templates: Vec<TemplateSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSpec {
    pub path: String,
    #[serde(default, skip_serializing_if = "TemplateConfig::is_default")]
    pub config: TemplateConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Wire name `ignore-unspecified-fields`: template fields left unset
    /// inherit from the live resource during normalization.
    #[serde(default, rename = "ignore-unspecified-fields")]
    pub allow_merge: bool,
    #[serde(default, rename = "fieldsToOmitRefs", skip_serializing_if = "Vec::is_empty")]
    pub fields_to_omit_refs: Vec<String>,
}

impl TemplateConfig {
    #[must_use]
    pub fn is_default(&self) -> bool {
        !self.allow_merge && self.fields_to_omit_refs.is_empty()
    }
}

/// Missing-required rollup: part name → component name → unmatched template
/// paths, plus the total count across the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct MissingReport {
    pub parts: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub count: usize,
}

impl Component {
    /// Paths of required templates absent from `matched`. Optional templates
    /// never participate, whatever the component kind.
    #[must_use]
    pub fn missing_required(&self, matched: &BTreeSet<String>) -> Vec<String> {
        self.required_templates
            .iter()
            .filter(|spec| !matched.contains(&spec.path))
            .map(|spec| spec.path.clone())
            .collect()
    }

    fn reports_missing(&self, missing: &[String]) -> bool {
        if missing.is_empty() {
            return false;
        }
        match self.kind {
            ComponentKind::Required => true,
            // Optional components only complain once partially instantiated:
            // some, but not all, of their required templates matched.
            ComponentKind::Optional => missing.len() != self.required_templates.len(),
        }
    }
}

impl Part {
    #[must_use]
    pub fn missing_required(&self, matched: &BTreeSet<String>) -> (BTreeMap<String, Vec<String>>, usize) {
        let mut components = BTreeMap::new();
        let mut count = 0;
        for component in &self.components {
            let missing = component.missing_required(matched);
            if component.reports_missing(&missing) {
                count += missing.len();
                components.insert(component.name.clone(), missing);
            }
        }
        (components, count)
    }
}

impl Reference {
    /// Every template spec in declaration order, required before optional
    /// within each component.
    pub fn template_specs(&self) -> impl Iterator<Item = &TemplateSpec> {
        self.parts.iter().flat_map(|part| {
            part.components.iter().flat_map(|component| {
                component
                    .required_templates
                    .iter()
                    .chain(component.optional_templates.iter())
            })
        })
    }

    #[must_use]
    pub fn missing_required(&self, matched: &BTreeSet<String>) -> MissingReport {
        let mut report = MissingReport::default();
        for part in &self.parts {
            let (components, count) = part.missing_required(matched);
            if count > 0 {
                report.parts.insert(part.name.clone(), components);
                report.count += count;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(path: &str) -> TemplateSpec {
        TemplateSpec {
            path: path.to_string(),
            config: TemplateConfig::default(),
        }
    }

    fn matched(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| (*p).to_string()).collect()
    }

    fn part_with_two_components() -> Part {
        Part {
            name: "p".to_string(),
            components: vec![
                Component {
                    name: "c1".to_string(),
                    kind: ComponentKind::Required,
                    required_templates: vec![spec("t1"), spec("t2")],
                    optional_templates: vec![],
                },
                Component {
                    name: "c2".to_string(),
                    kind: ComponentKind::Optional,
                    required_templates: vec![spec("t3"), spec("t4")],
                    optional_templates: vec![],
                },
            ],
        }
    }

    #[test]
    fn partially_instantiated_optional_component_reports() {
        let reference = Reference {
            parts: vec![part_with_two_components()],
            ..Reference::default()
        };
        let report = reference.missing_required(&matched(&["t1", "t3"]));
        assert_eq!(report.count, 2);
        let p = report.parts.get("p").expect("part reported");
        assert_eq!(p.get("c1"), Some(&vec!["t2".to_string()]));
        assert_eq!(p.get("c2"), Some(&vec!["t4".to_string()]));
    }

    #[test]
    fn untouched_optional_component_stays_silent() {
        let reference = Reference {
            parts: vec![part_with_two_components()],
            ..Reference::default()
        };
        let report = reference.missing_required(&matched(&["t1", "t2"]));
        assert!(report.parts.is_empty());
        assert_eq!(report.count, 0);
    }

    #[test]
    fn rollup_count_equals_sum_of_reported_paths() {
        let reference = Reference {
            parts: vec![part_with_two_components()],
            ..Reference::default()
        };
        let report = reference.missing_required(&matched(&["t3"]));
        let total: usize = report
            .parts
            .values()
            .flat_map(|components| components.values())
            .map(Vec::len)
            .sum();
        assert_eq!(report.count, total);
    }

    #[test]
    fn optional_templates_never_count_as_missing() {
        let reference = Reference {
            parts: vec![Part {
                name: "p".to_string(),
                components: vec![Component {
                    name: "c".to_string(),
                    kind: ComponentKind::Required,
                    required_templates: vec![spec("t1")],
                    optional_templates: vec![spec("extra")],
                }],
            }],
            ..Reference::default()
        };
        let report = reference.missing_required(&matched(&["t1"]));
        assert_eq!(report.count, 0);
    }

    #[test]
    fn descriptor_parses_with_defaults() {
        let raw = "
parts:
  - name: base
    components:
      - name: networking
        requiredTemplates:
          - path: svc.yaml
            config:
              ignore-unspecified-fields: true
              fieldsToOmitRefs: [runtime]
";
        let reference: Reference = serde_yaml::from_str(raw).expect("parse");
        let component = &reference.parts[0].components[0];
        assert_eq!(component.kind, ComponentKind::Required);
        assert!(component.required_templates[0].config.allow_merge);
        assert_eq!(
            component.required_templates[0].config.fields_to_omit_refs,
            vec!["runtime".to_string()]
        );
    }

    #[test]
    fn unknown_descriptor_fields_are_rejected() {
        let raw = "
parts: []
surprise: true
";
        assert!(serde_yaml::from_str::<Reference>(raw).is_err());
    }
}
