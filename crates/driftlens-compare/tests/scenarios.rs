use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use driftlens_compare::adapters::{DirFetcher, HandlebarsEngine, UnifiedTextDiff};
use driftlens_compare::{
    build_correlator, fingerprint_reference, load_reference, CompareError, DiffContext, ErrorList,
    LoadedReference, OverrideLookup, Summary,
};
use driftlens_core::{ErrorCode, ExitCode};
use driftlens_model::{UserConfig, UserOverride, BUILT_IN_KEY, BUILT_IN_PATHS};

const DESCRIPTOR: &str = "metadata.yaml";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fixture dirs");
    }
    fs::write(path, content).expect("write fixture");
}

fn load(root: &Path) -> Result<(LoadedReference, ErrorList), CompareError> {
    load_reference(
        &DirFetcher::new(root),
        Box::new(HandlebarsEngine::new()),
        DESCRIPTOR,
    )
}

fn run_all(
    loaded: &LoadedReference,
    overrides: Vec<UserOverride>,
    ignored: Vec<ErrorCode>,
    resources: &[Value],
) -> (Summary, Vec<driftlens_compare::ResourceDiff>) {
    let correlator =
        build_correlator(loaded, &UserConfig::default(), ignored).expect("build correlator");
    let lookup = OverrideLookup::new(overrides);
    let diff = UnifiedTextDiff;
    let context = DiffContext::new(&correlator, &lookup, &diff);
    let mut diffs = Vec::new();
    for resource in resources {
        if let Ok(result) = context.run_for(resource, None) {
            diffs.push(result);
        }
    }
    let summary = Summary::build(&loaded.reference, &correlator, &diffs, None);
    (summary, diffs)
}

fn single_service_reference(root: &Path) {
    write(
        root,
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: networking
        requiredTemplates:
          - path: svc.yaml
",
    );
    write(root, "svc.yaml", "kind: Service\nmetadata:\n  name: x\n");
}

#[test]
fn matched_resource_with_runtime_noise_diffs_clean() {
    let dir = TempDir::new().expect("tempdir");
    single_service_reference(dir.path());
    let (loaded, errors) = load(dir.path()).expect("load");
    assert!(errors.is_empty(), "unexpected load errors: {errors}");

    let live = json!({
        "kind": "Service",
        "metadata": {"name": "x", "resourceVersion": "7"},
    });
    let (summary, diffs) = run_all(&loaded, vec![], vec![], &[live]);

    assert_eq!(diffs.len(), 1);
    assert!(diffs[0].clean, "diff output: {}", String::from_utf8_lossy(&diffs[0].diff));
    assert_eq!(diffs[0].template_path, "svc.yaml");
    assert!(summary.matched_templates.contains("svc.yaml"));
    assert_eq!(summary.missing.count, 0);
    assert_eq!(summary.exit_code(), ExitCode::Success);
}

#[test]
fn indistinguishable_templates_report_multiple_matches() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: workloads
        requiredTemplates:
          - path: a.yaml
          - path: b.yaml
",
    );
    write(dir.path(), "a.yaml", "kind: Pod\n");
    write(dir.path(), "b.yaml", "kind: Pod\n");
    let (loaded, _) = load(dir.path()).expect("load");

    let correlator =
        build_correlator(&loaded, &UserConfig::default(), vec![]).expect("correlator");
    let live = json!({"kind": "Pod", "metadata": {"name": "p"}});
    let err = correlator.matching(&live).expect_err("ambiguous");
    match err {
        CompareError::MultipleMatches { names, .. } => {
            assert_eq!(names, vec!["a.yaml".to_string(), "b.yaml".to_string()]);
        }
        other => panic!("expected MultipleMatches, got {other:?}"),
    }

    let summary = Summary::build(&loaded.reference, &correlator, &[], None);
    assert_eq!(summary.unmatched_resources, vec!["_Pod_p".to_string()]);
    assert_eq!(summary.exit_code(), ExitCode::Differences);
}

#[test]
fn ignorable_miss_codes_keep_the_unmatched_list_clean() {
    let dir = TempDir::new().expect("tempdir");
    single_service_reference(dir.path());
    let (loaded, _) = load(dir.path()).expect("load");

    let correlator = build_correlator(
        &loaded,
        &UserConfig::default(),
        vec![ErrorCode::UnknownMatch, ErrorCode::MultipleMatches],
    )
    .expect("correlator");
    let stranger = json!({"kind": "ConfigMap", "metadata": {"name": "cm"}});
    assert!(correlator.matching(&stranger).is_err());
    assert!(correlator.unmatched_resources().is_empty());
}

#[test]
fn custom_omission_set_suppresses_annotation_noise() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: networking
        requiredTemplates:
          - path: svc.yaml
            config:
              fieldsToOmitRefs: [runtime, built-in]
fieldsToOmit:
  config:
    defaultKey: built-in
  items:
    runtime:
      - metadata.annotations.\"k8s.io/note\"
",
    );
    write(dir.path(), "svc.yaml", "kind: Service\nmetadata:\n  name: x\n");
    let (loaded, errors) = load(dir.path()).expect("load");
    assert!(errors.is_empty());

    let live = json!({
        "kind": "Service",
        "metadata": {
            "name": "x",
            "uid": "abc",
            "annotations": {"k8s.io/note": "scribble"},
        },
    });
    let (_, diffs) = run_all(&loaded, vec![], vec![], &[live]);
    assert!(diffs[0].clean, "diff output: {}", String::from_utf8_lossy(&diffs[0].diff));
}

#[test]
fn unknown_default_key_fails_the_load() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts: []
fieldsToOmit:
  config:
    defaultKey: missing
",
    );
    let err = load(dir.path()).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ConfigMalformed);
}

#[test]
fn missing_descriptor_fails_with_config_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let err = load(dir.path()).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
}

#[test]
fn built_in_set_is_seeded_even_over_user_entries() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts: []
fieldsToOmit:
  items:
    built-in:
      - spec
",
    );
    let (loaded, _) = load(dir.path()).expect("load");
    let seeded = loaded
        .reference
        .fields_to_omit
        .items
        .get(BUILT_IN_KEY)
        .expect("built-in present");
    let expected: Vec<String> = BUILT_IN_PATHS.iter().map(|p| (*p).to_string()).collect();
    assert_eq!(seeded, &expected);
    assert_eq!(loaded.omissions.default_key(), BUILT_IN_KEY);
    assert_eq!(
        loaded.omissions.get(BUILT_IN_KEY).map(<[_]>::len),
        Some(BUILT_IN_PATHS.len())
    );
}

#[test]
fn malformed_omission_paths_are_dropped_not_fatal() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts: []
fieldsToOmit:
  config:
    defaultKey: partial
  items:
    partial:
      - metadata.uid
      - 'metadata.\"unterminated'
",
    );
    let (loaded, errors) = load(dir.path()).expect("load survives bad paths");
    assert!(errors.is_empty());
    assert_eq!(loaded.omissions.get("partial").map(<[_]>::len), Some(1));
}

#[test]
fn override_reconciles_known_drift() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: workloads
        requiredTemplates:
          - path: deploy.yaml
",
    );
    write(
        dir.path(),
        "deploy.yaml",
        "kind: Deployment\nmetadata:\n  name: app\nspec:\n  replicas: 1\n",
    );
    let (loaded, _) = load(dir.path()).expect("load");

    let live = json!({
        "kind": "Deployment",
        "metadata": {"name": "app"},
        "spec": {"replicas": 3},
    });

    let (_, without_override) = run_all(&loaded, vec![], vec![], &[live.clone()]);
    assert!(!without_override[0].clean);

    let overrides = UserOverride::load_all(
        "
- name: app
  kind: Deployment
  type: mergepatch
  patch: '{\"spec\": {\"replicas\": 3}}'
",
    )
    .expect("overrides");
    let (summary, with_override) = run_all(&loaded, overrides, vec![], &[live]);
    assert!(with_override[0].clean, "diff: {}", String::from_utf8_lossy(&with_override[0].diff));
    assert!(with_override[0].patched);
    assert_eq!(summary.exit_code(), ExitCode::Success);
}

#[test]
fn failing_override_reports_and_diffs_unpatched() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: workloads
        requiredTemplates:
          - path: deploy.yaml
",
    );
    write(
        dir.path(),
        "deploy.yaml",
        "kind: Deployment\nmetadata:\n  name: app\nspec:\n  replicas: 1\n",
    );
    let (loaded, _) = load(dir.path()).expect("load");

    let live = json!({
        "kind": "Deployment",
        "metadata": {"name": "app"},
        "spec": {"replicas": 3},
    });
    let overrides = UserOverride::load_all(
        "
- name: app
  kind: Deployment
  type: rfc6902
  patch: '[{\"op\": \"replace\", \"path\": \"/spec/missing\", \"value\": 1}]'
",
    )
    .expect("overrides");
    let (_, diffs) = run_all(&loaded, overrides, vec![], &[live]);
    assert!(!diffs[0].clean);
    assert!(!diffs[0].patched);
    assert!(diffs[0].patch_error.is_some());
}

#[test]
fn merge_templates_inherit_unspecified_fields_from_live() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: workloads
        requiredTemplates:
          - path: deploy.yaml
            config:
              ignore-unspecified-fields: true
",
    );
    write(
        dir.path(),
        "deploy.yaml",
        "kind: Deployment\nmetadata:\n  name: app\nspec:\n  replicas: 2\n",
    );
    let (loaded, _) = load(dir.path()).expect("load");

    let live = json!({
        "kind": "Deployment",
        "metadata": {"name": "app", "labels": {"team": "net"}},
        "spec": {"replicas": 2, "paused": false},
    });
    let (_, diffs) = run_all(&loaded, vec![], vec![], &[live]);
    assert!(diffs[0].clean, "diff: {}", String::from_utf8_lossy(&diffs[0].diff));
}

#[test]
fn partially_instantiated_components_report_their_gaps() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: platform
    components:
      - name: c1
        type: Required
        requiredTemplates:
          - path: t1.yaml
          - path: t2.yaml
      - name: c2
        type: Optional
        requiredTemplates:
          - path: t3.yaml
          - path: t4.yaml
",
    );
    write(dir.path(), "t1.yaml", "kind: Alpha\nmetadata:\n  name: a\n");
    write(dir.path(), "t2.yaml", "kind: Beta\nmetadata:\n  name: b\n");
    write(dir.path(), "t3.yaml", "kind: Gamma\nmetadata:\n  name: c\n");
    write(dir.path(), "t4.yaml", "kind: Delta\nmetadata:\n  name: d\n");
    let (loaded, _) = load(dir.path()).expect("load");

    let resources = [
        json!({"kind": "Alpha", "metadata": {"name": "a"}}),
        json!({"kind": "Gamma", "metadata": {"name": "c"}}),
    ];
    let (summary, _) = run_all(&loaded, vec![], vec![], &resources);
    let platform = summary.missing.parts.get("platform").expect("part");
    assert_eq!(platform.get("c1"), Some(&vec!["t2.yaml".to_string()]));
    assert_eq!(platform.get("c2"), Some(&vec!["t4.yaml".to_string()]));
    assert_eq!(summary.missing.count, 2);
    assert_eq!(summary.exit_code(), ExitCode::Differences);

    // with the optional component untouched, only the required one reports
    let resources = [json!({"kind": "Alpha", "metadata": {"name": "a"}})];
    let (summary, _) = run_all(&loaded, vec![], vec![], &resources);
    let platform = summary.missing.parts.get("platform").expect("part");
    assert_eq!(platform.get("c1"), Some(&vec!["t2.yaml".to_string()]));
    assert_eq!(platform.get("c2"), None);
    assert_eq!(summary.missing.count, 1);
}

#[test]
fn broken_template_is_skipped_with_joined_errors() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: networking
        requiredTemplates:
          - path: good.yaml
          - path: broken.yaml
",
    );
    write(dir.path(), "good.yaml", "kind: Service\nmetadata:\n  name: x\n");
    write(dir.path(), "broken.yaml", "kind: {{#if}}\n");
    let (loaded, errors) = load(dir.path()).expect("partial load");
    assert_eq!(errors.len(), 1);
    assert_eq!(loaded.templates.len(), 1);
    assert_eq!(loaded.templates[0].path(), "good.yaml");
}

#[test]
fn templates_render_with_function_files_and_live_context() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        DESCRIPTOR,
        "
parts:
  - name: base
    components:
      - name: networking
        requiredTemplates:
          - path: svc.yaml
templateFunctionFiles:
  - shared_labels
",
    );
    write(dir.path(), "shared_labels", "app.kubernetes.io/part-of: platform");
    write(
        dir.path(),
        "svc.yaml",
        "kind: Service\nmetadata:\n  name: x\n  labels:\n    {{> shared_labels }}\n  namespace: {{ metadata.namespace }}\n",
    );
    let (loaded, errors) = load(dir.path()).expect("load");
    assert!(errors.is_empty(), "{errors}");

    let live = json!({
        "kind": "Service",
        "metadata": {
            "name": "x",
            "namespace": "prod",
            "labels": {"app.kubernetes.io/part-of": "platform"},
        },
    });
    let (_, diffs) = run_all(&loaded, vec![], vec![], &[live]);
    assert!(diffs[0].clean, "diff: {}", String::from_utf8_lossy(&diffs[0].diff));
}

#[test]
fn metrics_correlator_is_safe_across_worker_threads() {
    let dir = TempDir::new().expect("tempdir");
    single_service_reference(dir.path());
    let (loaded, _) = load(dir.path()).expect("load");
    let correlator =
        build_correlator(&loaded, &UserConfig::default(), vec![]).expect("correlator");

    std::thread::scope(|scope| {
        for i in 0..8 {
            let correlator = &correlator;
            scope.spawn(move || {
                let matched = json!({"kind": "Service", "metadata": {"name": "x"}});
                let stranger = json!({"kind": "ConfigMap", "metadata": {"name": format!("cm-{i}")}});
                assert!(correlator.matching(&matched).is_ok());
                assert!(correlator.matching(&stranger).is_err());
            });
        }
    });

    assert_eq!(
        correlator.matched_templates(),
        std::collections::BTreeSet::from(["svc.yaml".to_string()])
    );
    let mut unmatched = correlator.unmatched_resources();
    assert_eq!(unmatched.len(), 8);
    unmatched.sort();
    unmatched.dedup();
    assert_eq!(unmatched.len(), 8);
}

#[test]
fn fingerprint_is_stable_until_the_bundle_changes() {
    let dir = TempDir::new().expect("tempdir");
    single_service_reference(dir.path());
    let (loaded, _) = load(dir.path()).expect("load");
    let fetcher = DirFetcher::new(dir.path());

    let first = fingerprint_reference(&fetcher, &loaded.reference).expect("fingerprint");
    let second = fingerprint_reference(&fetcher, &loaded.reference).expect("fingerprint");
    assert_eq!(first, second);
    assert_eq!(first.split('-').count(), 8);

    write(dir.path(), "svc.yaml", "kind: Service\nmetadata:\n  name: y\n");
    let changed = fingerprint_reference(&fetcher, &loaded.reference).expect("fingerprint");
    assert_ne!(first, changed);
}

#[test]
fn fingerprint_fails_fatally_on_unreadable_files() {
    let dir = TempDir::new().expect("tempdir");
    single_service_reference(dir.path());
    let (loaded, _) = load(dir.path()).expect("load");
    fs::remove_file(dir.path().join("svc.yaml")).expect("remove template");

    let err = fingerprint_reference(&DirFetcher::new(dir.path()), &loaded.reference)
        .expect_err("must fail");
    assert!(err.code().is_fatal());
}
