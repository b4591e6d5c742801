//! Tests for loading secret lists from disk

use injector_core::{Error, SecretsManifest};
use injector_test_utils::TestOutput;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::PathBuf;

#[test]
fn test_load_json_manifest() {
    let out = TestOutput::new();
    let path = out.write(
        "secrets.json",
        r#"[
            {"name": "db", "namespace": "prod", "path": "/run/secrets/db", "keys": ["password"]},
            {"name": "a", "path": "/p"}
        ]"#,
    );

    let manifest = SecretsManifest::load(&path).unwrap();
    assert_eq!(manifest.len(), 2);

    let db = &manifest.entries()[0];
    assert_eq!(db.id().to_string(), "prod/db");
    assert_eq!(db.keys, vec!["password".to_string()]);

    let a = &manifest.entries()[1];
    assert_eq!(a.namespace, None);
    assert_eq!(a.path, PathBuf::from("/p"));
    assert!(a.keys.is_empty());
}

#[rstest]
#[case("secrets.yaml")]
#[case("secrets.yml")]
fn test_load_yaml_manifest(#[case] file_name: &str) {
    let out = TestOutput::new();
    let path = out.write(file_name, "- name: a\n  path: /p\n  keys: [token]\n");

    let manifest = SecretsManifest::load(&path).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.entries()[0].keys, vec!["token".to_string()]);
}

#[test]
fn test_unknown_extension_is_parsed_as_json() {
    let out = TestOutput::new();
    let path = out.write("secrets.list", r#"[{"name": "a", "path": "/p"}]"#);

    assert_eq!(SecretsManifest::load(&path).unwrap().len(), 1);
}

#[test]
fn test_missing_file_fails_load() {
    let out = TestOutput::new();

    let result = SecretsManifest::load(&out.root().join("absent.json"));
    assert!(matches!(
        result,
        Err(Error::Fs(injector_fs::Error::NotFound { .. }))
    ));
}

#[test]
fn test_malformed_document_fails_whole_load() {
    let out = TestOutput::new();
    let path = out.write("secrets.json", r#"[{"name": "a", "path": "/p"}, {"name": }]"#);

    assert!(SecretsManifest::load(&path).is_err());
}

#[test]
fn test_invalid_record_fails_whole_load() {
    let out = TestOutput::new();
    let path = out.write(
        "secrets.json",
        r#"[{"name": "a", "path": "/p"}, {"name": "b", "path": ""}]"#,
    );

    let result = SecretsManifest::load(&path);
    assert!(matches!(
        result,
        Err(Error::InvalidManifestEntry { index: 1, .. })
    ));
}
