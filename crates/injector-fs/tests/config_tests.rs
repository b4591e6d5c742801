use injector_fs::{ConfigStore, Error};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct Sample {
    name: String,
    #[serde(default)]
    count: u32,
}

#[test]
fn loads_toml_by_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sample.toml");
    fs::write(&path, "name = \"a\"\ncount = 3\n").unwrap();

    let loaded: Sample = ConfigStore::new().load(&path).unwrap();
    assert_eq!(loaded, Sample { name: "a".into(), count: 3 });
}

#[test]
fn loads_json_by_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sample.json");
    fs::write(&path, r#"{"name":"b"}"#).unwrap();

    let loaded: Sample = ConfigStore::new().load(&path).unwrap();
    assert_eq!(loaded, Sample { name: "b".into(), count: 0 });
}

#[test]
fn loads_yaml_by_extension() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sample.YML");
    fs::write(&path, "name: c\ncount: 7\n").unwrap();

    let loaded: Sample = ConfigStore::new().load(&path).unwrap();
    assert_eq!(loaded, Sample { name: "c".into(), count: 7 });
}

#[test]
fn malformed_document_is_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, r#"{"name": "#).unwrap();

    let result: Result<Sample, _> = ConfigStore::new().load(&path);
    match result {
        Err(Error::ConfigParse { format, path: p, .. }) => {
            assert_eq!(format, "JSON");
            assert_eq!(p, path);
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn missing_file_is_not_found() {
    let temp = TempDir::new().unwrap();
    let result: Result<Sample, _> = ConfigStore::new().load(&temp.path().join("absent.json"));

    assert!(matches!(result, Err(Error::NotFound { .. })));
}

#[test]
fn unknown_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("sample.ini");
    fs::write(&path, "name=a").unwrap();

    let result: Result<Sample, _> = ConfigStore::new().load(&path);
    assert!(matches!(result, Err(Error::UnsupportedFormat { extension }) if extension == "ini"));
}
