//! [`SecretBuilder`] for secret objects as a change-feed would deliver them.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

/// Annotation the fixtures put the target path under. Matches the
/// injector's default.
pub const TEST_PATH_ANNOTATION: &str = "secret-injector/path";

/// Builds a secret object.
///
/// # Example
///
/// ```rust
/// use injector_test_utils::SecretBuilder;
///
/// let object = SecretBuilder::new("app")
///     .namespace("default")
///     .path("/out/app")
///     .data("password", "s3cr3t")
///     .to_json();
/// assert_eq!(object["kind"], "Secret");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SecretBuilder {
    name: String,
    namespace: Option<String>,
    annotations: BTreeMap<String, String>,
    data: BTreeMap<String, Vec<u8>>,
}

impl SecretBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the target directory under [`TEST_PATH_ANNOTATION`].
    pub fn path(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.annotation(TEST_PATH_ANNOTATION, path)
    }

    pub fn annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// The typed Kubernetes object.
    pub fn build(self) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: self.namespace,
                annotations: (!self.annotations.is_empty()).then_some(self.annotations),
                ..ObjectMeta::default()
            },
            data: Some(
                self.data
                    .into_iter()
                    .map(|(key, value)| (key, ByteString(value)))
                    .collect(),
            ),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        }
    }

    /// The object in its JSON wire shape, with base64-encoded data.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.clone().build())
            .expect("SecretBuilder::to_json: secret serializes")
    }
}
