//! Decoding change-feed payloads into [`Secret`]s
//!
//! Every payload crosses this boundary exactly once. Anything that is not a
//! secret comes back as [`Error::UnexpectedShape`] instead of a panic.

use std::collections::BTreeMap;
use std::path::PathBuf;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use crate::model::{Secret, SecretId};
use crate::{Error, Result};

/// An object delivered by a change-feed that may describe a secret.
pub trait SecretObject: Send + 'static {
    /// Identity of the object, if it carries one. Used for logging.
    fn identity(&self) -> Option<SecretId>;

    /// Decode into a [`Secret`], reading the target path from `annotation`.
    fn decode(self, annotation: &str) -> Result<Secret>;
}

impl SecretObject for KubeSecret {
    fn identity(&self) -> Option<SecretId> {
        let name = self.metadata.name.as_ref()?;
        Some(SecretId::new(self.metadata.namespace.clone(), name.clone()))
    }

    fn decode(self, annotation: &str) -> Result<Secret> {
        let id = self
            .identity()
            .ok_or_else(|| Error::shape("secret has no metadata.name"))?;
        let path = self
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(annotation))
            .map(PathBuf::from);
        let data = self
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, ByteString(value))| (key, value));

        Ok(Secret::new(id, path, data))
    }
}

/// Untyped JSON in the Kubernetes wire shape (`kind: Secret`, base64 `data`).
impl SecretObject for Value {
    fn identity(&self) -> Option<SecretId> {
        let metadata = self.get("metadata")?;
        let name = metadata.get("name")?.as_str()?;
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(SecretId::new(namespace, name))
    }

    fn decode(self, annotation: &str) -> Result<Secret> {
        let Value::Object(mut object) = self else {
            return Err(Error::shape("payload is not a JSON object"));
        };

        match object.get("kind").and_then(Value::as_str) {
            Some("Secret") => {}
            Some(other) => return Err(Error::shape(format!("expected kind Secret, got {}", other))),
            None => return Err(Error::shape("payload has no kind")),
        }

        let metadata: ObjectMeta = match object.remove("metadata") {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::shape(format!("invalid metadata: {}", e)))?,
            None => return Err(Error::shape("payload has no metadata")),
        };
        let data: BTreeMap<String, ByteString> = match object.remove("data") {
            Some(Value::Null) | None => BTreeMap::new(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| Error::shape(format!("invalid data: {}", e)))?,
        };

        KubeSecret {
            metadata,
            data: Some(data),
            ..KubeSecret::default()
        }
        .decode(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_PATH_ANNOTATION;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::Path;

    #[test]
    fn decodes_typed_secret() {
        let secret = KubeSecret {
            metadata: ObjectMeta {
                name: Some("test".into()),
                namespace: Some("default".into()),
                annotations: Some(BTreeMap::from([(
                    DEFAULT_PATH_ANNOTATION.to_string(),
                    "/tmp".to_string(),
                )])),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([(
                "key".to_string(),
                ByteString(b"value".to_vec()),
            )])),
            ..KubeSecret::default()
        };

        let decoded = secret.decode(DEFAULT_PATH_ANNOTATION).unwrap();
        assert_eq!(decoded.id().to_string(), "default/test");
        assert_eq!(decoded.path(), Some(Path::new("/tmp")));
        assert_eq!(decoded.items().len(), 1);
        assert_eq!(decoded.items()[0].key(), "key");
        assert_eq!(decoded.items()[0].value(), b"value");
    }

    #[test]
    fn typed_secret_without_name_is_shape_error() {
        let result = KubeSecret::default().decode(DEFAULT_PATH_ANNOTATION);
        assert!(matches!(result, Err(Error::UnexpectedShape { .. })));
    }

    #[test]
    fn missing_annotation_still_decodes() {
        let value = json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "no-path", "namespace": "default" },
            "data": { "k": "dg==" }
        });

        let decoded = value.decode(DEFAULT_PATH_ANNOTATION).unwrap();
        assert!(decoded.path().is_none());
        assert_eq!(decoded.items()[0].value(), b"v");
    }

    #[test]
    fn custom_annotation_is_honoured() {
        let value = json!({
            "kind": "Secret",
            "metadata": {
                "name": "app",
                "annotations": { "example.com/target": "/srv/app" }
            }
        });

        let decoded = value.decode("example.com/target").unwrap();
        assert_eq!(decoded.path(), Some(Path::new("/srv/app")));
        assert!(decoded.items().is_empty());
    }

    #[test]
    fn wrong_kind_is_shape_error() {
        let value = json!({ "kind": "ConfigMap", "metadata": { "name": "cm" } });
        let err = value.decode(DEFAULT_PATH_ANNOTATION).unwrap_err();
        assert!(err.to_string().contains("ConfigMap"));
    }

    #[test]
    fn non_object_is_shape_error() {
        let result = json!(["not", "a", "secret"]).decode(DEFAULT_PATH_ANNOTATION);
        assert!(matches!(result, Err(Error::UnexpectedShape { .. })));
    }

    #[test]
    fn invalid_base64_is_shape_error() {
        let value = json!({
            "kind": "Secret",
            "metadata": { "name": "bad" },
            "data": { "k": "***not base64***" }
        });
        assert!(matches!(
            value.decode(DEFAULT_PATH_ANNOTATION),
            Err(Error::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn identity_without_decoding() {
        let value = json!({ "kind": "Secret", "metadata": { "name": "a", "namespace": "ns" } });
        assert_eq!(value.identity(), Some(SecretId::new(Some("ns".into()), "a")));
        assert_eq!(json!({}).identity(), None);
    }
}
