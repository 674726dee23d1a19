//! Durable training artifact and its byte codec.
//!
//! An artifact couples the embedding model identifier with the opaque
//! serialized classifier state, plus the label catalog for router heads.
//! The codec guarantees exactly one law: `decode(encode(a)) == a`,
//! field-for-field, catalog order included. It never inspects the
//! classifier state and never checks embedding-model compatibility —
//! that is a runtime concern, not a serialization one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Bytes that do not parse as an artifact at all (malformed, truncated).
    #[error("corrupt artifact: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// Well-formed bytes missing a required field.
    #[error("incomplete artifact: missing required field `{field}`")]
    Incomplete { field: &'static str },

    /// A router pipeline was handed an artifact without a label catalog.
    #[error("artifact has no label catalog; was it trained as a router head?")]
    MissingCatalog,

    #[error("failed to serialize artifact: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The durable unit produced by one training run.
///
/// Written once, read any number of times; retraining produces a new
/// artifact rather than patching an old one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    /// Which embedding configuration produced the vectors the classifier
    /// was fit on. Inference must embed with the same configuration.
    pub embedding_model_id: String,
    /// Opaque serialized classifier. Only the pipelines know its shape.
    pub classifier_state: serde_json::Value,
    /// Catalog captured at training time; router artifacts only. The
    /// importance head's classes are implicitly `{false, true}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_catalog: Option<Vec<String>>,
}

/// Decode target with every field optional, so field presence can be
/// reported precisely instead of as a generic parse failure.
#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    embedding_model_id: Option<String>,
    #[serde(default)]
    classifier_state: Option<serde_json::Value>,
    #[serde(default)]
    label_catalog: Option<Vec<String>>,
}

impl Artifact {
    pub fn encode(&self) -> Result<Vec<u8>, ArtifactError> {
        serde_json::to_vec(self).map_err(ArtifactError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ArtifactError> {
        let raw: RawArtifact = serde_json::from_slice(bytes).map_err(ArtifactError::Corrupt)?;

        let embedding_model_id = raw.embedding_model_id.ok_or(ArtifactError::Incomplete {
            field: "embedding_model_id",
        })?;
        let classifier_state = raw.classifier_state.ok_or(ArtifactError::Incomplete {
            field: "classifier_state",
        })?;

        Ok(Self {
            embedding_model_id,
            classifier_state,
            label_catalog: raw.label_catalog,
        })
    }

    /// The label catalog, required for router inference.
    pub fn catalog(&self) -> Result<&[String], ArtifactError> {
        self.label_catalog
            .as_deref()
            .ok_or(ArtifactError::MissingCatalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn importance_artifact() -> Artifact {
        Artifact {
            embedding_model_id: "all-MiniLM-L6-v2".to_string(),
            classifier_state: json!({"classes": [false, true], "weights": [[0.1, -0.2]]}),
            label_catalog: None,
        }
    }

    fn router_artifact() -> Artifact {
        Artifact {
            embedding_model_id: "all-MiniLM-L6-v2".to_string(),
            classifier_state: json!({"classes": ["auth", "billing", "ui"]}),
            label_catalog: Some(vec![
                "auth".to_string(),
                "billing".to_string(),
                "ui".to_string(),
            ]),
        }
    }

    #[test]
    fn round_trip_importance() {
        let a = importance_artifact();
        let decoded = Artifact::decode(&a.encode().unwrap()).unwrap();
        assert_eq!(decoded, a);
    }

    #[test]
    fn round_trip_router_preserves_catalog_order() {
        let a = router_artifact();
        let decoded = Artifact::decode(&a.encode().unwrap()).unwrap();
        assert_eq!(decoded, a);
        assert_eq!(decoded.catalog().unwrap(), ["auth", "billing", "ui"]);
    }

    #[test]
    fn importance_artifact_omits_catalog_field() {
        let bytes = importance_artifact().encode().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("label_catalog"));
    }

    #[test]
    fn malformed_bytes_are_corrupt() {
        let err = Artifact::decode(b"not json at all").unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt(_)));
    }

    #[test]
    fn truncated_bytes_are_corrupt() {
        let mut bytes = router_artifact().encode().unwrap();
        bytes.truncate(bytes.len() / 2);
        let err = Artifact::decode(&bytes).unwrap_err();
        assert!(matches!(err, ArtifactError::Corrupt(_)));
    }

    #[test]
    fn missing_model_id_is_incomplete() {
        let bytes = serde_json::to_vec(&json!({"classifier_state": {}})).unwrap();
        let err = Artifact::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Incomplete {
                field: "embedding_model_id"
            }
        ));
    }

    #[test]
    fn missing_classifier_state_is_incomplete() {
        let bytes = serde_json::to_vec(&json!({"embedding_model_id": "m"})).unwrap();
        let err = Artifact::decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Incomplete {
                field: "classifier_state"
            }
        ));
    }

    #[test]
    fn catalog_absent_for_importance_head() {
        let err = importance_artifact().catalog().unwrap_err();
        assert!(matches!(err, ArtifactError::MissingCatalog));
    }
}
