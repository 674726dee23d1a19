//! Train and infer pipelines for the two triage heads.
//!
//! Each pipeline is a single-shot unit of work: validate samples, one
//! batched embedding call, one classifier fit or prediction, one artifact
//! in or out. No retries; every failure propagates immediately.
//!
//! Training on a degenerate label set (fewer than two distinct labels) is
//! a *successful* skip, not an error, so downstream automation can tell
//! "nothing to learn" apart from "failed" without parsing stderr.

use ndarray::{Array1, Array2};
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use thiserror::Error;
use tracing::info;

use triage_core::align::align_to_catalog;
use triage_core::artifact::{Artifact, ArtifactError};
use triage_core::catalog::LabelCatalog;
use triage_core::sample::{ImportanceSample, RouterSample};

use crate::classifier::{ClassifierError, FitParams, SoftmaxClassifier};
use crate::embedder::{EmbedderError, TextEmbedder};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no training samples")]
    EmptyDataset,

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// The artifact's classifier state does not deserialize as the head
    /// this pipeline expects.
    #[error("classifier state does not match this head: {0}")]
    BadState(#[source] serde_json::Error),
}

/// Result of a training run.
#[derive(Debug)]
pub enum TrainOutcome {
    /// Fewer than two distinct labels observed; no artifact produced.
    Skipped {
        samples: usize,
        /// Distinct label count; router head only.
        labels: Option<usize>,
        reason: String,
    },
    Trained {
        samples: usize,
        /// Catalog size; router head only.
        labels: Option<usize>,
        artifact: Artifact,
    },
}

/// Importance verdict for one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceReport {
    pub important: bool,
    /// `P(important)`, rounded to 4 decimal digits.
    pub probability: f64,
}

/// Router scores for one text: one weight per catalog label.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterReport {
    /// One `(label, weight)` pair per catalog label, in catalog order —
    /// whatever that order is, sorted or not. May not sum to 1 when a
    /// catalog label was never observed by the classifier.
    pub head_weights: Vec<(String, f32)>,
    pub label_list: Vec<String>,
}

impl RouterReport {
    /// Weight for one label, if it is in the catalog.
    pub fn weight(&self, label: &str) -> Option<f32> {
        self.head_weights
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, w)| *w)
    }
}

// `head_weights` must serialize as a JSON object whose key order follows
// the catalog, so the pairs are emitted as a map by hand instead of going
// through a sorting collection.
impl Serialize for RouterReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct HeadWeights<'a>(&'a [(String, f32)]);

        impl Serialize for HeadWeights<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (label, weight) in self.0 {
                    map.serialize_entry(label, weight)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("RouterReport", 2)?;
        state.serialize_field("head_weights", &HeadWeights(&self.head_weights))?;
        state.serialize_field("label_list", &self.label_list)?;
        state.end()
    }
}

/// Train the binary importance head.
///
/// The embedder is built only once there is something to fit, so a
/// degenerate dataset skips cleanly even when the embedding model is not
/// installed.
pub fn train_importance<E, F>(
    make_embedder: F,
    samples: &[ImportanceSample],
) -> Result<TrainOutcome, PipelineError>
where
    E: TextEmbedder,
    F: FnOnce() -> Result<E, EmbedderError>,
{
    if samples.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let labels: Vec<bool> = samples.iter().map(|s| s.important()).collect();

    // Degenerate-input guard: a classifier that only ever saw one class
    // is meaningless, so skip rather than fit.
    let has_true = labels.iter().any(|&l| l);
    let has_false = labels.iter().any(|&l| !l);
    if !(has_true && has_false) {
        let reason = format!(
            "need both true and false labels to train, got only {}",
            labels[0]
        );
        info!(samples = samples.len(), "skipping importance training: {reason}");
        return Ok(TrainOutcome::Skipped {
            samples: samples.len(),
            labels: None,
            reason,
        });
    }

    let mut embedder = make_embedder()?;
    let texts: Vec<&str> = samples.iter().map(|s| s.text()).collect();
    let x = embeddings_matrix(embedder.embed_batch(&texts)?)?;
    let classifier = SoftmaxClassifier::fit(&x, &labels, &FitParams::default())?;

    Ok(TrainOutcome::Trained {
        samples: samples.len(),
        labels: None,
        artifact: Artifact {
            embedding_model_id: embedder.model_id().to_string(),
            classifier_state: serde_json::to_value(&classifier).map_err(ArtifactError::Encode)?,
            label_catalog: None,
        },
    })
}

/// Train the multi-class label-router head.
///
/// As with [`train_importance`], the embedder is only built past the
/// degenerate-label guard.
pub fn train_router<E, F>(
    make_embedder: F,
    samples: &[RouterSample],
) -> Result<TrainOutcome, PipelineError>
where
    E: TextEmbedder,
    F: FnOnce() -> Result<E, EmbedderError>,
{
    if samples.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let targets: Vec<&str> = samples.iter().map(|s| s.label()).collect();
    let catalog = LabelCatalog::from_labels(targets.iter().copied());

    if !catalog.is_trainable() {
        let reason = format!(
            "need at least 2 distinct labels to train, got {}",
            catalog.len()
        );
        info!(samples = samples.len(), "skipping router training: {reason}");
        return Ok(TrainOutcome::Skipped {
            samples: samples.len(),
            labels: Some(catalog.len()),
            reason,
        });
    }

    let mut embedder = make_embedder()?;
    let texts: Vec<&str> = samples.iter().map(|s| s.text()).collect();
    let x = embeddings_matrix(embedder.embed_batch(&texts)?)?;
    let labels: Vec<String> = targets.iter().map(|s| s.to_string()).collect();
    let classifier = SoftmaxClassifier::fit(&x, &labels, &FitParams::default())?;

    Ok(TrainOutcome::Trained {
        samples: samples.len(),
        labels: Some(catalog.len()),
        artifact: Artifact {
            embedding_model_id: embedder.model_id().to_string(),
            classifier_state: serde_json::to_value(&classifier).map_err(ArtifactError::Encode)?,
            label_catalog: Some(catalog.into_labels()),
        },
    })
}

/// Score one text against an importance artifact.
///
/// The caller supplies an embedder compatible with the artifact's
/// `embedding_model_id`; the pipeline does not own provider selection and
/// cannot detect a mismatch.
pub fn infer_importance<E: TextEmbedder>(
    embedder: &mut E,
    artifact: &Artifact,
    text: &str,
) -> Result<ImportanceReport, PipelineError> {
    let classifier: SoftmaxClassifier<bool> =
        serde_json::from_value(artifact.classifier_state.clone())
            .map_err(PipelineError::BadState)?;

    let vector = Array1::from(embedder.embed(text)?);
    let probabilities = classifier.predict_proba(vector.view())?;
    let (important, probability) = importance_from_probabilities(&probabilities);

    Ok(ImportanceReport {
        important,
        probability,
    })
}

/// Score one text against a router artifact, aligned to its catalog.
pub fn infer_router<E: TextEmbedder>(
    embedder: &mut E,
    artifact: &Artifact,
    text: &str,
) -> Result<RouterReport, PipelineError> {
    let catalog = artifact.catalog()?;
    let classifier: SoftmaxClassifier<String> =
        serde_json::from_value(artifact.classifier_state.clone())
            .map_err(PipelineError::BadState)?;

    let vector = Array1::from(embedder.embed(text)?);
    let probabilities = classifier.predict_proba(vector.view())?;
    let aligned = align_to_catalog(catalog, classifier.classes(), &probabilities);

    Ok(RouterReport {
        head_weights: aligned,
        label_list: catalog.to_vec(),
    })
}

/// Binary extraction rule: index 1 is `P(true)` when the classifier knows
/// both classes; a single-entry vector (degenerate classifier, guarded
/// against at training time) is taken as `P(true)` wholesale. Threshold
/// at 0.5 inclusive, probability rounded to 4 digits for reporting.
fn importance_from_probabilities(probabilities: &[f32]) -> (bool, f64) {
    let p = if probabilities.len() > 1 {
        probabilities[1]
    } else {
        probabilities.first().copied().unwrap_or(0.0)
    } as f64;

    (p >= 0.5, round4(p))
}

/// Round to 4 decimal digits, ties to even (the convention the reference
/// `round()` builtins use at exact ties).
fn round4(p: f64) -> f64 {
    (p * 10_000.0).round_ties_even() / 10_000.0
}

/// Stack per-text vectors into an `(n, dim)` matrix.
fn embeddings_matrix(vectors: Vec<Vec<f32>>) -> Result<Array2<f32>, PipelineError> {
    let n = vectors.len();
    let dim = vectors.first().map(Vec::len).unwrap_or(0);

    if vectors.iter().any(|v| v.len() != dim) {
        return Err(PipelineError::Embedder(EmbedderError::BadOutput(
            "ragged embedding batch".to_string(),
        )));
    }

    let flat: Vec<f32> = vectors.into_iter().flatten().collect();
    Array2::from_shape_vec((n, dim), flat).map_err(|e| {
        PipelineError::Embedder(EmbedderError::BadOutput(format!(
            "cannot shape embedding batch: {e}"
        )))
    })
}
