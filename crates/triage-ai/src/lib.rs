//! ML layer for the triage heads: text embedding, softmax classification,
//! and the four train/infer pipelines.

pub mod classifier;
pub mod embedder;
pub mod pipeline;

pub use classifier::{ClassifierError, FitParams, SoftmaxClassifier};
pub use embedder::{DEFAULT_EMBEDDING_MODEL, EmbedderError, TextEmbedder};
#[cfg(feature = "onnx")]
pub use embedder::OnnxEmbedder;
pub use pipeline::{
    ImportanceReport, PipelineError, RouterReport, TrainOutcome, infer_importance, infer_router,
    train_importance, train_router,
};
