//! Text embedding provider.
//!
//! [`TextEmbedder`] is the seam the pipelines consume: a batch embedding
//! call plus the identifier of the model configuration that produced the
//! vectors. The identifier is what gets recorded in artifacts so that
//! inference can reproduce compatible vectors.
//!
//! [`OnnxEmbedder`] is the real provider (feature `onnx`): a
//! sentence-transformers model run through ONNX Runtime with mean pooling
//! and L2 normalization. The model directory must contain `model.onnx`
//! and `tokenizer.json`.

use std::path::PathBuf;

use thiserror::Error;

/// Well-known default sentence-transformers model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The embedding model is not installed; the caller should treat this
    /// as a missing external dependency, not an input error.
    #[error("embedding model `{model_id}` unavailable: {path} not found")]
    ModelUnavailable { model_id: String, path: PathBuf },

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Onnx(#[from] ort::Error),

    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

/// Maps text to fixed-length vectors, deterministically for a given model.
pub trait TextEmbedder {
    /// Identifier of the model configuration producing the vectors.
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, one vector per input, aligned by index.
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Embed a single text (batch of one).
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::BadOutput("empty batch result".to_string()))
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

#[cfg(feature = "onnx")]
mod onnx {
    use std::path::Path;

    use ort::session::Session;
    use ort::value::Tensor;
    use tokenizers::Tokenizer;
    use tracing::info;

    use super::{EmbedderError, TextEmbedder};

    /// Sentence embedding generator using ONNX Runtime.
    ///
    /// Produces normalized embeddings (384 dimensions for the default
    /// all-MiniLM-L6-v2) via attention-masked mean pooling.
    pub struct OnnxEmbedder {
        model_id: String,
        session: Session,
        tokenizer: Tokenizer,
        dim: usize,
    }

    impl OnnxEmbedder {
        /// Load `<models_dir>/<model_id>/{model.onnx,tokenizer.json}`.
        pub fn load(models_dir: &Path, model_id: &str) -> Result<Self, EmbedderError> {
            let model_dir = models_dir.join(model_id);
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            for path in [&model_path, &tokenizer_path] {
                if !path.exists() {
                    return Err(EmbedderError::ModelUnavailable {
                        model_id: model_id.to_string(),
                        path: path.clone(),
                    });
                }
            }

            let session = Session::builder()?.commit_from_file(&model_path)?;

            // Infer embedding dimension from the model output shape.
            let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

            let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| EmbedderError::Tokenizer(e.to_string()))?;

            // Truncate to the model's max length, pad batches to equal length.
            tokenizer
                .with_truncation(Some(tokenizers::TruncationParams {
                    max_length: 256,
                    ..Default::default()
                }))
                .map_err(|e| EmbedderError::Tokenizer(e.to_string()))?;
            tokenizer.with_padding(Some(tokenizers::PaddingParams {
                ..Default::default()
            }));

            info!(model_id, dim, "loaded embedding model");
            Ok(Self {
                model_id: model_id.to_string(),
                session,
                tokenizer,
                dim,
            })
        }

        /// Embedding dimensionality.
        pub fn dim(&self) -> usize {
            self.dim
        }
    }

    impl TextEmbedder for OnnxEmbedder {
        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
            if texts.is_empty() {
                return Ok(vec![]);
            }

            let batch_size = texts.len();

            let encodings = self
                .tokenizer
                .encode_batch(texts.to_vec(), true)
                .map_err(|e| EmbedderError::Tokenizer(e.to_string()))?;

            let seq_len = encodings
                .iter()
                .map(|e| e.get_ids().len())
                .max()
                .unwrap_or(0);

            // Flat input tensors: [batch_size, seq_len].
            let mut input_ids = vec![0i64; batch_size * seq_len];
            let mut attention_mask = vec![0i64; batch_size * seq_len];
            let mut token_type_ids = vec![0i64; batch_size * seq_len];

            for (i, encoding) in encodings.iter().enumerate() {
                let offset = i * seq_len;
                for (j, &id) in encoding.get_ids().iter().enumerate() {
                    input_ids[offset + j] = id as i64;
                }
                for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                    attention_mask[offset + j] = mask as i64;
                }
                for (j, &tid) in encoding.get_type_ids().iter().enumerate() {
                    token_type_ids[offset + j] = tid as i64;
                }
            }

            let shape = [batch_size as i64, seq_len as i64];

            let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
            let mask_tensor =
                Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;
            let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

            let outputs = self.session.run(ort::inputs![
                "input_ids" => ids_tensor,
                "attention_mask" => mask_tensor,
                "token_type_ids" => type_tensor,
            ])?;

            // Token embeddings: [batch_size, seq_len, dim].
            let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
            let dims: &[i64] = output_shape;
            if dims.len() != 3 || dims[0] as usize != batch_size || dims[2] as usize != self.dim {
                return Err(EmbedderError::BadOutput(format!(
                    "shape {dims:?}, expected [{batch_size}, {seq_len}, {}]",
                    self.dim
                )));
            }

            let actual_seq_len = dims[1] as usize;

            // Mean pooling with attention mask.
            let mut embeddings = Vec::with_capacity(batch_size);
            for i in 0..batch_size {
                let mut pooled = vec![0.0f32; self.dim];
                let mut token_count = 0.0f32;

                for j in 0..actual_seq_len {
                    let mask_val = attention_mask[i * seq_len + j] as f32;
                    if mask_val > 0.0 {
                        let offset = (i * actual_seq_len + j) * self.dim;
                        for (d, p) in pooled.iter_mut().enumerate() {
                            *p += output_data[offset + d] * mask_val;
                        }
                        token_count += mask_val;
                    }
                }

                if token_count > 0.0 {
                    for p in &mut pooled {
                        *p /= token_count;
                    }
                }
                normalize(&mut pooled);
                embeddings.push(pooled);
            }

            Ok(embeddings)
        }
    }

    /// L2-normalize a vector in place.
    fn normalize(v: &mut [f32]) {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
    }

    /// Try to infer the embedding dimension from the ONNX output type.
    fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
        match output_type {
            ort::value::ValueType::Tensor { shape, .. } => shape
                .last()
                .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
            _ => None,
        }
    }
}
