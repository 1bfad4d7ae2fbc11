// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local sentence-embedding backend over an ONNX model (all-MiniLM-L6-v2 layout).
//!
//! Expects `model.onnx` and `tokenizer.json` in one directory. Inference
//! runs on CPU with a single intra-op thread.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use parlance_core::{EmbeddingBackend, HealthStatus, ParlanceError};

use crate::embedder::l2_normalize;

/// Output width of all-MiniLM-L6-v2.
pub const ONNX_EMBEDDING_DIM: usize = 384;

fn embedding_error(message: impl Into<String>) -> ParlanceError {
    ParlanceError::Embedding {
        message: message.into(),
        source: None,
    }
}

/// Sentence embeddings from a local ONNX model.
pub struct OnnxEmbedder {
    /// ONNX Runtime session; `run` needs exclusive access.
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

// SAFETY: the session is only reached through the mutex, and the tokenizer
// is only used for encoding, which takes `&self`.
unsafe impl Send for OnnxEmbedder {}
unsafe impl Sync for OnnxEmbedder {}

impl OnnxEmbedder {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn new(model_dir: &Path) -> Result<Self, ParlanceError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            embedding_error(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let session = Session::builder()
            .map_err(|e| embedding_error(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| embedding_error(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| embedding_error(format!("failed to set thread count: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                embedding_error(format!(
                    "failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

impl EmbeddingBackend for OnnxEmbedder {
    fn name(&self) -> &str {
        "onnx"
    }

    fn dimensions(&self) -> usize {
        ONNX_EMBEDDING_DIM
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ParlanceError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embedding_error(format!("tokenization failed: {e}")))?;

        let to_i64 = |values: &[u32]| values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>();
        let input_ids = to_i64(encoding.get_ids());
        let attention_mask = to_i64(encoding.get_attention_mask());
        let token_type_ids = to_i64(encoding.get_type_ids());
        let seq_len = input_ids.len();

        let tensor = |values: Vec<i64>, name: &str| {
            Array2::from_shape_vec((1, seq_len), values)
                .map_err(|e| embedding_error(format!("failed to shape {name}: {e}")))
        };
        let input_ids_array = tensor(input_ids, "input_ids")?;
        let attention_mask_array = tensor(attention_mask.clone(), "attention_mask")?;
        let token_type_ids_array = tensor(token_type_ids, "token_type_ids")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embedding_error(format!("ONNX session lock poisoned: {e}")))?;

        let input_ids_tensor = TensorRef::from_array_view(&input_ids_array)
            .map_err(|e| embedding_error(format!("failed to view input_ids: {e}")))?;
        let attention_mask_tensor = TensorRef::from_array_view(&attention_mask_array)
            .map_err(|e| embedding_error(format!("failed to view attention_mask: {e}")))?;
        let token_type_ids_tensor = TensorRef::from_array_view(&token_type_ids_array)
            .map_err(|e| embedding_error(format!("failed to view token_type_ids: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
            .map_err(|e| embedding_error(format!("ONNX inference failed: {e}")))?;

        // Output shape is [1, seq_len, hidden].
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embedding_error(format!("failed to extract output tensor: {e}")))?;
        let hidden_size = shape.last().map_or(0, |&d| d as usize);
        if hidden_size != ONNX_EMBEDDING_DIM {
            return Err(embedding_error(format!(
                "model produced {hidden_size}-dimensional output, expected {ONNX_EMBEDDING_DIM}"
            )));
        }

        let pooled = mean_pool_with_attention(data, &attention_mask, seq_len, hidden_size);
        Ok(l2_normalize(&pooled))
    }

    fn health_check(&self) -> HealthStatus {
        match self.session.lock() {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(format!("session lock poisoned: {e}")),
        }
    }
}

/// Mean of the token embeddings whose attention mask is set.
fn mean_pool_with_attention(
    embeddings: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;
    for (i, &mask) in attention_mask.iter().enumerate().take(seq_len) {
        if mask > 0 {
            let Some(row) = embeddings.get(i * hidden_size..(i + 1) * hidden_size) else {
                break;
            };
            for (acc, value) in sum.iter_mut().zip(row) {
                *acc += value;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        for value in &mut sum {
            *value /= count;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_tokens_are_ignored() {
        let embeddings = vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        let result = mean_pool_with_attention(&embeddings, &[0, 1], 2, 3);
        assert_eq!(result, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn pooling_averages_real_tokens() {
        let embeddings = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let result = mean_pool_with_attention(&embeddings, &[1, 1, 1], 3, 2);
        assert!((result[0] - 3.0).abs() < f32::EPSILON);
        assert!((result[1] - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn missing_model_dir_is_an_embedding_error() {
        let err = OnnxEmbedder::new(Path::new("/nonexistent/parlance-model"))
            .err()
            .unwrap();
        assert!(matches!(err, ParlanceError::Embedding { .. }));
    }
}
