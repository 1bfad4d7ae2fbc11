// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding backend trait for the semantic cache.

use crate::error::ParlanceError;
use crate::types::HealthStatus;

/// Produces fixed-dimension, L2-normalized vectors from text.
///
/// Any embedding model satisfying this contract can back the semantic cache;
/// inner product of two outputs is their cosine similarity.
pub trait EmbeddingBackend: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Dimension of every vector returned by [`EmbeddingBackend::embed`].
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ParlanceError>;

    /// Report whether the backend can currently serve requests.
    fn health_check(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}
