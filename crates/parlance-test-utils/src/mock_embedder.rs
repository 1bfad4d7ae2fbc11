// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stub embedding backends.

use std::collections::HashMap;

use parlance_core::{EmbeddingBackend, HealthStatus, ParlanceError};

/// A backend that is always down, for degraded-cache tests.
pub struct UnavailableEmbedder {
    dimensions: usize,
}

impl UnavailableEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl EmbeddingBackend for UnavailableEmbedder {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>, ParlanceError> {
        Err(ParlanceError::Embedding {
            message: "embedding service unreachable".to_string(),
            source: None,
        })
    }

    fn health_check(&self) -> HealthStatus {
        HealthStatus::Unhealthy("embedding service unreachable".to_string())
    }
}

/// A backend with hand-picked vectors, for exact similarity tests.
///
/// Unknown texts embed to the zero vector, which is similar to nothing.
pub struct FixedEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
        }
    }

    /// Map `text` to `vector`. The cache embeds normalized queries, so `text`
    /// should be lowercase words separated by single spaces.
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

impl EmbeddingBackend for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ParlanceError> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimensions]))
    }
}
