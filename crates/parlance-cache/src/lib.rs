// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic translation cache for the Parlance translator.
//!
//! Queries are embedded into L2-normalized vectors and matched by inner
//! product, so "NPS report, last week" reuses the translation of "nps report
//! for last week".
//!
//! ## Architecture
//!
//! - **SemanticCache**: entries, TTL and LRU eviction behind one mutex
//! - **HashingEmbedder**: feature-hashed words and trigrams, no model needed
//! - **OnnxEmbedder**: local sentence-embedding model (`onnx` feature)
//! - **FlatIndex**: exhaustive inner-product search behind [`VectorIndex`]

pub mod cache;
pub mod embedder;
pub mod index;
#[cfg(feature = "onnx")]
pub mod onnx;

use std::sync::Arc;

use parlance_config::model::{CacheConfig, EmbeddingBackendKind};
use parlance_core::{EmbeddingBackend, ParlanceError};
use tracing::{info, warn};

pub use cache::{CacheEntry, CacheStats, SemanticCache};
pub use embedder::HashingEmbedder;
pub use index::{FlatIndex, VectorIndex, inner_product};
#[cfg(feature = "onnx")]
pub use onnx::OnnxEmbedder;

/// Build the embedding backend `config` selects.
///
/// `Ok(None)` when the cache is disabled or the backend is `none`.
pub fn build_backend(
    config: &CacheConfig,
) -> Result<Option<Arc<dyn EmbeddingBackend>>, ParlanceError> {
    if !config.enabled {
        return Ok(None);
    }
    match config.backend {
        EmbeddingBackendKind::Disabled => Ok(None),
        EmbeddingBackendKind::Hashing => Ok(Some(Arc::new(HashingEmbedder::new(
            config.dimensions,
        )?))),
        EmbeddingBackendKind::Onnx => onnx_backend(config),
    }
}

#[cfg(feature = "onnx")]
fn onnx_backend(config: &CacheConfig) -> Result<Option<Arc<dyn EmbeddingBackend>>, ParlanceError> {
    let dir = config.model_dir.as_deref().ok_or_else(|| {
        ParlanceError::Config("cache.model_dir is required for the onnx backend".into())
    })?;
    Ok(Some(Arc::new(OnnxEmbedder::new(std::path::Path::new(dir))?)))
}

#[cfg(not(feature = "onnx"))]
fn onnx_backend(_config: &CacheConfig) -> Result<Option<Arc<dyn EmbeddingBackend>>, ParlanceError> {
    Err(ParlanceError::Config(
        "the onnx cache backend needs parlance built with the `onnx` feature".into(),
    ))
}

/// A cache for `config`, degrading to always-miss if the backend cannot load.
pub fn cache_from_config(config: &CacheConfig) -> SemanticCache {
    let backend = match build_backend(config) {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "embedding backend unavailable, semantic cache disabled");
            None
        }
    };
    if let Some(backend) = &backend {
        info!(
            backend = backend.name(),
            dimensions = backend.dimensions(),
            "semantic cache enabled"
        );
    }
    SemanticCache::new(backend, config)
}
