// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams of the translator: matching engines and embedding backends.

pub mod embedding;
pub mod engine;

pub use embedding::EmbeddingBackend;
pub use engine::TranslationEngine;
