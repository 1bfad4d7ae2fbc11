// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query complexity classification and advisory model routing.
//!
//! This crate provides:
//! - [`QueryClassifier`]: Heuristic complexity classification (zero-cost, zero-latency)
//! - [`ModelRouter`]: Cost-aware model selection under an optional per-query budget
//!
//! Routing is a recommendation only; nothing here calls a model.

pub mod classifier;
pub mod router;

pub use classifier::{ClassificationResult, QueryClassifier};
pub use parlance_core::ComplexityTier;
pub use router::{ModelRouter, RoutingDecision};
