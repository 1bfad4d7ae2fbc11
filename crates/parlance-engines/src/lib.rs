// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching engines for the Parlance translator.
//!
//! Three [`TranslationEngine`](parlance_core::TranslationEngine)
//! implementations, in waterfall order:
//! - [`FunctionCallingEngine`] -- declared schemas with typed parameters
//! - [`RagEngine`] -- retrieval over a documentation corpus
//! - [`IntentClassifier`] -- keyword and pattern scoring, falls back to clarification
//!
//! The schema-driven engines share one [`FunctionCatalog`] and one parameter
//! extractor, so a command renders the same flags whichever engine chose it.

pub mod catalog;
pub mod dates;
pub mod function_calling;
pub mod intent;
pub mod params;
pub mod rag;
pub mod text;

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use parlance_core::{Action, CommandTranslation, EngineStats};

pub use catalog::{FunctionCatalog, FunctionSchema, ParamKind, ParamSpec};
pub use dates::DateRange;
pub use function_calling::FunctionCallingEngine;
pub use intent::IntentClassifier;
pub use rag::{DocEntry, RagEngine, RetrievedDoc};

/// Per-engine statistics behind a lock.
#[derive(Debug, Default)]
pub(crate) struct StatsCell(Mutex<EngineStats>);

impl StatsCell {
    /// Record one call; clarifications count as misses.
    pub(crate) fn record(&self, result: Option<&CommandTranslation>, started: Instant) {
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Some(t) if t.action != Action::ClarifyRequest => {
                stats.record_match(t.confidence, latency_ms);
                let engine = t
                    .metadata
                    .engine_used
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                metrics::counter!("parlance_engine_matches_total", "engine" => engine)
                    .increment(1);
            }
            _ => stats.record_miss(latency_ms),
        }
    }

    pub(crate) fn snapshot(&self) -> EngineStats {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
