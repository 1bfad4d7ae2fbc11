// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine waterfall.
//!
//! Cache, then function calling, then retrieval, then the intent classifier,
//! then a canned clarification. The first stage that produces an acceptable
//! translation ends the walk.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use parlance_cache::SemanticCache;
use parlance_config::model::TranslatorConfig;
use parlance_core::{
    Action, CommandTranslation, EngineKind, EngineStats, QueryContext, RunningMean,
    TranslationEngine,
};
use parlance_security::log_preview;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Explanation of the answer given when every engine has failed.
const FALLBACK_EXPLANATION: &str =
    "I could not understand that request. Try rephrasing it, for example:";

/// Successes and failures of one engine as seen by the translator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineTally {
    /// Translations from this engine that were returned to the caller.
    pub successes: u64,
    /// Calls that returned an error.
    pub failures: u64,
}

/// Translator-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranslatorStats {
    pub total_queries: u64,
    pub cache_hits: u64,
    /// Answers that asked the user to rephrase.
    pub clarifications: u64,
    /// Keyed by engine name.
    pub engines: BTreeMap<String, EngineTally>,
    /// Mean confidence of every returned translation.
    pub confidence: RunningMean,
    pub latency_ms: RunningMean,
}

impl TranslatorStats {
    fn tally(&mut self, engine: EngineKind) -> &mut EngineTally {
        self.engines.entry(engine.to_string()).or_default()
    }

    /// Fraction of queries answered from the cache.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_queries as f64
        }
    }
}

/// An engine plus the confidence it must reach to end the waterfall.
struct Stage {
    engine: Box<dyn TranslationEngine>,
    threshold: f32,
}

/// Multi-engine translator with an optional semantic cache in front.
///
/// Engines are injected; [`crate::build_translator`] wires the built-in ones
/// from configuration.
pub struct HybridTranslator {
    cache: Option<Arc<SemanticCache>>,
    stages: Vec<Stage>,
    fallback: Box<dyn TranslationEngine>,
    clarify_suggestions: Vec<String>,
    stats: Mutex<TranslatorStats>,
}

impl HybridTranslator {
    /// Assemble the waterfall: `function_calling` and `rag` are gated by the
    /// configured thresholds, `intent` is accepted unconditionally.
    pub fn new(
        function_calling: Box<dyn TranslationEngine>,
        rag: Box<dyn TranslationEngine>,
        intent: Box<dyn TranslationEngine>,
        config: &TranslatorConfig,
    ) -> Self {
        Self {
            cache: None,
            stages: vec![
                Stage {
                    engine: function_calling,
                    threshold: config.function_calling_threshold,
                },
                Stage {
                    engine: rag,
                    threshold: config.rag_threshold,
                },
            ],
            fallback: intent,
            clarify_suggestions: config.clarify_suggestions.clone(),
            stats: Mutex::new(TranslatorStats::default()),
        }
    }

    /// Put a semantic cache in front of the engines.
    pub fn with_cache(mut self, cache: Arc<SemanticCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<SemanticCache>> {
        self.cache.as_ref()
    }

    fn stats_guard(&self) -> MutexGuard<'_, TranslatorStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Translate `query`. Never fails: engine errors are logged and skipped,
    /// and a clarification is returned when nothing matches.
    pub fn translate(&self, query: &str, ctx: &QueryContext) -> CommandTranslation {
        let started = Instant::now();
        debug!(query = %log_preview(query), "translating");

        // Context overrides and pinned dates change the answer for the same text.
        let cacheable = ctx.values.is_empty() && ctx.reference_date.is_none();

        if cacheable
            && let Some(cache) = &self.cache
            && let Some(hit) = cache.get(query)
        {
            debug!(
                similarity = hit.metadata.cache_similarity.unwrap_or_default(),
                "served from cache"
            );
            return self.finish(hit, EngineKind::Cache, started);
        }

        for stage in &self.stages {
            let kind = stage.engine.kind();
            match self.attempt(stage.engine.as_ref(), query, ctx) {
                Some(t) if t.action != Action::ClarifyRequest && t.confidence >= stage.threshold => {
                    self.remember(cacheable, query, &t);
                    return self.finish(t, kind, started);
                }
                Some(t) => debug!(
                    engine = %kind,
                    confidence = t.confidence,
                    threshold = stage.threshold,
                    "below threshold"
                ),
                None => debug!(engine = %kind, "no match"),
            }
        }

        let kind = self.fallback.kind();
        match self.attempt(self.fallback.as_ref(), query, ctx) {
            Some(t) => {
                self.remember(cacheable, query, &t);
                self.finish(t, kind, started)
            }
            None => {
                let t = CommandTranslation::clarify(
                    FALLBACK_EXPLANATION,
                    self.clarify_suggestions.clone(),
                )
                .with_engine(EngineKind::Fallback);
                self.finish(t, EngineKind::Fallback, started)
            }
        }
    }

    /// Run one engine, absorbing its error.
    fn attempt(
        &self,
        engine: &dyn TranslationEngine,
        query: &str,
        ctx: &QueryContext,
    ) -> Option<CommandTranslation> {
        let kind = engine.kind();
        debug!(engine = %kind, "engine attempt");
        match engine.translate(query, ctx) {
            Ok(result) => result,
            Err(e) => {
                warn!(engine = %kind, error = %e, "engine failed, skipping");
                metrics::counter!("parlance_engine_failures_total", "engine" => kind.to_string())
                    .increment(1);
                self.stats_guard().tally(kind).failures += 1;
                None
            }
        }
    }

    fn remember(&self, cacheable: bool, query: &str, translation: &CommandTranslation) {
        if !cacheable || translation.action == Action::ClarifyRequest {
            return;
        }
        if let Some(cache) = &self.cache {
            cache.put(query, translation);
        }
    }

    fn finish(
        &self,
        mut translation: CommandTranslation,
        source: EngineKind,
        started: Instant,
    ) -> CommandTranslation {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        translation.metadata.processing_time_ms = Some(elapsed_ms);

        {
            let mut stats = self.stats_guard();
            stats.total_queries += 1;
            if source == EngineKind::Cache {
                stats.cache_hits += 1;
            } else {
                stats.tally(source).successes += 1;
            }
            if translation.action == Action::ClarifyRequest {
                stats.clarifications += 1;
            }
            stats.confidence.record(f64::from(translation.confidence));
            stats.latency_ms.record(elapsed_ms);
        }

        metrics::counter!("parlance_translations_total", "engine" => source.to_string())
            .increment(1);
        metrics::histogram!("parlance_translation_latency_ms").record(elapsed_ms);

        info!(
            engine = %source,
            action = %translation.action,
            command = translation.command.as_deref().unwrap_or("-"),
            confidence = translation.confidence,
            elapsed_ms,
            "translation complete"
        );
        translation
    }

    /// Snapshot of the translator counters.
    pub fn stats(&self) -> TranslatorStats {
        self.stats_guard().clone()
    }

    /// Each engine's own statistics, in waterfall order.
    pub fn engine_stats(&self) -> Vec<(EngineKind, EngineStats)> {
        self.stages
            .iter()
            .map(|s| &s.engine)
            .chain(std::iter::once(&self.fallback))
            .map(|e| (e.kind(), e.stats()))
            .collect()
    }
}
