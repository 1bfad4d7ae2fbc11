// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema matching: the highest-precision engine of the waterfall.

use std::sync::Arc;
use std::time::Instant;

use parlance_core::{
    CommandTranslation, EngineKind, EngineStats, ParlanceError, QueryContext, TranslationEngine,
};
use tracing::debug;

use crate::StatsCell;
use crate::catalog::{CompiledSchema, FunctionCatalog};
use crate::params;
use crate::text::{NormalizedQuery, content_words, coverage};

/// Score given to a query containing a boost keyword.
pub const BOOST_SCORE: f32 = 0.9;

/// A schema's match score for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaScore {
    pub command: &'static str,
    pub score: f32,
    pub boosted: bool,
}

/// Matches queries against the declared function schemas.
pub struct FunctionCallingEngine {
    catalog: Arc<FunctionCatalog>,
    min_threshold: f32,
    stats: StatsCell,
}

impl FunctionCallingEngine {
    /// `min_threshold` raises every schema's own threshold to at least this value.
    pub fn new(catalog: Arc<FunctionCatalog>, min_threshold: f32) -> Self {
        Self {
            catalog,
            min_threshold,
            stats: StatsCell::default(),
        }
    }

    /// Score every schema against `query`, in declaration order.
    pub fn score_all(&self, query: &str) -> Vec<SchemaScore> {
        let words = content_words(query);
        let normalized = NormalizedQuery::new(query);
        self.catalog
            .schemas()
            .iter()
            .map(|schema| score(schema, query, &words, &normalized))
            .collect()
    }

    fn best_match(&self, query: &str) -> Option<(&CompiledSchema, SchemaScore)> {
        let mut best: Option<(&CompiledSchema, SchemaScore)> = None;
        for (schema, scored) in self.catalog.schemas().iter().zip(self.score_all(query)) {
            let threshold = schema.schema.threshold.max(self.min_threshold);
            if scored.score < threshold {
                continue;
            }
            // Strictly greater keeps the first declared schema on ties.
            if best.as_ref().is_none_or(|(_, b)| scored.score > b.score) {
                best = Some((schema, scored));
            }
        }
        best
    }

    fn matched(&self, query: &str, ctx: &QueryContext) -> Option<CommandTranslation> {
        let (schema, scored) = self.best_match(query)?;
        let extracted = params::extract(schema, query, ctx, &[]);
        debug!(
            command = schema.schema.command,
            score = scored.score,
            boosted = scored.boosted,
            "function schema matched"
        );
        let explanation = format!(
            "{} for {} to {}",
            schema.schema.description,
            extracted.range.start_str(),
            extracted.range.end_str()
        );
        Some(
            CommandTranslation::execute(
                schema.schema.command,
                extracted.args,
                explanation,
                scored.score,
            )
            .with_risk(schema.schema.base_risk + extracted.added_risk)
            .with_engine(EngineKind::FunctionCalling)
            .with_matched(schema.schema.command),
        )
    }
}

fn score(
    schema: &CompiledSchema,
    query: &str,
    words: &std::collections::BTreeSet<String>,
    normalized: &NormalizedQuery,
) -> SchemaScore {
    let example_score = schema
        .schema
        .examples
        .iter()
        .map(|example| coverage(words, &content_words(example)))
        .fold(0.0_f32, f32::max);

    let pattern_score = if schema.patterns.is_empty() {
        0.0
    } else {
        let hits = schema.patterns.iter().filter(|re| re.is_match(query)).count();
        hits as f32 / schema.patterns.len() as f32
    };

    let boosted = schema
        .schema
        .boost_keywords
        .iter()
        .any(|k| normalized.contains(k));
    let mut score = example_score.max(pattern_score);
    if boosted {
        score = score.max(BOOST_SCORE);
    }

    SchemaScore {
        command: schema.schema.command,
        score: score.min(1.0),
        boosted,
    }
}

impl TranslationEngine for FunctionCallingEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::FunctionCalling
    }

    fn translate(
        &self,
        query: &str,
        ctx: &QueryContext,
    ) -> Result<Option<CommandTranslation>, ParlanceError> {
        let started = Instant::now();
        let result = self.matched(query, ctx);
        self.stats.record(result.as_ref(), started);
        Ok(result)
    }

    fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }
}
