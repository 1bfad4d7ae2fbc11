// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval over a small documentation corpus.
//!
//! Catches phrasings the schemas do not anticipate ("prep the QBR deck") by
//! ranking hand-written documentation entries and translating through the
//! best entry's command.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use parlance_core::{
    CommandTranslation, EngineKind, EngineStats, ParlanceError, QueryContext, TranslationEngine,
};
use serde::Serialize;
use tracing::debug;

use crate::StatsCell;
use crate::catalog::FunctionCatalog;
use crate::params;
use crate::text::{NormalizedQuery, content_words, coverage};

/// One documentation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DocEntry {
    /// Command the entry documents.
    pub command: &'static str,
    pub title: &'static str,
    pub content: &'static str,
    pub examples: Vec<&'static str>,
    pub tags: Vec<&'static str>,
    /// Boolean parameters the entry's use case always sets.
    pub implied_flags: Vec<&'static str>,
}

/// A retrieved entry with its relevance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDoc {
    pub command: &'static str,
    pub title: &'static str,
    pub relevance: f32,
}

struct IndexedDoc {
    entry: DocEntry,
    title_words: BTreeSet<String>,
    content_words: BTreeSet<String>,
    example_words: Vec<BTreeSet<String>>,
}

/// Ranks documentation entries and translates through the best one.
pub struct RagEngine {
    catalog: Arc<FunctionCatalog>,
    docs: Vec<IndexedDoc>,
    min_relevance: f32,
    top_k: usize,
    stats: StatsCell,
}

impl RagEngine {
    /// Engine over the built-in corpus.
    pub fn new(
        catalog: Arc<FunctionCatalog>,
        min_relevance: f32,
        top_k: usize,
    ) -> Result<Self, ParlanceError> {
        Self::with_corpus(catalog, builtin_corpus(), min_relevance, top_k)
    }

    /// Engine over `corpus`.
    ///
    /// Every entry must document a cataloged command, and its implied flags
    /// must be boolean parameters of that command.
    pub fn with_corpus(
        catalog: Arc<FunctionCatalog>,
        corpus: Vec<DocEntry>,
        min_relevance: f32,
        top_k: usize,
    ) -> Result<Self, ParlanceError> {
        let mut docs = Vec::with_capacity(corpus.len());
        for entry in corpus {
            let Some(schema) = catalog.get(entry.command) else {
                return Err(ParlanceError::Config(format!(
                    "documentation `{}` refers to unknown command `{}`",
                    entry.title, entry.command
                )));
            };
            for flag in &entry.implied_flags {
                let is_bool = schema
                    .schema
                    .param(flag)
                    .is_some_and(|p| matches!(p.kind, crate::catalog::ParamKind::Flag { .. }));
                if !is_bool {
                    return Err(ParlanceError::Config(format!(
                        "documentation `{}` implies `{flag}`, which is not a flag of `{}`",
                        entry.title, entry.command
                    )));
                }
            }
            docs.push(IndexedDoc {
                title_words: content_words(entry.title),
                content_words: content_words(entry.content),
                example_words: entry.examples.iter().map(|e| content_words(e)).collect(),
                entry,
            });
        }
        Ok(Self {
            catalog,
            docs,
            min_relevance,
            top_k: top_k.max(1),
            stats: StatsCell::default(),
        })
    }

    /// The `top_k` most relevant entries, best first, ties in corpus order.
    pub fn retrieve(&self, query: &str) -> Vec<RetrievedDoc> {
        let words = content_words(query);
        let normalized = NormalizedQuery::new(query);
        let mut ranked: Vec<RetrievedDoc> = self
            .docs
            .iter()
            .map(|doc| RetrievedDoc {
                command: doc.entry.command,
                title: doc.entry.title,
                relevance: relevance(doc, &words, &normalized),
            })
            .filter(|r| r.relevance > 0.0)
            .collect();
        // Stable sort keeps corpus order among equal scores.
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        ranked.truncate(self.top_k);
        ranked
    }

    fn matched(&self, query: &str, ctx: &QueryContext) -> Option<CommandTranslation> {
        let best = self.retrieve(query).into_iter().next()?;
        if best.relevance < self.min_relevance {
            debug!(title = best.title, relevance = best.relevance, "best document below threshold");
            return None;
        }
        let doc = self.docs.iter().find(|d| d.entry.title == best.title)?;
        let schema = self.catalog.get(doc.entry.command)?;
        let extracted = params::extract(schema, query, ctx, &doc.entry.implied_flags);
        debug!(command = doc.entry.command, title = doc.entry.title, relevance = best.relevance, "document matched");

        let explanation = format!(
            "{} ({}) for {} to {}",
            schema.schema.description,
            doc.entry.title,
            extracted.range.start_str(),
            extracted.range.end_str()
        );
        Some(
            CommandTranslation::execute(doc.entry.command, extracted.args, explanation, best.relevance)
                .with_risk(schema.schema.base_risk + extracted.added_risk)
                .with_engine(EngineKind::Rag)
                .with_matched(doc.entry.title),
        )
    }
}

/// `0.4 title + 0.3 content + 0.2 tags + 0.1 examples`, clipped to `[0, 1]`.
fn relevance(doc: &IndexedDoc, words: &BTreeSet<String>, normalized: &NormalizedQuery) -> f32 {
    let title = coverage(words, &doc.title_words);
    // Content is long, so overlap is measured from the query side.
    let content = coverage(&doc.content_words, words);
    let tags = if doc.entry.tags.is_empty() {
        0.0
    } else {
        let hits = doc.entry.tags.iter().filter(|t| normalized.contains(t)).count();
        hits as f32 / doc.entry.tags.len() as f32
    };
    let examples = doc
        .example_words
        .iter()
        .map(|e| coverage(words, e))
        .fold(0.0_f32, f32::max);

    (0.4 * title + 0.3 * content + 0.2 * tags + 0.1 * examples).clamp(0.0, 1.0)
}

impl TranslationEngine for RagEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Rag
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

/// The built-in documentation corpus.
pub fn builtin_corpus() -> Vec<DocEntry> {
    vec![
        DocEntry {
            command: "voice-of-customer",
            title: "Voice of customer report",
            content: "Summarises what customers say across surveys, reviews and support \
                      conversations. Groups feedback into themes with volume and sentiment, \
                      optionally with verbatim quotes and a slide deck.",
            examples: vec!["what are customers talking about", "top feedback themes"],
            tags: vec!["voc", "feedback", "themes", "customers"],
            implied_flags: vec![],
        },
        DocEntry {
            command: "voice-of-customer",
            title: "Quarterly business review",
            content: "Prepare the quarterly business review pack for executives: a voice of \
                      customer summary rendered as a presentation deck with slides.",
            examples: vec!["prepare the quarterly business review", "qbr deck for leadership"],
            tags: vec!["qbr", "quarterly", "executive", "slides"],
            implied_flags: vec!["generate_slides"],
        },
        DocEntry {
            command: "sentiment-analysis",
            title: "Sentiment analysis",
            content: "Scores the mood of customer conversations as positive, neutral or \
                      negative, per channel and over time. Useful to spot frustration, \
                      happiness or anger trends.",
            examples: vec!["are customers happy", "is frustration going up"],
            tags: vec!["sentiment", "mood", "happy", "angry", "frustration"],
            implied_flags: vec![],
        },
        DocEntry {
            command: "churn-analysis",
            title: "Churn and retention",
            content: "Identifies accounts at risk of cancelling or not renewing, with the \
                      drivers behind lost customers and retention rates by segment.",
            examples: vec!["who might cancel soon", "retention by segment"],
            tags: vec!["churn", "retention", "renewal", "cancel", "attrition"],
            implied_flags: vec![],
        },
        DocEntry {
            command: "nps-report",
            title: "Net promoter score",
            content: "Net promoter score from recommendation surveys: promoters, passives \
                      and detractors, with comparison to the previous period.",
            examples: vec!["would customers recommend us", "loyalty survey results"],
            tags: vec!["nps", "loyalty", "recommend", "survey"],
            implied_flags: vec![],
        },
        DocEntry {
            command: "ticket-trends",
            title: "Support ticket trends",
            content: "Volume of support tickets by category and over time, including the \
                      most common issues, spikes and backlog in the help desk queue.",
            examples: vec!["what are people complaining about", "help desk backlog"],
            tags: vec!["tickets", "support", "issues", "helpdesk", "complaints"],
            implied_flags: vec![],
        },
        DocEntry {
            command: "export-data",
            title: "Data export",
            content: "Download raw records as a csv or json file for use in spreadsheets \
                      or other tools. Exports may contain personal data.",
            examples: vec!["give me the raw records", "pull the data into a spreadsheet"],
            tags: vec!["export", "download", "csv", "raw", "file"],
            implied_flags: vec![],
        },
    ]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn engine() -> RagEngine {
        RagEngine::new(Arc::new(FunctionCatalog::builtin().unwrap()), 0.3, 3).unwrap()
    }

    fn ctx() -> QueryContext {
        QueryContext::new().with_reference_date(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap())
    }

    #[test]
    fn qbr_maps_to_voice_of_customer_with_slides() {
        let t = engine()
            .translate("quarterly business review deck", &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(t.command.as_deref(), Some("voice-of-customer"));
        assert!(t.args.contains(&"--generate-slides".to_string()));
        assert!(t.confidence >= 0.6, "{}", t.confidence);
        assert_eq!(t.metadata.engine_used, Some(EngineKind::Rag));
        assert_eq!(t.metadata.matched.as_deref(), Some("Quarterly business review"));
    }

    #[test]
    fn retrieve_ranks_and_truncates() {
        let docs = engine().retrieve("customer retention and churn");
        assert!(!docs.is_empty() && docs.len() <= 3);
        assert_eq!(docs[0].command, "churn-analysis");
        assert!(docs.windows(2).all(|w| w[0].relevance >= w[1].relevance));
    }

    #[test]
    fn unrelated_query_is_declined() {
        let e = engine();
        assert!(e.retrieve("asdkjasdkj random gibberish").is_empty());
        assert!(e.translate("asdkjasdkj random gibberish", &ctx()).unwrap().is_none());
        assert_eq!(e.stats().calls, 1);
    }

    #[test]
    fn weak_match_is_below_threshold() {
        let e = RagEngine::new(Arc::new(FunctionCatalog::builtin().unwrap()), 0.9, 3).unwrap();
        assert!(e.translate("retention", &ctx()).unwrap().is_none());
    }

    #[test]
    fn corpus_must_reference_known_commands_and_flags() {
        let catalog = Arc::new(FunctionCatalog::builtin().unwrap());
        let mut corpus = builtin_corpus();
        corpus[0].command = "rm";
        assert!(RagEngine::with_corpus(catalog.clone(), corpus, 0.3, 3).is_err());

        let mut corpus = builtin_corpus();
        corpus[0].implied_flags = vec!["segment"];
        assert!(RagEngine::with_corpus(catalog, corpus, 0.3, 3).is_err());
    }
}
