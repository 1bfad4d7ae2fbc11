// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weighted keyword and pattern intent scoring, the last engine of the waterfall.
//!
//! Unlike the other engines this one always answers: a query no intent
//! scores high enough on becomes a clarification request.

use std::sync::Arc;
use std::time::Instant;

use parlance_config::model::IntentDefinition;
use parlance_core::{
    Action, CommandTranslation, EngineKind, EngineStats, ParlanceError, QueryContext,
    TranslationEngine,
};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::StatsCell;
use crate::catalog::FunctionCatalog;
use crate::dates::DateRange;
use crate::text::NormalizedQuery;

const KEYWORD_WEIGHT: f32 = 0.6;
const PATTERN_WEIGHT: f32 = 0.4;

/// One intent's score for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentScore {
    pub name: String,
    pub score: f32,
    pub keyword_hits: usize,
    pub pattern_hits: usize,
}

struct CompiledIntent {
    def: IntentDefinition,
    patterns: Vec<Regex>,
}

/// Scores queries against the configured intents.
pub struct IntentClassifier {
    intents: Vec<CompiledIntent>,
    catalog: Arc<FunctionCatalog>,
    min_score: f32,
    suggestions: Vec<String>,
    stats: StatsCell,
}

impl IntentClassifier {
    /// Compile `intents`; `catalog` supplies the base risk of executing intents.
    pub fn new(
        intents: &[IntentDefinition],
        catalog: Arc<FunctionCatalog>,
        min_score: f32,
        suggestions: Vec<String>,
    ) -> Result<Self, ParlanceError> {
        let intents = intents
            .iter()
            .map(|def| {
                let patterns = def
                    .patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| {
                            ParlanceError::Config(format!(
                                "intent `{}` pattern `{p}`: {e}",
                                def.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledIntent {
                    def: def.clone(),
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, ParlanceError>>()?;
        Ok(Self {
            intents,
            catalog,
            min_score,
            suggestions,
            stats: StatsCell::default(),
        })
    }

    /// Score every intent against `query`, in declaration order.
    pub fn classify(&self, query: &str) -> Vec<IntentScore> {
        let normalized = NormalizedQuery::new(query);
        self.intents
            .iter()
            .map(|intent| score(intent, query, &normalized))
            .collect()
    }

    fn answer(&self, query: &str, ctx: &QueryContext) -> CommandTranslation {
        let mut best: Option<(&CompiledIntent, IntentScore)> = None;
        for (intent, scored) in self.intents.iter().zip(self.classify(query)) {
            if best.as_ref().is_none_or(|(_, b)| scored.score > b.score) {
                best = Some((intent, scored));
            }
        }

        let Some((intent, scored)) = best.filter(|(_, s)| s.score >= self.min_score) else {
            debug!("no intent above threshold");
            return CommandTranslation::clarify(
                "I could not match that request to a report. Try one of these:",
                self.suggestions.clone(),
            )
            .with_engine(EngineKind::IntentClassifier);
        };
        debug!(intent = %intent.def.name, score = scored.score, "intent matched");

        let translation = match (&intent.def.action, &intent.def.command) {
            (Action::ExecuteCommand, Some(command)) => {
                let today = ctx.today();
                let range = DateRange::resolve(query, today);
                let args = vec![
                    format!("--start-date={}", range.start_str()),
                    format!("--end-date={}", range.end_str()),
                ];
                let explanation = format!(
                    "{} for {} to {}",
                    intent.def.explanation,
                    range.start_str(),
                    range.end_str()
                );
                let risk = self
                    .catalog
                    .get(command)
                    .map_or(0.0, |s| s.schema.base_risk);
                CommandTranslation::execute(command.as_str(), args, explanation, scored.score)
                    .with_risk(risk)
            }
            (Action::ShowHelp, _) => {
                CommandTranslation::respond(Action::ShowHelp, &intent.def.explanation, scored.score)
                    .with_suggestions(self.suggestions.clone())
            }
            (action, _) => {
                CommandTranslation::respond(*action, &intent.def.explanation, scored.score)
            }
        };
        translation
            .with_engine(EngineKind::IntentClassifier)
            .with_matched(intent.def.name.as_str())
    }
}

/// `0.6 keyword ratio + 0.4 pattern ratio`, plus the boost when anything matched.
fn score(intent: &CompiledIntent, query: &str, normalized: &NormalizedQuery) -> IntentScore {
    let keyword_hits = intent
        .def
        .keywords
        .iter()
        .filter(|k| normalized.contains(k))
        .count();
    let pattern_hits = intent.patterns.iter().filter(|re| re.is_match(query)).count();

    let ratio = |hits: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    };
    let mut score = KEYWORD_WEIGHT * ratio(keyword_hits, intent.def.keywords.len())
        + PATTERN_WEIGHT * ratio(pattern_hits, intent.patterns.len());
    if keyword_hits + pattern_hits > 0 {
        score += intent.def.confidence_boost;
    }

    IntentScore {
        name: intent.def.name.clone(),
        score: score.clamp(0.0, 1.0),
        keyword_hits,
        pattern_hits,
    }
}

impl TranslationEngine for IntentClassifier {
    fn kind(&self) -> EngineKind {
        EngineKind::IntentClassifier
    }

    fn translate(
        &self,
        query: &str,
        ctx: &QueryContext,
    ) -> Result<Option<CommandTranslation>, ParlanceError> {
        let started = Instant::now();
        let answer = self.answer(query, ctx);
        self.stats.record(Some(&answer), started);
        Ok(Some(answer))
    }

    fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use parlance_config::model::ParlanceConfig;

    use super::*;

    fn classifier() -> IntentClassifier {
        let config = ParlanceConfig::default();
        IntentClassifier::new(
            &config.intents,
            Arc::new(FunctionCatalog::builtin().unwrap()),
            config.translator.intent_min_score,
            config.translator.clarify_suggestions,
        )
        .unwrap()
    }

    fn ctx() -> QueryContext {
        QueryContext::new().with_reference_date(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap())
    }

    fn answer(query: &str) -> CommandTranslation {
        classifier().translate(query, &ctx()).unwrap().unwrap()
    }

    #[test]
    fn executing_intent_carries_dates() {
        let t = answer("customer feedback themes for last month");
        assert_eq!(t.action, Action::ExecuteCommand);
        assert_eq!(t.command.as_deref(), Some("voice-of-customer"));
        assert_eq!(t.args, vec!["--start-date=2024-02-01", "--end-date=2024-02-29"]);
        assert_eq!(t.metadata.matched.as_deref(), Some("voice_of_customer"));
        assert!(t.is_consistent());
    }

    #[test]
    fn help_intent_shows_help() {
        let t = answer("help");
        assert_eq!(t.action, Action::ShowHelp);
        assert!(t.command.is_none());
        assert!(!t.suggestions.is_empty());
    }

    #[test]
    fn gibberish_becomes_clarification() {
        let t = answer("asdkjasdkj random gibberish");
        assert_eq!(t.action, Action::ClarifyRequest);
        assert!(!t.suggestions.is_empty());
        assert_eq!(t.confidence, 0.0);
    }

    #[test]
    fn boost_applies_only_on_a_hit() {
        let scores = classifier().classify("asdkjasdkj");
        assert!(scores.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn scores_follow_the_weighting() {
        let scores = classifier().classify("nps");
        let nps = scores.iter().find(|s| s.name == "nps").unwrap();
        // 1 of 5 keywords, 1 of 2 patterns, boost 0.1.
        let expected = 0.6 * 0.2 + 0.4 * 0.5 + 0.1;
        assert!((nps.score - expected).abs() < 1e-6);
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let mut config = ParlanceConfig::default();
        config.intents[0].patterns.push("(unclosed".into());
        let err = IntentClassifier::new(
            &config.intents,
            Arc::new(FunctionCatalog::builtin().unwrap()),
            0.3,
            vec![],
        )
        .err()
        .unwrap();
        assert!(matches!(err, ParlanceError::Config(_)));
    }

    #[test]
    fn clarifications_do_not_count_as_matches() {
        let c = classifier();
        c.translate("asdkjasdkj", &ctx()).unwrap();
        c.translate("help", &ctx()).unwrap();
        let stats = c.stats();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.matches, 1);
    }
}
