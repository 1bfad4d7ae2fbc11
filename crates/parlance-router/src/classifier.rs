// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity classification.
//!
//! Classifies queries into Simple/Medium/Complex tiers from configured
//! keyword tables and word counts. No model call, no network, no latency.

use parlance_config::model::RouterConfig;
use parlance_core::ComplexityTier;
use serde::Serialize;

/// Simple classifications below this confidence are upgraded to Medium.
const DEFAULT_UP_CONFIDENCE: f32 = 0.5;

/// Result of classifying a query's complexity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub tier: ComplexityTier,
    /// Confidence in the classification (0.0-1.0).
    pub confidence: f32,
    /// Human-readable reason for the classification.
    pub reason: String,
}

/// Keyword and length based complexity classifier.
pub struct QueryClassifier {
    simple_keywords: Vec<String>,
    complex_keywords: Vec<String>,
    simple_max_words: usize,
    complex_min_words: usize,
}

impl QueryClassifier {
    pub fn new(config: &RouterConfig) -> Self {
        let normalize = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| padded(w))
                .filter(|w| !w.trim().is_empty())
                .collect()
        };
        Self {
            simple_keywords: normalize(&config.simple_keywords),
            complex_keywords: normalize(&config.complex_keywords),
            simple_max_words: config.simple_max_words,
            complex_min_words: config.complex_min_words,
        }
    }

    /// Classify `query` into a complexity tier.
    pub fn classify(&self, query: &str) -> ClassificationResult {
        let text = padded(query);
        let word_count = text.split_whitespace().count();
        if word_count == 0 {
            return ClassificationResult {
                tier: ComplexityTier::Simple,
                confidence: 1.0,
                reason: "empty query".to_string(),
            };
        }

        let mut score: i32 = 0;
        let mut signals = Vec::new();

        // Signal 1: length
        if word_count <= self.simple_max_words {
            score -= 2;
            signals.push(format!("{word_count} words"));
        } else if word_count > self.complex_min_words {
            score += 2;
            signals.push(format!("{word_count} words"));
        }

        // Signal 2: simple lookups
        if let Some(hit) = self.simple_keywords.iter().find(|k| text.contains(k.as_str())) {
            score -= 2;
            signals.push(format!("simple keyword `{}`", hit.trim()));
        }

        // Signal 3: analytical phrasing, stronger with each extra indicator
        let complex_hits: Vec<&str> = self
            .complex_keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .map(|k| k.trim())
            .collect();
        if !complex_hits.is_empty() {
            score += 1 + complex_hits.len().min(3) as i32;
            signals.push(format!("complex keywords {}", complex_hits.join(", ")));
        }

        // Signal 4: several sentences
        let sentences = query.chars().filter(|c| matches!(c, '.' | '?' | '!')).count();
        if sentences >= 3 {
            score += 1;
            signals.push(format!("{sentences} sentences"));
        }

        let (tier, confidence) = score_to_tier(score);
        let reason = if signals.is_empty() {
            "no strong signals".to_string()
        } else {
            signals.join("; ")
        };

        if tier == ComplexityTier::Simple && confidence < DEFAULT_UP_CONFIDENCE {
            return ClassificationResult {
                tier: ComplexityTier::Medium,
                confidence,
                reason: format!("{reason}; low confidence, defaulting up"),
            };
        }

        ClassificationResult {
            tier,
            confidence,
            reason,
        }
    }
}

fn score_to_tier(score: i32) -> (ComplexityTier, f32) {
    if score <= -2 {
        (ComplexityTier::Simple, ((-score) as f32 / 5.0).min(1.0))
    } else if score >= 2 {
        (ComplexityTier::Complex, (score as f32 / 5.0).min(1.0))
    } else {
        (
            ComplexityTier::Medium,
            1.0 - (score.unsigned_abs() as f32 / 3.0),
        )
    }
}

/// Lowercased tokens joined by spaces, padded so phrases match on word boundaries.
fn padded(text: &str) -> String {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", tokens.join(" "))
}
