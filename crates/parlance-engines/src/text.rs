// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenization and overlap helpers shared by the engines.

use std::collections::BTreeSet;

/// Words that carry no signal for choosing a command.
///
/// Time words are included: every command accepts a date range, so they
/// never discriminate between commands.
const STOPWORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "are", "as", "at", "be", "by", "can", "could", "day",
    "days", "do", "for", "from", "get", "give", "how", "i", "in", "is", "it", "last", "let",
    "me", "month", "months", "my", "of", "on", "or", "our", "past", "please", "previous", "run",
    "s", "show", "since", "so", "the", "this", "to", "today", "us", "want", "we", "week",
    "weeks", "what", "with", "would", "year", "years", "yesterday", "you",
];

/// Lowercased alphanumeric tokens in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fold simple plurals so `tickets` matches `ticket`.
pub fn stem(word: &str) -> String {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

/// Stemmed tokens with stopwords removed.
pub fn content_words(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .map(|t| stem(&t))
        .collect()
}

/// Fraction of `reference` words that also appear in `query`.
pub fn coverage(query: &BTreeSet<String>, reference: &BTreeSet<String>) -> f32 {
    if reference.is_empty() {
        return 0.0;
    }
    let shared = reference.intersection(query).count();
    shared as f32 / reference.len() as f32
}

/// A query prepared once for repeated keyword and phrase checks.
#[derive(Debug, Clone)]
pub struct NormalizedQuery {
    /// Space-joined tokens padded with a space on each side.
    padded: String,
    /// Stemmed tokens, stopwords included.
    stems: BTreeSet<String>,
}

impl NormalizedQuery {
    pub fn new(text: &str) -> Self {
        let tokens = tokenize(text);
        let stems = tokens.iter().map(|t| stem(t)).collect();
        Self {
            padded: format!(" {} ", tokens.join(" ")),
            stems,
        }
    }

    /// Whether `phrase` occurs on token boundaries.
    ///
    /// Single words compare stemmed; multi-word phrases compare token runs.
    pub fn contains(&self, phrase: &str) -> bool {
        let tokens = tokenize(phrase);
        match tokens.as_slice() {
            [] => false,
            [word] => self.stems.contains(&stem(word)),
            _ => self.padded.contains(&format!(" {} ", tokens.join(" "))),
        }
    }
}
