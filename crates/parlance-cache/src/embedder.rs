// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feature-hashing embedder: deterministic, dependency-free query vectors.
//!
//! Each query becomes a signed bag of word unigrams and character trigrams
//! hashed into a fixed number of buckets, then L2-normalized. Paraphrases
//! that differ in case, punctuation or filler words land close together.
//! Numbers and time words carry extra weight so that queries differing only
//! in a count or a period land further apart, but similarity alone does not
//! separate them: the cache also compares [`time_key`]s.

use parlance_core::{EmbeddingBackend, ParlanceError};
use sha2::{Digest, Sha256};

/// Minimum vector width accepted by [`HashingEmbedder::new`].
pub const MIN_DIMENSIONS: usize = 16;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;
/// Weight of tokens that pin a count or a period.
const NUMERIC_WEIGHT: f32 = 3.0;

/// Words that select or shift a time period.
const TIME_WORDS: &[&str] = &[
    "today", "yesterday", "tomorrow", "day", "days", "daily", "week", "weeks", "weekly",
    "month", "months", "monthly", "quarter", "quarters", "quarterly", "year", "years",
    "yearly", "annual", "ytd", "this", "last", "past", "previous", "current", "next", "since",
    "date",
];

/// Tokens that change which dates or counts a query resolves to.
fn is_pinning(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit()) || TIME_WORDS.contains(&token)
}

/// The numbers and time words of `text`, in order.
///
/// Two queries with different keys resolve to different arguments however
/// similar their embeddings are.
pub fn time_key(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| is_pinning(t))
        .map(str::to_string)
        .collect()
}

/// Embeds text by hashing words and character trigrams into buckets.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self, ParlanceError> {
        if dimensions < MIN_DIMENSIONS {
            return Err(ParlanceError::Config(format!(
                "hashing embedder needs at least {MIN_DIMENSIONS} dimensions, got {dimensions}"
            )));
        }
        Ok(Self { dimensions })
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bucket);
        // usize is at least 32 bits on every supported target.
        let index = (hash % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl EmbeddingBackend for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ParlanceError> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in normalize(text).split(' ').filter(|t| !t.is_empty()) {
            let weight = if is_pinning(token) {
                NUMERIC_WEIGHT
            } else {
                WORD_WEIGHT
            };
            self.add_feature(&mut vector, &format!("w:{token}"), weight);

            let padded: Vec<char> = format!("_{token}_").chars().collect();
            for trigram in padded.windows(3) {
                let trigram: String = trigram.iter().collect();
                self.add_feature(&mut vector, &format!("t:{trigram}"), TRIGRAM_WEIGHT);
            }
        }
        Ok(l2_normalize(&vector))
    }
}

/// Lowercased alphanumeric tokens joined by single spaces.
///
/// This is the form that is hashed for cache deduplication and embedded.
pub fn normalize(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// L2-normalize a vector; the zero vector is returned unchanged.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}
