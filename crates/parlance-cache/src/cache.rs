// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity-keyed translation cache with TTL and LRU eviction.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, NaiveDate, TimeDelta, Utc};
use parlance_config::model::CacheConfig;
use parlance_core::{CommandTranslation, EmbeddingBackend, HealthStatus};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::embedder::{normalize, time_key};
use crate::index::{FlatIndex, VectorIndex};

/// One cached translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Hex SHA-256 of the normalized query.
    pub query_hash: String,
    pub query_text: String,
    pub response: CommandTranslation,
    pub created_at: DateTime<Utc>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    /// Numbers and time words of the query; a hit needs an equal key.
    pub time_key: Vec<String>,
    /// Local calendar day the response was computed on.
    pub resolved_on: NaiveDate,
    #[serde(skip)]
    embedding: Vec<f32>,
}

impl CacheEntry {
    /// Whether this entry answers a query with `key` asked on `today`.
    ///
    /// Relative periods resolve differently once the day changes, so an
    /// entry with a non-empty key only serves the day it was computed on.
    fn answers(&self, key: &[String], today: NaiveDate) -> bool {
        self.time_key == key && (self.time_key.is_empty() || self.resolved_on == today)
    }
}

/// The local calendar day of `now`, the day relative dates resolve against.
fn local_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

struct State {
    entries: Vec<CacheEntry>,
    index: Box<dyn VectorIndex>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl State {
    /// Re-add every entry so index positions match entry positions.
    fn rebuild(&mut self) {
        self.index.reset();
        let index = &mut self.index;
        self.entries.retain(|entry| match index.add(&entry.embedding) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "dropping cache entry the index rejected");
                false
            }
        });
    }

    /// Drop every entry older than `ttl`, returning how many went.
    fn evict_expired(&mut self, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| now - e.created_at < ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "evicting expired cache entries");
            self.evictions += evicted as u64;
            metrics::counter!("parlance_cache_evictions_total").increment(evicted as u64);
        }
        evicted
    }

    fn miss(&mut self) -> Option<CommandTranslation> {
        self.misses += 1;
        metrics::counter!("parlance_cache_misses_total").increment(1);
        None
    }
}

/// Caches translations keyed by query meaning rather than exact text.
///
/// Without an embedding backend, or when the backend fails, every lookup
/// misses and every store is a no-op.
pub struct SemanticCache {
    backend: Option<Arc<dyn EmbeddingBackend>>,
    similarity_threshold: f32,
    max_size: usize,
    ttl: TimeDelta,
    state: Mutex<State>,
}

impl SemanticCache {
    /// A cache over `backend`, sized and tuned by `config`.
    ///
    /// A disabled config yields an always-miss cache.
    pub fn new(backend: Option<Arc<dyn EmbeddingBackend>>, config: &CacheConfig) -> Self {
        let backend = backend.filter(|_| config.enabled);
        let dimensions = backend.as_ref().map_or(0, |b| b.dimensions());
        let ttl = i64::try_from(config.ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            backend,
            similarity_threshold: config.similarity_threshold,
            max_size: config.max_size.max(1),
            ttl,
            state: Mutex::new(State {
                entries: Vec::new(),
                index: Box::new(FlatIndex::new(dimensions)),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Replace the default flat index.
    pub fn with_index(self, mut index: Box<dyn VectorIndex>) -> Self {
        index.reset();
        {
            let mut state = self.state();
            state.index = index;
            state.rebuild();
        }
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether lookups can ever hit.
    pub fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// Health of the embedding backend; a cache without one is degraded.
    pub fn health(&self) -> HealthStatus {
        match &self.backend {
            Some(backend) => backend.health_check(),
            None => HealthStatus::Degraded("no embedding backend; cache always misses".into()),
        }
    }

    fn embed(&self, query: &str) -> Option<Vec<f32>> {
        let backend = self.backend.as_ref()?;
        match backend.embed(&normalize(query)) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "embedding failed, bypassing cache");
                None
            }
        }
    }

    /// Look up a translation for a query similar to `query`.
    pub fn get(&self, query: &str) -> Option<CommandTranslation> {
        self.get_at(query, Utc::now())
    }

    /// [`SemanticCache::get`] at an explicit time.
    pub fn get_at(&self, query: &str, now: DateTime<Utc>) -> Option<CommandTranslation> {
        let Some(embedding) = self.embed(query) else {
            return self.state().miss();
        };

        let key = time_key(query);
        let today = local_day(now);

        let mut state = self.state();
        if state.evict_expired(now, self.ttl) > 0 {
            state.rebuild();
        }

        let candidates = state.index.search(&embedding, state.entries.len());
        let Some((position, similarity)) = candidates
            .into_iter()
            .take_while(|(_, similarity)| *similarity >= self.similarity_threshold)
            .find(|(position, _)| {
                state
                    .entries
                    .get(*position)
                    .is_some_and(|e| e.answers(&key, today))
            })
        else {
            debug!("no cached query close enough for the same period");
            return state.miss();
        };

        let entry = &mut state.entries[position];
        entry.access_count += 1;
        entry.last_accessed = now;
        let mut response = entry.response.clone();
        response.metadata.cache_hit = true;
        response.metadata.cache_similarity = Some(similarity);

        state.hits += 1;
        metrics::counter!("parlance_cache_hits_total").increment(1);
        Some(response)
    }

    /// Store `response` for `query`, replacing any entry for the same query.
    pub fn put(&self, query: &str, response: &CommandTranslation) {
        self.put_at(query, response, Utc::now());
    }

    /// [`SemanticCache::put`] at an explicit time.
    pub fn put_at(&self, query: &str, response: &CommandTranslation, now: DateTime<Utc>) {
        let Some(embedding) = self.embed(query) else {
            return;
        };
        let query_hash = hex::encode(Sha256::digest(normalize(query).as_bytes()));
        let time_key = time_key(query);

        let mut response = response.clone();
        response.metadata.cache_hit = false;
        response.metadata.cache_similarity = None;
        let entry = CacheEntry {
            query_hash,
            query_text: query.to_string(),
            response,
            created_at: now,
            access_count: 0,
            last_accessed: now,
            time_key,
            resolved_on: local_day(now),
            embedding,
        };

        let mut state = self.state();
        match state
            .entries
            .iter_mut()
            .find(|e| e.query_hash == entry.query_hash)
        {
            Some(existing) => *existing = entry,
            None => state.entries.push(entry),
        }

        if state.entries.len() > self.max_size {
            state.evict_expired(now, self.ttl);
            let before = state.entries.len();
            while state.entries.len() > self.max_size {
                let Some(lru) = state
                    .entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, e)| e.last_accessed)
                    .map(|(i, _)| i)
                else {
                    break;
                };
                state.entries.remove(lru);
            }
            let evicted = (before - state.entries.len()) as u64;
            state.evictions += evicted;
            metrics::counter!("parlance_cache_evictions_total").increment(evicted);
        }
        state.rebuild();
    }

    /// Drop every entry, keeping the counters.
    pub fn clear(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.index.reset();
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        CacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    /// Snapshot of the cached entries, oldest first.
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.state().entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use parlance_core::ParlanceError;

    use super::*;
    use crate::embedder::HashingEmbedder;

    struct BrokenEmbedder;

    impl EmbeddingBackend for BrokenEmbedder {
        fn name(&self) -> &str {
            "broken"
        }
        fn dimensions(&self) -> usize {
            8
        }
        fn embed(&self, _text: &str) -> Result<Vec<f32>, ParlanceError> {
            Err(ParlanceError::Embedding {
                message: "offline".into(),
                source: None,
            })
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            max_size: 3,
            ttl_secs: 60,
            ..CacheConfig::default()
        }
    }

    fn cache_with(config: &CacheConfig) -> SemanticCache {
        SemanticCache::new(Some(Arc::new(HashingEmbedder::new(256).unwrap())), config)
    }

    fn translation(command: &str) -> CommandTranslation {
        CommandTranslation::execute(command, vec![], command, 0.9)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-13T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn put_then_get_hits() {
        let cache = cache_with(&config());
        cache.put_at("nps report for last week", &translation("nps-report"), t0());
        let hit = cache.get_at("NPS report for last week?", t0()).unwrap();
        assert!(hit.metadata.cache_hit);
        assert!(hit.metadata.cache_similarity.unwrap() > 0.99);
        assert_eq!(hit.command.as_deref(), Some("nps-report"));
        assert_eq!(cache.entries()[0].access_count, 1);
    }

    #[test]
    fn dissimilar_query_misses() {
        let cache = cache_with(&config());
        cache.put_at("nps report", &translation("nps-report"), t0());
        assert!(cache.get_at("churn analysis for enterprise", t0()).is_none());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
    }

    #[test]
    fn duplicate_put_replaces() {
        let cache = cache_with(&config());
        cache.put_at("nps report", &translation("nps-report"), t0());
        cache.put_at("NPS report!", &translation("voice-of-customer"), t0());
        assert_eq!(cache.len(), 1);
        let hit = cache.get_at("nps report", t0()).unwrap();
        assert_eq!(hit.command.as_deref(), Some("voice-of-customer"));
    }

    #[test]
    fn expired_best_match_is_evicted() {
        let cache = cache_with(&config());
        cache.put_at("nps report", &translation("nps-report"), t0());
        let later = t0() + TimeDelta::seconds(60);
        assert!(cache.get_at("nps report", later).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn live_runner_up_serves_when_best_match_expired() {
        let cache = cache_with(&config());
        cache.put_at("nps report for last week", &translation("nps-report"), t0());
        let t1 = t0() + TimeDelta::seconds(40);
        cache.put_at(
            "nps report for last week please",
            &translation("voice-of-customer"),
            t1,
        );

        let later = t0() + TimeDelta::seconds(70);
        let hit = cache.get_at("nps report for last week", later).unwrap();
        assert_eq!(hit.command.as_deref(), Some("voice-of-customer"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn different_period_never_hits() {
        let loose = CacheConfig {
            similarity_threshold: 0.1,
            ..config()
        };
        let cache = cache_with(&loose);
        cache.put_at("last week's voc report", &translation("voice-of-customer"), t0());
        assert!(cache.get_at("last month's voc report", t0()).is_none());
        assert!(cache.get_at("this week's voc report", t0()).is_none());
        assert!(cache.get_at("top 5 voc reports", t0()).is_none());
        assert!(cache.get_at("Last week's VoC report", t0()).is_some());
    }

    #[test]
    fn relative_periods_expire_with_the_day() {
        let long = CacheConfig {
            ttl_secs: 3 * 24 * 60 * 60,
            ..config()
        };
        let cache = cache_with(&long);
        cache.put_at("nps report for last week", &translation("nps-report"), t0());
        cache.put_at("churn analysis", &translation("churn-analysis"), t0());

        let tomorrow = t0() + TimeDelta::days(1);
        assert!(cache.get_at("nps report for last week", tomorrow).is_none());
        assert!(cache.get_at("churn analysis", tomorrow).is_some());
    }

    #[test]
    fn capacity_evicts_expired_then_lru() {
        let cache = cache_with(&config());
        cache.put_at("nps report", &translation("nps-report"), t0());
        let t1 = t0() + TimeDelta::seconds(30);
        cache.put_at("churn analysis", &translation("churn-analysis"), t1);
        cache.put_at("sentiment analysis", &translation("sentiment-analysis"), t1);
        // Touch churn so sentiment becomes least recently used.
        let t2 = t0() + TimeDelta::seconds(45);
        assert!(cache.get_at("churn analysis", t2).is_some());

        // At t3 the nps entry has expired and is evicted first.
        let t3 = t0() + TimeDelta::seconds(70);
        cache.put_at("ticket trends", &translation("ticket-trends"), t3);
        assert_eq!(cache.len(), 3);
        assert!(cache.entries().iter().all(|e| e.query_text != "nps report"));

        cache.put_at("export data", &translation("export-data"), t3);
        assert_eq!(cache.len(), 3);
        let texts: Vec<String> = cache.entries().into_iter().map(|e| e.query_text).collect();
        assert!(!texts.contains(&"sentiment analysis".to_string()));
        assert!(texts.contains(&"churn analysis".to_string()));
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn no_backend_always_misses() {
        let cache = SemanticCache::new(None, &config());
        cache.put("nps report", &translation("nps-report"));
        assert!(cache.get("nps report").is_none());
        assert!(cache.is_empty());
        assert!(!cache.is_active());
        assert!(matches!(cache.health(), HealthStatus::Degraded(_)));
    }

    #[test]
    fn failing_backend_always_misses() {
        let cache = SemanticCache::new(Some(Arc::new(BrokenEmbedder)), &config());
        cache.put("nps report", &translation("nps-report"));
        assert!(cache.get("nps report").is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn disabled_config_always_misses() {
        let config = CacheConfig {
            enabled: false,
            ..config()
        };
        let cache = cache_with(&config);
        cache.put("nps report", &translation("nps-report"));
        assert!(cache.get("nps report").is_none());
    }

    #[test]
    fn clear_keeps_counters() {
        let cache = cache_with(&config());
        cache.put_at("nps report", &translation("nps-report"), t0());
        cache.get_at("nps report", t0());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
        assert!((cache.stats().hit_rate() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stored_response_drops_cache_markers() {
        let cache = cache_with(&config());
        let mut cached = translation("nps-report");
        cached.metadata.cache_hit = true;
        cache.put_at("nps report", &cached, t0());
        assert!(!cache.entries()[0].response.metadata.cache_hit);
    }
}
