// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-memory running statistics for engines and the translator.

use serde::Serialize;

/// Incrementally updated arithmetic mean.
///
/// Uses `avg' = (avg * (n - 1) + x) / n`, so no sample history is retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningMean {
    count: u64,
    mean: f64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the mean.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        let n = self.count as f64;
        self.mean = (self.mean * (n - 1.0) + value) / n;
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Per-engine call statistics, owned by each engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineStats {
    /// Queries the engine was asked to translate.
    pub calls: u64,
    /// Calls that produced a translation.
    pub matches: u64,
    /// Calls that failed internally.
    pub failures: u64,
    /// Mean confidence over matched calls.
    pub confidence: RunningMean,
    /// Mean latency over all calls, in milliseconds.
    pub latency_ms: RunningMean,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call that produced a translation.
    pub fn record_match(&mut self, confidence: f32, latency_ms: f64) {
        self.calls += 1;
        self.matches += 1;
        self.confidence.record(f64::from(confidence));
        self.latency_ms.record(latency_ms);
    }

    /// Record a call that completed without a match.
    pub fn record_miss(&mut self, latency_ms: f64) {
        self.calls += 1;
        self.latency_ms.record(latency_ms);
    }

    /// Record a call that failed internally.
    pub fn record_failure(&mut self, latency_ms: f64) {
        self.calls += 1;
        self.failures += 1;
        self.latency_ms.record(latency_ms);
    }

    /// Fraction of calls that produced a translation.
    pub fn match_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.matches as f64 / self.calls as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_batch_mean() {
        let samples = [0.2, 0.9, 0.4, 0.7, 1.0];
        let mut mean = RunningMean::new();
        for s in samples {
            mean.record(s);
        }
        let expected: f64 = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean.mean() - expected).abs() < 1e-12);
        assert_eq!(mean.count(), 5);
    }

    #[test]
    fn empty_mean_is_zero() {
        assert_eq!(RunningMean::new().mean(), 0.0);
    }

    #[test]
    fn engine_stats_counts() {
        let mut stats = EngineStats::new();
        stats.record_match(0.8, 2.0);
        stats.record_miss(4.0);
        stats.record_failure(6.0);
        assert_eq!(stats.calls, 3);
        assert_eq!(stats.matches, 1);
        assert_eq!(stats.failures, 1);
        assert!((stats.confidence.mean() - 0.8).abs() < 1e-6);
        assert!((stats.latency_ms.mean() - 4.0).abs() < 1e-12);
        assert!((stats.match_rate() - 1.0 / 3.0).abs() < 1e-12);
    }
}
