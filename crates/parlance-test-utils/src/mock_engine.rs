// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stub translation engines for deterministic waterfall tests.

use std::sync::atomic::{AtomicU64, Ordering};

use parlance_core::{
    CommandTranslation, EngineKind, EngineStats, ParlanceError, QueryContext, TranslationEngine,
};

/// An engine that returns the same answer, or declines, for every query.
pub struct StubEngine {
    kind: EngineKind,
    answer: Option<CommandTranslation>,
    calls: AtomicU64,
}

impl StubEngine {
    /// Always answer with `translation`.
    pub fn answering(kind: EngineKind, translation: CommandTranslation) -> Self {
        Self {
            kind,
            answer: Some(translation),
            calls: AtomicU64::new(0),
        }
    }

    /// Always decline.
    pub fn declining(kind: EngineKind) -> Self {
        Self {
            kind,
            answer: None,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of times the engine has been asked.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TranslationEngine for StubEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn translate(
        &self,
        _query: &str,
        _ctx: &QueryContext,
    ) -> Result<Option<CommandTranslation>, ParlanceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.answer.clone())
    }

    fn stats(&self) -> EngineStats {
        EngineStats {
            calls: self.calls(),
            ..EngineStats::default()
        }
    }
}

/// An engine that fails every call with [`ParlanceError::EngineFailure`].
pub struct FailingEngine {
    kind: EngineKind,
}

impl FailingEngine {
    pub fn new(kind: EngineKind) -> Self {
        Self { kind }
    }
}

impl TranslationEngine for FailingEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn translate(
        &self,
        _query: &str,
        _ctx: &QueryContext,
    ) -> Result<Option<CommandTranslation>, ParlanceError> {
        Err(ParlanceError::EngineFailure {
            engine: self.kind,
            message: "stub failure".to_string(),
        })
    }

    fn stats(&self) -> EngineStats {
        EngineStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_counts_calls() {
        let engine = StubEngine::declining(EngineKind::Rag);
        assert!(engine.translate("q", &QueryContext::new()).unwrap().is_none());
        assert!(engine.translate("q", &QueryContext::new()).unwrap().is_none());
        assert_eq!(engine.calls(), 2);
        assert_eq!(engine.stats().calls, 2);
    }

    #[test]
    fn failing_engine_names_itself() {
        let err = FailingEngine::new(EngineKind::Rag)
            .translate("q", &QueryContext::new())
            .unwrap_err();
        assert!(err.to_string().starts_with("rag engine failed"));
    }
}
