// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parlance translator.
//!
//! This crate provides the translation data model, the error taxonomy, the
//! engine and embedding-backend traits, and the running statistics shared by
//! every engine. All other Parlance crates build on these definitions.

pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ParlanceError;
pub use stats::{EngineStats, RunningMean};
pub use traits::{EmbeddingBackend, TranslationEngine};
pub use types::{
    Action, ApprovalStatus, CommandTranslation, ComplexityTier, EngineKind, HealthStatus,
    QueryContext, RiskLevel, ThreatLevel, TranslationMetadata,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_has_all_variants() {
        let _config = ParlanceError::Config("test".into());
        let _validation = ParlanceError::ValidationFailure {
            threat_level: ThreatLevel::Critical,
            risk_score: 8.0,
            patterns: vec!["command_injection".into()],
        };
        let _whitelist = ParlanceError::WhitelistRejection {
            command: "rm".into(),
            reason: "unknown command".into(),
        };
        let _low = ParlanceError::LowConfidenceTranslation { best_confidence: 0.1 };
        let _engine = ParlanceError::EngineFailure {
            engine: EngineKind::Rag,
            message: "boom".into(),
        };
        let _expired = ParlanceError::ApprovalExpired { id: "a".into() };
        let _missing = ParlanceError::ApprovalNotFound { id: "a".into() };
        let _resolved = ParlanceError::ApprovalResolved {
            id: "a".into(),
            status: ApprovalStatus::Approved,
        };
        let _embedding = ParlanceError::Embedding {
            message: "offline".into(),
            source: None,
        };
        let _internal = ParlanceError::Internal("test".into());
    }

    #[test]
    fn recoverable_errors() {
        assert!(ParlanceError::LowConfidenceTranslation { best_confidence: 0.0 }.is_recoverable());
        assert!(ParlanceError::ApprovalExpired { id: "x".into() }.is_recoverable());
        assert!(
            !ParlanceError::WhitelistRejection {
                command: "rm".into(),
                reason: "unknown".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn user_facing_failures_carry_suggestions() {
        let errors = [
            ParlanceError::ValidationFailure {
                threat_level: ThreatLevel::Dangerous,
                risk_score: 5.0,
                patterns: vec![],
            },
            ParlanceError::WhitelistRejection {
                command: "rm".into(),
                reason: "unknown command".into(),
            },
            ParlanceError::LowConfidenceTranslation { best_confidence: 0.2 },
            ParlanceError::ApprovalExpired { id: "x".into() },
        ];
        for err in &errors {
            assert!(!err.suggestions().is_empty(), "{err} has no suggestions");
        }
    }

    #[test]
    fn validation_failure_display_lists_patterns() {
        let err = ParlanceError::ValidationFailure {
            threat_level: ThreatLevel::Critical,
            risk_score: 8.0,
            patterns: vec!["command_injection:;".into(), "command_injection:rm".into()],
        };
        let text = err.to_string();
        assert!(text.contains("CRITICAL"));
        assert!(text.contains("command_injection:rm"));
    }
}
