// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parlance translator.
//!
//! The variants mirror the failure taxonomy of the translation pipeline:
//! validation failures and whitelist rejections are terminal, low-confidence
//! translations and approval expiry are recoverable by the user, and engine
//! failures are absorbed by the translator waterfall.

use thiserror::Error;

use crate::types::{ApprovalStatus, EngineKind, ThreatLevel};

/// The primary error type used across all Parlance crates.
#[derive(Debug, Error)]
pub enum ParlanceError {
    /// Configuration errors (invalid TOML, bad patterns, inconsistent catalogs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Input was judged malicious or malformed and must never be executed.
    #[error("input rejected as {threat_level} (risk {risk_score:.1}): {}", patterns.join(", "))]
    ValidationFailure {
        threat_level: ThreatLevel,
        risk_score: f32,
        patterns: Vec<String>,
    },

    /// The translated command is not whitelisted or contains a forbidden token.
    #[error("command `{command}` rejected: {reason}")]
    WhitelistRejection { command: String, reason: String },

    /// No engine reached its acceptance threshold.
    #[error("no confident translation (best confidence {best_confidence:.2})")]
    LowConfidenceTranslation { best_confidence: f32 },

    /// An engine failed internally while matching a query.
    #[error("{engine} engine failed: {message}")]
    EngineFailure { engine: EngineKind, message: String },

    /// An approval request outlived its timeout before being resolved.
    #[error("approval request {id} expired")]
    ApprovalExpired { id: String },

    /// No approval request with the given id exists.
    #[error("approval request {id} not found")]
    ApprovalNotFound { id: String },

    /// The approval request was already resolved.
    #[error("approval request {id} already {status}")]
    ApprovalResolved { id: String, status: ApprovalStatus },

    /// The embedding backend failed or is unavailable.
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParlanceError {
    /// Whether the user can recover by rephrasing or resubmitting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ParlanceError::LowConfidenceTranslation { .. }
                | ParlanceError::EngineFailure { .. }
                | ParlanceError::ApprovalExpired { .. }
                | ParlanceError::Embedding { .. }
        )
    }

    /// Actionable hints to show next to the error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ParlanceError::ValidationFailure { .. } => vec![
                "Describe the report you need in plain words".to_string(),
                "Avoid shell syntax such as `;`, `|` or `$( )`".to_string(),
            ],
            ParlanceError::WhitelistRejection { .. } => vec![
                "Ask for one of the supported reports, e.g. \"voice of customer for last week\""
                    .to_string(),
                "Type `help` to list supported commands".to_string(),
            ],
            ParlanceError::LowConfidenceTranslation { .. } => vec![
                "Name the report you want, e.g. \"sentiment analysis\"".to_string(),
                "Add a time range, e.g. \"for last month\"".to_string(),
            ],
            ParlanceError::EngineFailure { .. } => {
                vec!["Try rephrasing the request".to_string()]
            }
            ParlanceError::ApprovalExpired { .. } => {
                vec!["Submit the request again to start a new approval".to_string()]
            }
            ParlanceError::ApprovalNotFound { .. } | ParlanceError::ApprovalResolved { .. } => {
                vec!["List pending approvals to find a valid request id".to_string()]
            }
            ParlanceError::Config(_) | ParlanceError::Embedding { .. } => {
                vec!["Run `parlance doctor` to check the installation".to_string()]
            }
            ParlanceError::Internal(_) => Vec::new(),
        }
    }
}
