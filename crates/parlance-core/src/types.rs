// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by every stage of the translation pipeline.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Risk score at or above which a translation is flagged dangerous.
pub const DANGEROUS_RISK_SCORE: f32 = 7.0;

/// Upper bound of the risk scale.
pub const MAX_RISK_SCORE: f32 = 10.0;

/// What the caller should do with a translation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Run `[command, ...args]` against the analytics CLI.
    ExecuteCommand,
    /// Ask the user to rephrase; carries suggestions.
    ClarifyRequest,
    /// The user asked for an ad hoc filter over existing data.
    CustomFilter,
    /// The user is requesting a capability that does not exist yet.
    SuggestFeature,
    /// Show usage help.
    ShowHelp,
}

/// Threat classification produced by input validation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Safe,
    Suspicious,
    Dangerous,
    Critical,
}

impl ThreatLevel {
    /// Map an accumulated risk score to a threat level.
    ///
    /// `>= 7` critical, `>= 5` dangerous, `>= 2` suspicious, otherwise safe.
    pub fn from_score(score: f32) -> Self {
        if score >= 7.0 {
            ThreatLevel::Critical
        } else if score >= 5.0 {
            ThreatLevel::Dangerous
        } else if score >= 2.0 {
            ThreatLevel::Suspicious
        } else {
            ThreatLevel::Safe
        }
    }
}

/// Risk classification of a command, used by the whitelist and approval flow.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// The next level up, saturating at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Safe => RiskLevel::Low,
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }
}

/// Lifecycle state of a human approval request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl ApprovalStatus {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

/// Which stage of the translator produced a result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EngineKind {
    Cache,
    FunctionCalling,
    Rag,
    IntentClassifier,
    Fallback,
}

/// Query complexity tiers used for advisory model routing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComplexityTier {
    /// Short lookups and single-report requests.
    Simple,
    /// Ordinary multi-parameter requests.
    Medium,
    /// Multi-step analysis, comparisons, open-ended questions.
    Complex,
}

/// Health status reported by pluggable backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Provenance of a translation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationMetadata {
    /// Engine that produced the translation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_used: Option<EngineKind>,
    /// True when the translation was served from the semantic cache.
    #[serde(default)]
    pub cache_hit: bool,
    /// Similarity of the cached query that served this translation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_similarity: Option<f32>,
    /// Name of the matched schema, intent, or document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
    /// Wall-clock time spent translating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
}

/// A translated command, or an instruction to the user interface.
///
/// Construct through [`CommandTranslation::execute`], [`CommandTranslation::clarify`]
/// or [`CommandTranslation::respond`]; they uphold the invariant that an
/// `ExecuteCommand` action always names a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTranslation {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub explanation: String,
    #[serde(default)]
    pub dangerous: bool,
    #[serde(default)]
    pub confirmation_required: bool,
    /// Potential harm of executing the command, in `[0, 10]`.
    #[serde(default)]
    pub risk_score: f32,
    /// Engine certainty, in `[0, 1]`.
    #[serde(default)]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub metadata: TranslationMetadata,
}

impl CommandTranslation {
    /// A command to execute.
    pub fn execute(
        command: impl Into<String>,
        args: Vec<String>,
        explanation: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            action: Action::ExecuteCommand,
            command: Some(command.into()),
            args,
            explanation: explanation.into(),
            dangerous: false,
            confirmation_required: false,
            risk_score: 0.0,
            confidence: clamp_unit(confidence),
            suggestions: Vec::new(),
            metadata: TranslationMetadata::default(),
        }
    }

    /// A request for the user to rephrase.
    pub fn clarify(explanation: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            action: Action::ClarifyRequest,
            command: None,
            args: Vec::new(),
            explanation: explanation.into(),
            dangerous: false,
            confirmation_required: false,
            risk_score: 0.0,
            confidence: 0.0,
            suggestions,
            metadata: TranslationMetadata::default(),
        }
    }

    /// A non-executing response (help, custom filter, feature suggestion).
    ///
    /// `ExecuteCommand` is not a valid response action and degrades to
    /// `ClarifyRequest`.
    pub fn respond(action: Action, explanation: impl Into<String>, confidence: f32) -> Self {
        let action = match action {
            Action::ExecuteCommand => Action::ClarifyRequest,
            other => other,
        };
        Self {
            action,
            command: None,
            args: Vec::new(),
            explanation: explanation.into(),
            dangerous: false,
            confirmation_required: false,
            risk_score: 0.0,
            confidence: clamp_unit(confidence),
            suggestions: Vec::new(),
            metadata: TranslationMetadata::default(),
        }
    }

    /// Set the risk score; scores at or above 7 mark the translation dangerous.
    pub fn with_risk(mut self, risk_score: f32) -> Self {
        self.risk_score = risk_score.clamp(0.0, MAX_RISK_SCORE);
        self.dangerous = self.risk_score >= DANGEROUS_RISK_SCORE;
        if self.dangerous {
            self.confirmation_required = true;
        }
        self
    }

    pub fn with_confirmation(mut self, required: bool) -> Self {
        self.confirmation_required = self.confirmation_required || required;
        self
    }

    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.metadata.engine_used = Some(engine);
        self
    }

    pub fn with_matched(mut self, matched: impl Into<String>) -> Self {
        self.metadata.matched = Some(matched.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// The command line `[command, ...args]`, if this is an executable translation.
    pub fn command_line(&self) -> Option<Vec<String>> {
        if self.action != Action::ExecuteCommand {
            return None;
        }
        let command = self.command.as_ref()?;
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(command.clone());
        parts.extend(self.args.iter().cloned());
        Some(parts)
    }

    /// Check the structural invariants of the translation.
    pub fn is_consistent(&self) -> bool {
        let command_ok = self.action != Action::ExecuteCommand
            || self.command.as_deref().is_some_and(|c| !c.is_empty());
        command_ok
            && (0.0..=MAX_RISK_SCORE).contains(&self.risk_score)
            && (0.0..=1.0).contains(&self.confidence)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Optional caller context accompanying a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Date that relative phrases ("last week") are resolved against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
    /// Free-form key/value pairs supplied by the host.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the reference date, mainly for deterministic tests.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The reference date, or today in local time.
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}
