// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the parlance translator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use parlance_core::{Action, ComplexityTier, RiskLevel};
use serde::{Deserialize, Serialize};

use crate::defaults;

/// Top-level parlance configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParlanceConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input validation pattern tables and weights.
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Command whitelist and forbidden token tables.
    #[serde(default)]
    pub whitelist: WhitelistConfig,

    /// Human-in-the-loop approval policy.
    #[serde(default)]
    pub approval: ApprovalConfig,

    /// Semantic cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Advisory model routing settings.
    #[serde(default)]
    pub router: RouterConfig,

    /// Engine waterfall thresholds.
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Intent definitions for the keyword/pattern classifier.
    #[serde(default = "defaults::intents")]
    pub intents: Vec<IntentDefinition>,
}

impl Default for ParlanceConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            validator: ValidatorConfig::default(),
            whitelist: WhitelistConfig::default(),
            approval: ApprovalConfig::default(),
            cache: CacheConfig::default(),
            router: RouterConfig::default(),
            translator: TranslatorConfig::default(),
            intents: defaults::intents(),
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Input validator configuration.
///
/// Each pattern family contributes its weight once per matching pattern.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Regexes detecting attempts to override the translator's instructions.
    #[serde(default = "defaults::prompt_injection_patterns")]
    pub prompt_injection_patterns: Vec<String>,

    /// Regexes detecting shell metacharacters and command smuggling.
    #[serde(default = "defaults::command_injection_patterns")]
    pub command_injection_patterns: Vec<String>,

    /// Regexes detecting attempts to reassign the translator's role.
    #[serde(default = "defaults::role_modification_patterns")]
    pub role_modification_patterns: Vec<String>,

    #[serde(default = "default_prompt_injection_weight")]
    pub prompt_injection_weight: f32,

    #[serde(default = "default_command_injection_weight")]
    pub command_injection_weight: f32,

    #[serde(default = "default_role_modification_weight")]
    pub role_modification_weight: f32,

    /// Fraction of special characters above which the input is penalized.
    #[serde(default = "default_special_char_ratio")]
    pub special_char_ratio: f32,

    #[serde(default = "default_special_char_weight")]
    pub special_char_weight: f32,

    /// Length in characters above which the input is penalized.
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    #[serde(default = "default_length_weight")]
    pub length_weight: f32,

    /// Inputs larger than this many bytes are rejected without scanning.
    #[serde(default = "default_max_scan_bytes")]
    pub max_scan_bytes: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            prompt_injection_patterns: defaults::prompt_injection_patterns(),
            command_injection_patterns: defaults::command_injection_patterns(),
            role_modification_patterns: defaults::role_modification_patterns(),
            prompt_injection_weight: default_prompt_injection_weight(),
            command_injection_weight: default_command_injection_weight(),
            role_modification_weight: default_role_modification_weight(),
            special_char_ratio: default_special_char_ratio(),
            special_char_weight: default_special_char_weight(),
            max_length: default_max_length(),
            length_weight: default_length_weight(),
            max_scan_bytes: default_max_scan_bytes(),
        }
    }
}

fn default_prompt_injection_weight() -> f32 {
    3.0
}

fn default_command_injection_weight() -> f32 {
    4.0
}

fn default_role_modification_weight() -> f32 {
    2.5
}

fn default_special_char_ratio() -> f32 {
    0.3
}

fn default_special_char_weight() -> f32 {
    1.0
}

fn default_max_length() -> usize {
    2000
}

fn default_length_weight() -> f32 {
    1.5
}

fn default_max_scan_bytes() -> usize {
    64 * 1024
}

/// Command whitelist configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhitelistConfig {
    /// Tokens that reject a command wherever they appear as a whole word.
    #[serde(default = "defaults::forbidden_words")]
    pub forbidden_words: Vec<String>,

    /// Substrings that reject a command wherever they appear inside a token.
    #[serde(default = "defaults::forbidden_sequences")]
    pub forbidden_sequences: Vec<String>,

    /// Allowed commands keyed by name (`[whitelist.commands.<name>]`).
    #[serde(default = "defaults::commands")]
    pub commands: BTreeMap<String, CommandRule>,
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            forbidden_words: defaults::forbidden_words(),
            forbidden_sequences: defaults::forbidden_sequences(),
            commands: defaults::commands(),
        }
    }
}

/// Policy for a single whitelisted command.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandRule {
    #[serde(default)]
    pub description: String,

    /// Flags accepted without further review.
    #[serde(default)]
    pub allowed_flags: Vec<String>,

    /// Flags accepted only with confirmation; exempt from the forbidden scan.
    #[serde(default)]
    pub dangerous_flags: Vec<String>,

    #[serde(default = "default_rule_risk")]
    pub risk_level: RiskLevel,

    #[serde(default)]
    pub requires_confirmation: bool,

    /// Maximum token count including the command name.
    #[serde(default = "default_max_args")]
    pub max_args: usize,
}

fn default_rule_risk() -> RiskLevel {
    RiskLevel::Low
}

fn default_max_args() -> usize {
    10
}

/// Human-in-the-loop approval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalConfig {
    /// Scores below this are LOW risk and reviewed automatically.
    #[serde(default = "default_auto_threshold")]
    pub auto_threshold: f32,

    /// Scores below this are MEDIUM risk and get a quick review.
    #[serde(default = "default_quick_threshold")]
    pub quick_threshold: f32,

    /// Scores at or above this are CRITICAL and always need approval.
    #[serde(default = "default_detailed_threshold")]
    pub detailed_threshold: f32,

    /// Seconds a request may stay pending before it expires.
    #[serde(default = "default_approval_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "defaults::destructive_keywords")]
    pub destructive_keywords: Vec<String>,

    #[serde(default = "defaults::system_keywords")]
    pub system_keywords: Vec<String>,

    #[serde(default = "defaults::network_keywords")]
    pub network_keywords: Vec<String>,

    #[serde(default = "defaults::file_keywords")]
    pub file_keywords: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            auto_threshold: default_auto_threshold(),
            quick_threshold: default_quick_threshold(),
            detailed_threshold: default_detailed_threshold(),
            timeout_secs: default_approval_timeout(),
            destructive_keywords: defaults::destructive_keywords(),
            system_keywords: defaults::system_keywords(),
            network_keywords: defaults::network_keywords(),
            file_keywords: defaults::file_keywords(),
        }
    }
}

fn default_auto_threshold() -> f32 {
    3.0
}

fn default_quick_threshold() -> f32 {
    5.0
}

fn default_detailed_threshold() -> f32 {
    7.0
}

fn default_approval_timeout() -> u64 {
    1800
}

/// Embedding backend selection for the semantic cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Feature-hashed bag of words and trigrams; no model download.
    #[default]
    Hashing,
    /// Local ONNX sentence-embedding model (requires the `onnx` feature).
    Onnx,
    /// No embeddings; the cache always misses.
    #[serde(rename = "none")]
    Disabled,
}

/// Semantic cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Minimum cosine similarity for a cache hit.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum number of cached translations.
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Seconds before a cached translation expires.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    #[serde(default)]
    pub backend: EmbeddingBackendKind,

    /// Vector width for the hashing embedder.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX backend.
    #[serde(default)]
    pub model_dir: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            similarity_threshold: default_similarity_threshold(),
            max_size: default_cache_max_size(),
            ttl_secs: default_cache_ttl(),
            backend: EmbeddingBackendKind::default(),
            dimensions: default_embedding_dimensions(),
            model_dir: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_cache_max_size() -> usize {
    1000
}

fn default_cache_ttl() -> u64 {
    24 * 60 * 60
}

fn default_embedding_dimensions() -> usize {
    256
}

/// Advisory model routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Force every query to a specific model, bypassing classification.
    #[serde(default)]
    pub force_model: Option<String>,

    #[serde(default = "defaults::simple_keywords")]
    pub simple_keywords: Vec<String>,

    #[serde(default = "defaults::complex_keywords")]
    pub complex_keywords: Vec<String>,

    /// Queries with at most this many words lean simple.
    #[serde(default = "default_simple_max_words")]
    pub simple_max_words: usize,

    /// Queries with more than this many words are complex.
    #[serde(default = "default_complex_min_words")]
    pub complex_min_words: usize,

    /// Expected completion size added to the prompt estimate when costing.
    #[serde(default = "default_expected_output_tokens")]
    pub expected_output_tokens: u32,

    /// Candidate models (`[[router.models]]`).
    #[serde(default = "defaults::models")]
    pub models: Vec<ModelProfile>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            force_model: None,
            simple_keywords: defaults::simple_keywords(),
            complex_keywords: defaults::complex_keywords(),
            simple_max_words: default_simple_max_words(),
            complex_min_words: default_complex_min_words(),
            expected_output_tokens: default_expected_output_tokens(),
            models: defaults::models(),
        }
    }
}

fn default_simple_max_words() -> usize {
    8
}

fn default_complex_min_words() -> usize {
    25
}

fn default_expected_output_tokens() -> u32 {
    256
}

/// A model the router may recommend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelProfile {
    pub name: String,

    /// Price in USD per thousand tokens.
    pub cost_per_1k_tokens: f64,

    /// Expected translation accuracy in `[0, 1]`.
    pub accuracy: f64,

    /// Complexity tiers this model is whitelisted for.
    pub tiers: Vec<ComplexityTier>,
}

/// Engine waterfall configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TranslatorConfig {
    /// Minimum confidence for a function-calling result to end the waterfall.
    #[serde(default = "default_function_calling_threshold")]
    pub function_calling_threshold: f32,

    /// Minimum confidence for a RAG result to end the waterfall.
    #[serde(default = "default_rag_threshold")]
    pub rag_threshold: f32,

    /// Minimum schema match score inside the function-calling engine.
    #[serde(default = "default_function_match_threshold")]
    pub function_match_threshold: f32,

    /// Minimum document relevance inside the RAG engine.
    #[serde(default = "default_rag_min_relevance")]
    pub rag_min_relevance: f32,

    /// Documents retained per retrieval.
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: usize,

    /// Minimum intent score before falling back to clarification.
    #[serde(default = "default_intent_min_score")]
    pub intent_min_score: f32,

    /// Example queries offered when a query cannot be understood.
    #[serde(default = "defaults::clarify_suggestions")]
    pub clarify_suggestions: Vec<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            function_calling_threshold: default_function_calling_threshold(),
            rag_threshold: default_rag_threshold(),
            function_match_threshold: default_function_match_threshold(),
            rag_min_relevance: default_rag_min_relevance(),
            rag_top_k: default_rag_top_k(),
            intent_min_score: default_intent_min_score(),
            clarify_suggestions: defaults::clarify_suggestions(),
        }
    }
}

fn default_function_calling_threshold() -> f32 {
    0.7
}

fn default_rag_threshold() -> f32 {
    0.6
}

fn default_function_match_threshold() -> f32 {
    0.5
}

fn default_rag_min_relevance() -> f32 {
    0.3
}

fn default_rag_top_k() -> usize {
    3
}

fn default_intent_min_score() -> f32 {
    0.3
}

/// A single intent for the keyword/pattern classifier (`[[intents]]`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntentDefinition {
    pub name: String,

    pub action: Action,

    /// Command to run; required when `action` is `EXECUTE_COMMAND`.
    #[serde(default)]
    pub command: Option<String>,

    /// Single words match whole tokens; phrases match as substrings.
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Regexes matched against the raw query.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Added to the score when any keyword or pattern matches.
    #[serde(default)]
    pub confidence_boost: f32,

    #[serde(default)]
    pub explanation: String,
}
