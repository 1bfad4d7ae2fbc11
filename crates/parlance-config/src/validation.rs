// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ordering, regex syntax, and cross-references between the
//! intent table and the command whitelist.

use std::collections::HashSet;

use parlance_core::{Action, ComplexityTier};

use crate::diagnostic::ConfigError;
use crate::model::{EmbeddingBackendKind, ParlanceConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParlanceConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_general(config, &mut errors);
    validate_validator(config, &mut errors);
    validate_whitelist(config, &mut errors);
    validate_approval(config, &mut errors);
    validate_cache(config, &mut errors);
    validate_router(config, &mut errors);
    validate_translator(config, &mut errors);
    validate_intents(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(errors: &mut Vec<ConfigError>, message: String) {
    errors.push(ConfigError::Validation { message });
}

fn check_patterns(field: &str, patterns: &[String], errors: &mut Vec<ConfigError>) {
    for pattern in patterns {
        if let Err(e) = regex::Regex::new(pattern) {
            errors.push(ConfigError::InvalidPattern {
                field: field.to_string(),
                pattern: pattern.clone(),
                message: e.to_string(),
            });
        }
    }
}

fn check_unit(field: &str, value: f32, errors: &mut Vec<ConfigError>) {
    if !(0.0..=1.0).contains(&value) {
        invalid(errors, format!("{field} must be between 0 and 1, got {value}"));
    }
}

fn validate_general(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let level = config.general.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(
            errors,
            format!(
                "general.log_level `{}` is not one of {}",
                config.general.log_level,
                LOG_LEVELS.join(", ")
            ),
        );
    }
}

fn validate_validator(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let v = &config.validator;
    check_patterns(
        "validator.prompt_injection_patterns",
        &v.prompt_injection_patterns,
        errors,
    );
    check_patterns(
        "validator.command_injection_patterns",
        &v.command_injection_patterns,
        errors,
    );
    check_patterns(
        "validator.role_modification_patterns",
        &v.role_modification_patterns,
        errors,
    );

    for (name, weight) in [
        ("prompt_injection_weight", v.prompt_injection_weight),
        ("command_injection_weight", v.command_injection_weight),
        ("role_modification_weight", v.role_modification_weight),
        ("special_char_weight", v.special_char_weight),
        ("length_weight", v.length_weight),
    ] {
        if weight < 0.0 {
            invalid(
                errors,
                format!("validator.{name} must be non-negative, got {weight}"),
            );
        }
    }

    if v.special_char_ratio <= 0.0 || v.special_char_ratio > 1.0 {
        invalid(
            errors,
            format!(
                "validator.special_char_ratio must be in (0, 1], got {}",
                v.special_char_ratio
            ),
        );
    }

    if v.max_scan_bytes < v.max_length {
        invalid(
            errors,
            format!(
                "validator.max_scan_bytes ({}) must be at least validator.max_length ({})",
                v.max_scan_bytes, v.max_length
            ),
        );
    }
}

fn validate_whitelist(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let w = &config.whitelist;
    if w.commands.is_empty() {
        invalid(
            errors,
            "whitelist.commands must declare at least one command".to_string(),
        );
    }

    if w.forbidden_words.iter().any(|t| t.trim().is_empty())
        || w.forbidden_sequences.iter().any(|t| t.is_empty())
    {
        invalid(
            errors,
            "whitelist forbidden tokens must not be empty strings".to_string(),
        );
    }

    for (name, rule) in &w.commands {
        if rule.max_args == 0 {
            invalid(
                errors,
                format!("whitelist.commands.{name}.max_args must be at least 1"),
            );
        }
        for flag in rule.allowed_flags.iter().chain(&rule.dangerous_flags) {
            if !flag.starts_with("--") || flag.len() < 3 {
                invalid(
                    errors,
                    format!("whitelist.commands.{name}: flag `{flag}` must start with `--`"),
                );
            }
        }
        for flag in &rule.dangerous_flags {
            if rule.allowed_flags.contains(flag) {
                invalid(
                    errors,
                    format!(
                        "whitelist.commands.{name}: flag `{flag}` is listed as both allowed and dangerous"
                    ),
                );
            }
        }
    }
}

fn validate_approval(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let a = &config.approval;
    let ordered = 0.0 <= a.auto_threshold
        && a.auto_threshold <= a.quick_threshold
        && a.quick_threshold <= a.detailed_threshold
        && a.detailed_threshold <= parlance_core::types::MAX_RISK_SCORE;
    if !ordered {
        invalid(
            errors,
            format!(
                "approval thresholds must satisfy 0 <= auto ({}) <= quick ({}) <= detailed ({}) <= 10",
                a.auto_threshold, a.quick_threshold, a.detailed_threshold
            ),
        );
    }
    if a.timeout_secs == 0 {
        invalid(errors, "approval.timeout_secs must be at least 1".to_string());
    }
}

fn validate_cache(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let c = &config.cache;
    if c.similarity_threshold <= 0.0 || c.similarity_threshold > 1.0 {
        invalid(
            errors,
            format!(
                "cache.similarity_threshold must be in (0, 1], got {}",
                c.similarity_threshold
            ),
        );
    }
    if c.max_size == 0 {
        invalid(errors, "cache.max_size must be at least 1".to_string());
    }
    if c.ttl_secs == 0 {
        invalid(errors, "cache.ttl_secs must be at least 1".to_string());
    }
    if c.backend == EmbeddingBackendKind::Hashing && c.dimensions < 16 {
        invalid(
            errors,
            format!("cache.dimensions must be at least 16, got {}", c.dimensions),
        );
    }
    if c.backend == EmbeddingBackendKind::Onnx && c.model_dir.is_none() {
        invalid(
            errors,
            "cache.model_dir is required when cache.backend = \"onnx\"".to_string(),
        );
    }
}

fn validate_router(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let r = &config.router;
    if r.models.is_empty() {
        invalid(
            errors,
            "router.models must declare at least one model".to_string(),
        );
    }

    let mut seen = HashSet::new();
    for (i, model) in r.models.iter().enumerate() {
        if model.name.trim().is_empty() {
            invalid(errors, format!("router.models[{i}].name must not be empty"));
        } else if !seen.insert(model.name.as_str()) {
            invalid(
                errors,
                format!("duplicate model name `{}` in [[router.models]]", model.name),
            );
        }
        if model.cost_per_1k_tokens <= 0.0 {
            invalid(
                errors,
                format!(
                    "router.models[{i}].cost_per_1k_tokens must be positive, got {}",
                    model.cost_per_1k_tokens
                ),
            );
        }
        if !(0.0..=1.0).contains(&model.accuracy) {
            invalid(
                errors,
                format!(
                    "router.models[{i}].accuracy must be between 0 and 1, got {}",
                    model.accuracy
                ),
            );
        }
    }

    if !r.models.is_empty() {
        for tier in [
            ComplexityTier::Simple,
            ComplexityTier::Medium,
            ComplexityTier::Complex,
        ] {
            if !r.models.iter().any(|m| m.tiers.contains(&tier)) {
                invalid(errors, format!("no router model serves the {tier} tier"));
            }
        }
    }

    if let Some(forced) = &r.force_model
        && !r.models.iter().any(|m| &m.name == forced)
    {
        invalid(
            errors,
            format!("router.force_model `{forced}` is not declared in [[router.models]]"),
        );
    }

    if r.simple_max_words >= r.complex_min_words {
        invalid(
            errors,
            format!(
                "router.simple_max_words ({}) must be below router.complex_min_words ({})",
                r.simple_max_words, r.complex_min_words
            ),
        );
    }
}

fn validate_translator(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    let t = &config.translator;
    check_unit(
        "translator.function_calling_threshold",
        t.function_calling_threshold,
        errors,
    );
    check_unit("translator.rag_threshold", t.rag_threshold, errors);
    check_unit(
        "translator.function_match_threshold",
        t.function_match_threshold,
        errors,
    );
    check_unit("translator.rag_min_relevance", t.rag_min_relevance, errors);
    check_unit("translator.intent_min_score", t.intent_min_score, errors);
    if t.rag_top_k == 0 {
        invalid(errors, "translator.rag_top_k must be at least 1".to_string());
    }
    if t.clarify_suggestions.is_empty() {
        invalid(
            errors,
            "translator.clarify_suggestions must not be empty".to_string(),
        );
    }
}

fn validate_intents(config: &ParlanceConfig, errors: &mut Vec<ConfigError>) {
    if config.intents.is_empty() {
        invalid(errors, "at least one [[intents]] entry is required".to_string());
    }

    let mut seen = HashSet::new();
    for (i, intent) in config.intents.iter().enumerate() {
        if intent.name.trim().is_empty() {
            invalid(errors, format!("intents[{i}].name must not be empty"));
        } else if !seen.insert(intent.name.as_str()) {
            invalid(
                errors,
                format!("duplicate intent name `{}` in [[intents]]", intent.name),
            );
        }

        if intent.keywords.is_empty() && intent.patterns.is_empty() {
            invalid(
                errors,
                format!("intent `{}` needs at least one keyword or pattern", intent.name),
            );
        }

        match (&intent.action, &intent.command) {
            (Action::ExecuteCommand, None) => invalid(
                errors,
                format!(
                    "intent `{}` executes a command but declares no `command`",
                    intent.name
                ),
            ),
            (Action::ExecuteCommand, Some(cmd)) if !config.whitelist.commands.contains_key(cmd) => {
                invalid(
                    errors,
                    format!(
                        "intent `{}` targets `{cmd}`, which is not in whitelist.commands",
                        intent.name
                    ),
                )
            }
            (Action::ClarifyRequest, _) => invalid(
                errors,
                format!(
                    "intent `{}` may not use the CLARIFY_REQUEST action",
                    intent.name
                ),
            ),
            _ => {}
        }

        check_unit(
            &format!("intents[{i}].confidence_boost"),
            intent.confidence_boost,
            errors,
        );
        check_patterns(&format!("intents[{i}].patterns"), &intent.patterns, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelProfile;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ParlanceConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unordered_approval_thresholds_fail() {
        let mut config = ParlanceConfig::default();
        config.approval.quick_threshold = 8.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "approval thresholds"));
    }

    #[test]
    fn bad_regex_is_reported_with_field() {
        let mut config = ParlanceConfig::default();
        config
            .validator
            .prompt_injection_patterns
            .push("(unclosed".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::InvalidPattern { field, pattern, .. }
                if field == "validator.prompt_injection_patterns" && pattern == "(unclosed"
        )));
    }

    #[test]
    fn intent_command_must_be_whitelisted() {
        let mut config = ParlanceConfig::default();
        config.intents[0].command = Some("format-disk".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "not in whitelist.commands"));
    }

    #[test]
    fn executing_intent_needs_command() {
        let mut config = ParlanceConfig::default();
        config.intents[0].command = None;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "declares no `command`"));
    }

    #[test]
    fn duplicate_intent_names_fail() {
        let mut config = ParlanceConfig::default();
        let dup = config.intents[0].clone();
        config.intents.push(dup);
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate intent name"));
    }

    #[test]
    fn unknown_forced_model_fails() {
        let mut config = ParlanceConfig::default();
        config.router.force_model = Some("gpt-imaginary".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "force_model"));
    }

    #[test]
    fn every_tier_needs_a_model() {
        let mut config = ParlanceConfig::default();
        config.router.models = vec![ModelProfile {
            name: "only-simple".to_string(),
            cost_per_1k_tokens: 0.001,
            accuracy: 0.8,
            tiers: vec![ComplexityTier::Simple],
        }];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "medium tier"));
        assert!(has_message(&errors, "complex tier"));
    }

    #[test]
    fn onnx_backend_requires_model_dir() {
        let mut config = ParlanceConfig::default();
        config.cache.backend = EmbeddingBackendKind::Onnx;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "cache.model_dir"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ParlanceConfig::default();
        config.cache.max_size = 0;
        config.cache.similarity_threshold = 1.5;
        config.translator.rag_top_k = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn flag_listed_twice_fails() {
        let mut config = ParlanceConfig::default();
        if let Some(rule) = config.whitelist.commands.get_mut("export-data") {
            rule.allowed_flags.push("--overwrite".to_string());
        }
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "both allowed and dangerous"));
    }
}
