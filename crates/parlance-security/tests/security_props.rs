// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for input screening and the command whitelist.

use parlance_config::model::{ValidatorConfig, WhitelistConfig};
use parlance_core::{RiskLevel, ThreatLevel};
use parlance_security::{CommandWhitelist, InputValidator};
use proptest::prelude::*;

fn sequences() -> Vec<String> {
    WhitelistConfig::default().forbidden_sequences
}

/// Shell metacharacter payloads, each matched by a command-injection pattern
/// whatever text surrounds it.
const INJECTION_TOKENS: &[&str] = &[
    "; rm -rf /",
    "&& cat secrets",
    "|| reboot",
    "| sh",
    "`whoami`",
    "$(id)",
    "${HOME}",
    "../../etc",
];

fn whitelisted(name: &str) -> bool {
    WhitelistConfig::default().commands.contains_key(name)
}

proptest! {
    #[test]
    fn risk_score_stays_in_range(input in ".{0,300}") {
        let validator = InputValidator::new(&ValidatorConfig::default()).unwrap();
        let result = validator.validate(&input);
        prop_assert!((0.0..=10.0).contains(&result.risk_score));
        prop_assert_eq!(result.is_valid, result.threat_level == ThreatLevel::Safe);
    }

    #[test]
    fn sanitized_input_has_no_control_characters(input in "\\PC{0,80}[\\x00-\\x1f]{1,4}\\PC{0,80}") {
        let validator = InputValidator::new(&ValidatorConfig::default()).unwrap();
        let result = validator.validate(&input);
        prop_assert!(!result.sanitized_input.chars().any(char::is_control));
    }

    #[test]
    fn any_forbidden_sequence_in_a_value_is_rejected(
        prefix in "[a-z0-9]{0,8}",
        suffix in "[a-z0-9]{0,8}",
        idx in 0usize..10,
    ) {
        let seqs = sequences();
        let seq = &seqs[idx % seqs.len()];
        let whitelist = CommandWhitelist::new(&WhitelistConfig::default()).unwrap();
        let token = format!("--format={prefix}{seq}{suffix}");
        let result = whitelist.validate_command(&["nps-report".to_string(), token]);
        prop_assert!(!result.is_allowed);
    }

    #[test]
    fn declared_flags_with_plain_values_are_allowed(
        value in "[a-z0-9]{1,10}",
        flag_idx in 0usize..3,
    ) {
        let flags = ["--start-date", "--end-date", "--format"];
        let whitelist = CommandWhitelist::new(&WhitelistConfig::default()).unwrap();
        let words = WhitelistConfig::default().forbidden_words;
        prop_assume!(!words.contains(&value));
        let token = format!("{}={value}", flags[flag_idx]);
        let result = whitelist.validate_command(&["sentiment-analysis".to_string(), token]);
        prop_assert!(result.is_allowed);
        prop_assert!(result.warnings.is_empty());
    }

    #[test]
    fn command_injection_is_always_dangerous(
        before in "[A-Za-z ,.]{0,60}",
        after in "[A-Za-z ,.]{0,60}",
        idx in 0usize..INJECTION_TOKENS.len(),
    ) {
        let validator = InputValidator::new(&ValidatorConfig::default()).unwrap();
        let input = format!("{before}{}{after}", INJECTION_TOKENS[idx]);
        let result = validator.validate(&input);
        prop_assert!(!result.is_valid, "{input} passed");
        prop_assert!(result.risk_score >= 4.0, "{input} scored {}", result.risk_score);
        prop_assert!(
            matches!(result.threat_level, ThreatLevel::Dangerous | ThreatLevel::Critical),
            "{input} was {}",
            result.threat_level
        );
    }

    #[test]
    fn unknown_commands_are_rejected_as_critical(
        command in "[a-z][a-z0-9_.-]{0,15}",
        args in prop::collection::vec("[a-z0-9=-]{1,12}", 0..5),
    ) {
        prop_assume!(!whitelisted(&command));
        let whitelist = CommandWhitelist::new(&WhitelistConfig::default()).unwrap();
        let mut parts = vec![command];
        parts.extend(args);
        let result = whitelist.validate_command(&parts);
        prop_assert!(!result.is_allowed);
        prop_assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn accepted_commands_respect_max_args(
        idx in 0usize..16,
        values in prop::collection::vec("[0-9]{1,4}", 0..30),
    ) {
        let config = WhitelistConfig::default();
        let names: Vec<&String> = config.commands.keys().collect();
        let command = names[idx % names.len()];
        let max_args = config.commands[command].max_args;

        let whitelist = CommandWhitelist::new(&config).unwrap();
        let mut parts = vec![command.clone()];
        parts.extend(values.iter().map(|v| format!("--format={v}")));
        let result = whitelist.validate_command(&parts);

        prop_assert_eq!(result.is_allowed, parts.len() <= max_args);
        if result.is_allowed {
            prop_assert!(result.sanitized_command.len() <= max_args);
        }
    }
}
