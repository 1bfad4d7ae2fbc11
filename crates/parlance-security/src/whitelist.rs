// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-translation command whitelist.
//!
//! A translated command line is accepted only if its command is declared,
//! no token carries a forbidden word or sequence, and it stays within the
//! command's argument budget. Forbidden detection runs per token:
//!
//! - forbidden *words* match at word boundaries anywhere in a token, so
//!   `rm`, `--segment=rm` and `--sudo` are all caught while `--format` is not;
//! - forbidden *sequences* (`;`, `|`, `$(`, `../`, ...) match as substrings.
//!
//! The only exemption is the name of a flag the command declares as
//! dangerous-but-permitted; a value attached to such a flag is still scanned.

use std::collections::BTreeMap;

use parlance_config::model::{CommandRule, WhitelistConfig};
use parlance_core::{ParlanceError, RiskLevel};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Outcome of checking one command line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhitelistValidationResult {
    pub is_allowed: bool,
    pub risk_level: RiskLevel,
    pub requires_confirmation: bool,
    /// Trimmed tokens with empty entries removed.
    pub sanitized_command: Vec<String>,
    /// Non-fatal findings such as unknown flags.
    pub warnings: Vec<String>,
    /// Why the command was rejected, when it was.
    pub rejection: Option<String>,
}

impl WhitelistValidationResult {
    fn reject(risk_level: RiskLevel, sanitized_command: Vec<String>, reason: String) -> Self {
        Self {
            is_allowed: false,
            risk_level,
            requires_confirmation: false,
            sanitized_command,
            warnings: Vec::new(),
            rejection: Some(reason),
        }
    }

    /// Convert a rejected result into the matching pipeline error.
    pub fn to_error(&self) -> Option<ParlanceError> {
        self.rejection
            .as_ref()
            .map(|reason| ParlanceError::WhitelistRejection {
                command: self.sanitized_command.join(" "),
                reason: reason.clone(),
            })
    }
}

/// Declared commands plus the forbidden token tables.
pub struct CommandWhitelist {
    commands: BTreeMap<String, CommandRule>,
    forbidden_words: Vec<(String, Regex)>,
    forbidden_sequences: Vec<String>,
}

impl CommandWhitelist {
    pub fn new(config: &WhitelistConfig) -> Result<Self, ParlanceError> {
        let forbidden_words = config
            .forbidden_words
            .iter()
            .map(|word| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
                    .map(|re| (word.clone(), re))
                    .map_err(|e| {
                        ParlanceError::Config(format!("invalid forbidden word `{word}`: {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            commands: config.commands.clone(),
            forbidden_words,
            forbidden_sequences: config.forbidden_sequences.clone(),
        })
    }

    /// The rule for a declared command.
    pub fn rule(&self, command: &str) -> Option<&CommandRule> {
        self.commands.get(command)
    }

    /// Names of all declared commands, sorted.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Check `[command, ...args]` against the whitelist.
    pub fn validate_command<S: AsRef<str>>(&self, parts: &[S]) -> WhitelistValidationResult {
        let tokens: Vec<String> = parts
            .iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let result = self.check(tokens);
        if let Some(reason) = &result.rejection {
            debug!(command = ?result.sanitized_command.first(), %reason, "command rejected");
            metrics::counter!("parlance_whitelist_rejections_total").increment(1);
        }
        result
    }

    fn check(&self, tokens: Vec<String>) -> WhitelistValidationResult {
        let Some(command) = tokens.first() else {
            return WhitelistValidationResult::reject(
                RiskLevel::Critical,
                tokens,
                "empty command".to_string(),
            );
        };

        let Some(rule) = self.commands.get(command) else {
            let reason = format!("`{command}` is not a whitelisted command");
            return WhitelistValidationResult::reject(RiskLevel::Critical, tokens, reason);
        };

        for token in &tokens[1..] {
            if let Some(reason) = self.forbidden_in(token, rule) {
                return WhitelistValidationResult::reject(RiskLevel::Critical, tokens, reason);
            }
        }

        if tokens.len() > rule.max_args {
            let reason = format!(
                "{} tokens exceeds the limit of {} for `{command}`",
                tokens.len(),
                rule.max_args
            );
            return WhitelistValidationResult::reject(RiskLevel::High, tokens, reason);
        }

        let mut warnings = Vec::new();
        let mut dangerous_used = false;
        for token in &tokens[1..] {
            let Some(flag) = flag_name(token) else {
                continue;
            };
            if rule.dangerous_flags.iter().any(|f| f == flag) {
                dangerous_used = true;
                warnings.push(format!("`{flag}` is a dangerous flag for `{command}`"));
            } else if !rule.allowed_flags.iter().any(|f| f == flag) {
                warnings.push(format!("unknown flag `{flag}` for `{command}`"));
            }
        }

        let risk_level = if dangerous_used {
            rule.risk_level.escalate()
        } else {
            rule.risk_level
        };

        WhitelistValidationResult {
            is_allowed: true,
            risk_level,
            requires_confirmation: rule.requires_confirmation || dangerous_used,
            sanitized_command: tokens,
            warnings,
            rejection: None,
        }
    }

    /// The first forbidden word or sequence in `token`, if any.
    fn forbidden_in(&self, token: &str, rule: &CommandRule) -> Option<String> {
        let scanned = match (flag_name(token), token.split_once('=')) {
            (Some(flag), value) if rule.dangerous_flags.iter().any(|f| f == flag) => {
                value.map(|(_, v)| v)?
            }
            _ => token,
        };

        if let Some(seq) = self
            .forbidden_sequences
            .iter()
            .find(|seq| scanned.contains(seq.as_str()))
        {
            return Some(format!("forbidden sequence `{seq}` in `{token}`"));
        }
        self.forbidden_words
            .iter()
            .find(|(_, re)| re.is_match(scanned))
            .map(|(word, _)| format!("forbidden word `{word}` in `{token}`"))
    }
}

/// The flag name of a `--flag` or `--flag=value` token.
fn flag_name(token: &str) -> Option<&str> {
    if !token.starts_with("--") {
        return None;
    }
    Some(token.split_once('=').map_or(token, |(name, _)| name))
}
