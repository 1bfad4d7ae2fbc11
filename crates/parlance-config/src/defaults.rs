// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in pattern tables, command catalog, model catalog and intents.
//!
//! Everything here is data: operators override any of it from
//! `parlance.toml` without touching the matching code.

use std::collections::BTreeMap;

use parlance_core::{Action, ComplexityTier, RiskLevel};

use crate::model::{CommandRule, IntentDefinition, ModelProfile};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

pub(crate) fn prompt_injection_patterns() -> Vec<String> {
    strings(&[
        r"(?i)\b(ignore|disregard|skip)\s+(all\s+)?(the\s+)?(previous|prior|above|earlier)\s+(instructions?|prompts?|rules|directions)",
        r"(?i)\bforget\s+(everything|all\s+(previous|prior)|your\s+(instructions|rules))",
        r"(?i)\b(system|developer)\s+prompt\b",
        r"(?i)\bnew\s+instructions?\s*:",
        r"(?i)\boverride\s+(your|the|all)\s+(instructions|rules|safety|restrictions)",
        r"(?i)\breveal\s+(your|the)\s+(system|hidden|secret|initial)\b",
        r"(?i)\[\s*/?\s*(system|inst)\s*\]",
        r"(?i)<\|?\s*(im_start|im_end|system|endoftext)\s*\|?>",
    ])
}

pub(crate) fn command_injection_patterns() -> Vec<String> {
    strings(&[
        r";\s*\w+",
        r"&&|\|\|",
        r"\|\s*\w+",
        r"`[^`]*`",
        r"\$\([^)]*\)",
        r"\$\{[^}]*\}",
        r"(?i)\b(rm\s+-[a-z]*[rf]|sudo\s+\w+|chmod\s+[0-7]{3,4}|chown\s+\w+|mkfs\b|dd\s+if=)",
        r"(?i)\b(curl|wget)\s+\S+",
        r"(?i)\b(nc|netcat)\s+-\w+",
        r"(?i)\b(eval|exec|system)\s*\(",
        r"\.\./",
        r">\s*/\w+",
        r"(?i)/etc/(passwd|shadow|sudoers)",
    ])
}

pub(crate) fn role_modification_patterns() -> Vec<String> {
    strings(&[
        r"(?i)\byou\s+are\s+now\b",
        r"(?i)\bact\s+as\s+(an?\s+)?(admin|administrator|root|superuser|system|developer|different)\b",
        r"(?i)\bpretend\s+(to\s+be|you\s+are)\b",
        r"(?i)\b(enter|enable|switch\s+to|activate)\s+(developer|admin|god|debug|jailbreak|dan)\s+mode\b",
        r"(?i)\bfrom\s+now\s+on,?\s+you\b",
        r"(?i)\broleplay\s+as\b",
    ])
}

pub(crate) fn forbidden_words() -> Vec<String> {
    strings(&[
        "rm", "rmdir", "sudo", "su", "chmod", "chown", "eval", "exec", "curl", "wget", "nc",
        "netcat", "bash", "sh", "zsh", "python", "perl", "dd", "mkfs", "kill", "shutdown",
        "reboot",
    ])
}

pub(crate) fn forbidden_sequences() -> Vec<String> {
    strings(&[";", "&&", "||", "|", "`", "$(", "${", ">", "<", "../"])
}

fn rule(
    description: &str,
    extra_flags: &[&str],
    dangerous_flags: &[&str],
    risk_level: RiskLevel,
    requires_confirmation: bool,
    max_args: usize,
) -> CommandRule {
    let mut allowed_flags = strings(&["--start-date", "--end-date", "--format"]);
    allowed_flags.extend(strings(extra_flags));
    CommandRule {
        description: description.to_string(),
        allowed_flags,
        dangerous_flags: strings(dangerous_flags),
        risk_level,
        requires_confirmation,
        max_args,
    }
}

pub(crate) fn commands() -> BTreeMap<String, CommandRule> {
    let mut commands = BTreeMap::new();
    commands.insert(
        "voice-of-customer".to_string(),
        rule(
            "Voice of customer report over a date range",
            &["--generate-slides", "--include-verbatims", "--segment"],
            &[],
            RiskLevel::Safe,
            false,
            12,
        ),
    );
    commands.insert(
        "sentiment-analysis".to_string(),
        rule(
            "Sentiment breakdown of customer feedback",
            &["--channel", "--granularity"],
            &[],
            RiskLevel::Safe,
            false,
            10,
        ),
    );
    commands.insert(
        "churn-analysis".to_string(),
        rule(
            "Churn drivers and at-risk accounts",
            &["--segment", "--threshold"],
            &[],
            RiskLevel::Low,
            false,
            10,
        ),
    );
    commands.insert(
        "nps-report".to_string(),
        rule(
            "Net promoter score report",
            &["--compare-previous"],
            &[],
            RiskLevel::Safe,
            false,
            10,
        ),
    );
    commands.insert(
        "ticket-trends".to_string(),
        rule(
            "Support ticket volume and topic trends",
            &["--top", "--category"],
            &[],
            RiskLevel::Safe,
            false,
            10,
        ),
    );
    commands.insert(
        "export-data".to_string(),
        rule(
            "Export raw analytics data",
            &["--dataset", "--destination"],
            &["--include-pii", "--overwrite"],
            RiskLevel::Medium,
            true,
            14,
        ),
    );
    commands
}

pub(crate) fn destructive_keywords() -> Vec<String> {
    strings(&[
        "delete", "remove", "drop", "truncate", "purge", "wipe", "destroy", "overwrite", "rm",
        "rmdir", "del", "unlink",
    ])
}

pub(crate) fn system_keywords() -> Vec<String> {
    strings(&[
        "sudo", "chmod", "chown", "install", "uninstall", "shutdown", "reboot", "systemctl",
        "kill",
    ])
}

pub(crate) fn network_keywords() -> Vec<String> {
    strings(&[
        "curl", "wget", "upload", "ssh", "scp", "ftp", "webhook", "destination",
    ])
}

pub(crate) fn file_keywords() -> Vec<String> {
    strings(&["export", "write", "move", "rename", "save", "pii"])
}

pub(crate) fn simple_keywords() -> Vec<String> {
    strings(&["show", "list", "get", "what is", "count", "status", "give me"])
}

pub(crate) fn complex_keywords() -> Vec<String> {
    strings(&[
        "compare", "analyze", "analyse", "correlate", "why", "explain", "forecast", "predict",
        "breakdown", "across", "versus", "vs", "root cause", "over time",
    ])
}

fn model(name: &str, cost_per_1k_tokens: f64, accuracy: f64, tiers: &[ComplexityTier]) -> ModelProfile {
    ModelProfile {
        name: name.to_string(),
        cost_per_1k_tokens,
        accuracy,
        tiers: tiers.to_vec(),
    }
}

pub(crate) fn models() -> Vec<ModelProfile> {
    use ComplexityTier::{Complex, Medium, Simple};
    vec![
        model("claude-haiku-4-5", 0.001, 0.82, &[Simple, Medium]),
        model("claude-sonnet-4", 0.003, 0.90, &[Simple, Medium, Complex]),
        model("claude-sonnet-4-5", 0.003, 0.92, &[Medium, Complex]),
        model("claude-opus-4", 0.015, 0.96, &[Complex]),
    ]
}

pub(crate) fn clarify_suggestions() -> Vec<String> {
    strings(&[
        "Show the voice of customer report for last week",
        "Run sentiment analysis for this month",
        "What is our NPS for last quarter?",
        "Export ticket data as CSV",
        "Type `help` to see everything I can do",
    ])
}

fn intent(
    name: &str,
    action: Action,
    command: Option<&str>,
    keywords: &[&str],
    patterns: &[&str],
    confidence_boost: f32,
    explanation: &str,
) -> IntentDefinition {
    IntentDefinition {
        name: name.to_string(),
        action,
        command: command.map(str::to_string),
        keywords: strings(keywords),
        patterns: strings(patterns),
        confidence_boost,
        explanation: explanation.to_string(),
    }
}

pub(crate) fn intents() -> Vec<IntentDefinition> {
    vec![
        intent(
            "voice_of_customer",
            Action::ExecuteCommand,
            Some("voice-of-customer"),
            &["voice", "customer", "voc", "feedback", "report"],
            &[r"(?i)voice\s+of\s+(the\s+)?customers?", r"(?i)\bvoc\b", r"(?i)customer\s+feedback"],
            0.1,
            "Generate the voice of customer report",
        ),
        intent(
            "sentiment",
            Action::ExecuteCommand,
            Some("sentiment-analysis"),
            &["sentiment", "feel", "mood", "positive", "negative", "emotion"],
            &[r"(?i)\bsentiments?\b", r"(?i)how\s+(do|are)\s+customers\s+feel"],
            0.1,
            "Run sentiment analysis on customer feedback",
        ),
        intent(
            "churn",
            Action::ExecuteCommand,
            Some("churn-analysis"),
            &["churn", "cancel", "attrition", "retention", "leaving"],
            &[r"(?i)\bchurn(ed|ing)?\b", r"(?i)customers?\s+(are\s+)?(leaving|cancell?ing)"],
            0.1,
            "Analyse churn and at-risk accounts",
        ),
        intent(
            "nps",
            Action::ExecuteCommand,
            Some("nps-report"),
            &["nps", "promoter", "detractor", "score", "recommend"],
            &[r"(?i)\bnps\b", r"(?i)net\s+promoter"],
            0.1,
            "Produce the net promoter score report",
        ),
        intent(
            "export",
            Action::ExecuteCommand,
            Some("export-data"),
            &["export", "download", "csv", "dump", "extract"],
            &[r"(?i)\bexport\b", r"(?i)download\s+(the\s+|all\s+)?data"],
            0.05,
            "Export analytics data",
        ),
        intent(
            "trends",
            Action::ExecuteCommand,
            Some("ticket-trends"),
            &["ticket", "tickets", "trend", "trends", "support", "volume"],
            &[r"(?i)tickets?\s+trends?", r"(?i)support\s+(tickets?|volume)"],
            0.05,
            "Show support ticket trends",
        ),
        intent(
            "custom_filter",
            Action::CustomFilter,
            None,
            &["filter", "where", "only", "segment", "exclude"],
            &[r"(?i)\bfilter\s+(by|on|for)\b", r"(?i)\bonly\s+(show|include)\b"],
            0.0,
            "Apply a custom filter to existing analytics data",
        ),
        intent(
            "feature_request",
            Action::SuggestFeature,
            None,
            &["feature", "wish", "integration", "roadmap"],
            &[r"(?i)\bcan\s+you\s+add\b", r"(?i)\bfeature\s+request\b", r"(?i)\bit\s+would\s+be\s+(nice|great)\b"],
            0.0,
            "This looks like a feature request; it has been noted",
        ),
        intent(
            "help",
            Action::ShowHelp,
            None,
            &["help", "commands", "usage"],
            &[r"(?i)^\s*help\b", r"(?i)what\s+can\s+you\s+do", r"(?i)\bhow\s+do\s+i\b"],
            0.1,
            "Show the available commands and example queries",
        ),
    ]
}
