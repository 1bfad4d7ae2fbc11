// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declared function schemas for the analytics CLI.
//!
//! Each schema names a command, its typed parameters and how they map to
//! flags, plus the example phrases and patterns used to recognise it. The
//! catalog is validated once at construction; matching never re-checks it.

use std::collections::HashSet;

use parlance_core::ParlanceError;
use regex::Regex;
use serde_json::json;

/// How a parameter gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Start of the resolved date range.
    StartDate,
    /// End of the resolved date range.
    EndDate,
    /// A boolean flag, present when any trigger phrase appears.
    Flag { triggers: Vec<&'static str> },
    /// One of a fixed set of values, chosen by trigger phrases.
    Choice {
        options: Vec<(&'static str, Vec<&'static str>)>,
        default: Option<&'static str>,
    },
    /// An integer captured by `pattern`'s first group, clamped to `[min, max]`.
    Integer {
        pattern: &'static str,
        min: i64,
        max: i64,
        default: Option<i64>,
    },
}

/// One parameter of a function schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Name used for context overrides and in definitions.
    pub name: &'static str,
    /// CLI flag the value is rendered to.
    pub flag: &'static str,
    pub kind: ParamKind,
    /// Required parameters are always rendered, falling back to a default.
    pub required: bool,
    /// Risk added to the translation when this parameter is rendered.
    pub risk: f32,
}

impl ParamSpec {
    fn new(name: &'static str, flag: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            flag,
            kind,
            required: false,
            risk: 0.0,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn risky(mut self, risk: f32) -> Self {
        self.risk = risk;
        self
    }

    fn has_default(&self) -> bool {
        match &self.kind {
            ParamKind::StartDate | ParamKind::EndDate => true,
            ParamKind::Flag { .. } => true,
            ParamKind::Choice { default, .. } => default.is_some(),
            ParamKind::Integer { default, .. } => default.is_some(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self.kind {
            ParamKind::StartDate | ParamKind::EndDate => "date",
            ParamKind::Flag { .. } => "boolean",
            ParamKind::Choice { .. } => "choice",
            ParamKind::Integer { .. } => "integer",
        }
    }
}

/// A command the function-calling engine can produce.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSchema {
    pub command: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    /// Phrases a user might type for this command.
    pub examples: Vec<&'static str>,
    /// Regexes that indicate this command.
    pub patterns: Vec<&'static str>,
    /// Phrases that identify this command outright.
    pub boost_keywords: Vec<&'static str>,
    /// Minimum match score for this schema.
    pub threshold: f32,
    /// Risk of running the command with no risky parameters.
    pub base_risk: f32,
}

impl FunctionSchema {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON description of the schema for tooling and `parlance commands`.
    pub fn definition(&self) -> serde_json::Value {
        let params: Vec<serde_json::Value> = self
            .params
            .iter()
            .map(|p| {
                let mut def = json!({
                    "name": p.name,
                    "flag": p.flag,
                    "type": p.type_name(),
                    "required": p.required,
                });
                match &p.kind {
                    ParamKind::Choice { options, default } => {
                        def["options"] = json!(options.iter().map(|(v, _)| *v).collect::<Vec<_>>());
                        def["default"] = json!(default);
                    }
                    ParamKind::Integer {
                        min, max, default, ..
                    } => {
                        def["min"] = json!(min);
                        def["max"] = json!(max);
                        def["default"] = json!(default);
                    }
                    _ => {}
                }
                def
            })
            .collect();
        json!({
            "command": self.command,
            "description": self.description,
            "parameters": params,
            "examples": self.examples,
        })
    }
}

/// A validated schema with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub schema: FunctionSchema,
    pub patterns: Vec<Regex>,
    pub integer_patterns: Vec<(&'static str, Regex)>,
}

/// The validated set of function schemas.
#[derive(Debug, Clone)]
pub struct FunctionCatalog {
    schemas: Vec<CompiledSchema>,
}

impl FunctionCatalog {
    /// Validate and compile `schemas`.
    ///
    /// Rejects duplicate commands, flags that are duplicated or lack a `--`
    /// prefix, required parameters without a default, and patterns that do
    /// not compile.
    pub fn new(schemas: Vec<FunctionSchema>) -> Result<Self, ParlanceError> {
        let mut commands = HashSet::new();
        let mut compiled = Vec::with_capacity(schemas.len());
        for schema in schemas {
            if !commands.insert(schema.command) {
                return Err(invalid(schema.command, "declared twice"));
            }
            let mut flags = HashSet::new();
            for param in &schema.params {
                if !param.flag.starts_with("--") {
                    return Err(invalid(
                        schema.command,
                        &format!("flag `{}` must start with `--`", param.flag),
                    ));
                }
                if !flags.insert(param.flag) {
                    return Err(invalid(
                        schema.command,
                        &format!("flag `{}` used twice", param.flag),
                    ));
                }
                if param.required && !param.has_default() {
                    return Err(invalid(
                        schema.command,
                        &format!("required parameter `{}` has no default", param.name),
                    ));
                }
            }
            let patterns = schema
                .patterns
                .iter()
                .map(|p| compile(schema.command, p))
                .collect::<Result<Vec<_>, _>>()?;
            let integer_patterns = schema
                .params
                .iter()
                .filter_map(|p| match &p.kind {
                    ParamKind::Integer { pattern, .. } => Some((p.name, *pattern)),
                    _ => None,
                })
                .map(|(name, p)| compile(schema.command, p).map(|re| (name, re)))
                .collect::<Result<Vec<_>, _>>()?;
            compiled.push(CompiledSchema {
                schema,
                patterns,
                integer_patterns,
            });
        }
        Ok(Self { schemas: compiled })
    }

    /// The six built-in analytics commands.
    pub fn builtin() -> Result<Self, ParlanceError> {
        Self::new(builtin_schemas())
    }

    pub fn schemas(&self) -> &[CompiledSchema] {
        &self.schemas
    }

    pub fn get(&self, command: &str) -> Option<&CompiledSchema> {
        self.schemas.iter().find(|s| s.schema.command == command)
    }

    /// JSON definitions of every schema, in declaration order.
    pub fn definitions(&self) -> Vec<serde_json::Value> {
        self.schemas.iter().map(|s| s.schema.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn invalid(command: &str, detail: &str) -> ParlanceError {
    ParlanceError::Config(format!("function schema `{command}`: {detail}"))
}

fn compile(command: &str, pattern: &str) -> Result<Regex, ParlanceError> {
    Regex::new(pattern).map_err(|e| invalid(command, &format!("pattern `{pattern}`: {e}")))
}

fn date_params() -> [ParamSpec; 2] {
    [
        ParamSpec::new("start_date", "--start-date", ParamKind::StartDate).required(),
        ParamSpec::new("end_date", "--end-date", ParamKind::EndDate).required(),
    ]
}

fn format_param(default: Option<&'static str>) -> ParamSpec {
    let param = ParamSpec::new(
        "format",
        "--format",
        ParamKind::Choice {
            options: vec![
                ("csv", vec!["csv", "spreadsheet", "excel"]),
                ("json", vec!["json"]),
                ("pdf", vec!["pdf"]),
                ("markdown", vec!["markdown"]),
            ],
            default,
        },
    );
    if default.is_some() {
        param.required()
    } else {
        param
    }
}

fn segment_param() -> ParamSpec {
    ParamSpec::new(
        "segment",
        "--segment",
        ParamKind::Choice {
            options: vec![
                ("enterprise", vec!["enterprise"]),
                ("smb", vec!["smb", "small business"]),
                ("consumer", vec!["consumer"]),
            ],
            default: None,
        },
    )
}

/// Built-in schemas, in matching priority order.
pub fn builtin_schemas() -> Vec<FunctionSchema> {
    vec![
        FunctionSchema {
            command: "voice-of-customer",
            description: "Voice of customer report",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(None),
                    ParamSpec::new(
                        "generate_slides",
                        "--generate-slides",
                        ParamKind::Flag {
                            triggers: vec!["slides", "slide deck", "presentation", "powerpoint", "deck"],
                        },
                    ),
                    ParamSpec::new(
                        "include_verbatims",
                        "--include-verbatims",
                        ParamKind::Flag {
                            triggers: vec!["verbatim", "verbatims", "quotes"],
                        },
                    ),
                    segment_param(),
                ],
            ]
            .concat(),
            examples: vec![
                "voice of customer report",
                "show me the voc analysis",
                "what are customers saying",
                "customer feedback summary",
                "generate voice of customer slides",
            ],
            patterns: vec![
                r"(?i)voice\s+of\s+(the\s+)?customers?",
                r"(?i)\bvoc\b",
                r"(?i)customers?\s+(are\s+)?saying",
                r"(?i)customer\s+feedback",
            ],
            boost_keywords: vec!["voice of customer", "voice of the customer", "voc"],
            threshold: 0.5,
            base_risk: 0.5,
        },
        FunctionSchema {
            command: "sentiment-analysis",
            description: "Sentiment analysis",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(None),
                    ParamSpec::new(
                        "channel",
                        "--channel",
                        ParamKind::Choice {
                            options: vec![
                                ("email", vec!["email", "emails"]),
                                ("chat", vec!["chat", "live chat"]),
                                ("social", vec!["social", "twitter"]),
                                ("reviews", vec!["review", "app store"]),
                            ],
                            default: None,
                        },
                    ),
                    ParamSpec::new(
                        "granularity",
                        "--granularity",
                        ParamKind::Choice {
                            options: vec![
                                ("daily", vec!["daily", "per day", "by day"]),
                                ("weekly", vec!["weekly", "per week", "by week"]),
                                ("monthly", vec!["monthly", "per month", "by month"]),
                            ],
                            default: None,
                        },
                    ),
                ],
            ]
            .concat(),
            examples: vec![
                "sentiment analysis",
                "how do customers feel",
                "customer sentiment trend",
                "positive and negative feedback breakdown",
            ],
            patterns: vec![
                r"(?i)\bsentiments?\b",
                r"(?i)how\s+(do|are)\s+customers\s+feel",
                r"(?i)\b(positive|negative)\s+(feedback|reviews?)",
            ],
            boost_keywords: vec!["sentiment"],
            threshold: 0.5,
            base_risk: 0.5,
        },
        FunctionSchema {
            command: "churn-analysis",
            description: "Churn analysis",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(None),
                    segment_param(),
                    ParamSpec::new(
                        "threshold",
                        "--threshold",
                        ParamKind::Integer {
                            pattern: r"(?i)\b(?:above|over|threshold(?:\s+of)?)\s+(\d{1,3})\s*%",
                            min: 1,
                            max: 100,
                            default: None,
                        },
                    ),
                ],
            ]
            .concat(),
            examples: vec![
                "churn analysis",
                "which customers are likely to churn",
                "customers at risk of leaving",
                "cancellation drivers",
            ],
            patterns: vec![
                r"(?i)\bchurn(ed|ing)?\b",
                r"(?i)customers?\s+(are\s+)?(leaving|cancell?ing)",
                r"(?i)\bat[\s-]risk\b",
            ],
            boost_keywords: vec!["churn"],
            threshold: 0.5,
            base_risk: 1.0,
        },
        FunctionSchema {
            command: "nps-report",
            description: "Net promoter score report",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(None),
                    ParamSpec::new(
                        "compare_previous",
                        "--compare-previous",
                        ParamKind::Flag {
                            triggers: vec!["compare", "compared", "versus", "vs", "previous period"],
                        },
                    ),
                ],
            ]
            .concat(),
            examples: vec![
                "nps report",
                "net promoter score",
                "how likely are customers to recommend us",
                "promoters and detractors",
            ],
            patterns: vec![
                r"(?i)\bnps\b",
                r"(?i)net\s+promoter",
                r"(?i)\b(promoters?|detractors?)\b",
            ],
            boost_keywords: vec!["nps", "net promoter"],
            threshold: 0.5,
            base_risk: 0.5,
        },
        FunctionSchema {
            command: "ticket-trends",
            description: "Support ticket trends",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(None),
                    ParamSpec::new(
                        "top",
                        "--top",
                        ParamKind::Integer {
                            pattern: r"(?i)\btop\s+(\d{1,3})\b",
                            min: 1,
                            max: 100,
                            default: Some(10),
                        },
                    )
                    .required(),
                    ParamSpec::new(
                        "category",
                        "--category",
                        ParamKind::Choice {
                            options: vec![
                                ("billing", vec!["billing", "invoice", "payment"]),
                                ("technical", vec!["technical", "bug", "outage"]),
                                ("account", vec!["account", "login", "password"]),
                            ],
                            default: None,
                        },
                    ),
                ],
            ]
            .concat(),
            examples: vec![
                "support ticket trends",
                "top ticket categories",
                "ticket volume over time",
                "most common support issues",
            ],
            patterns: vec![
                r"(?i)tickets?\s+(trends?|volume|categories)",
                r"(?i)support\s+(tickets?|issues|volume)",
            ],
            boost_keywords: vec!["ticket trends", "ticket volume"],
            threshold: 0.5,
            base_risk: 0.5,
        },
        FunctionSchema {
            command: "export-data",
            description: "Raw data export",
            params: [
                date_params().to_vec(),
                vec![
                    format_param(Some("csv")),
                    ParamSpec::new(
                        "dataset",
                        "--dataset",
                        ParamKind::Choice {
                            options: vec![
                                ("tickets", vec!["ticket", "support"]),
                                ("feedback", vec!["feedback", "survey"]),
                                ("nps", vec!["nps"]),
                            ],
                            default: Some("feedback"),
                        },
                    )
                    .required(),
                    ParamSpec::new(
                        "include_pii",
                        "--include-pii",
                        ParamKind::Flag {
                            triggers: vec!["pii", "personal data", "email addresses", "customer names"],
                        },
                    )
                    .risky(2.5),
                    ParamSpec::new(
                        "overwrite",
                        "--overwrite",
                        ParamKind::Flag {
                            triggers: vec!["overwrite", "replace existing"],
                        },
                    )
                    .risky(2.0),
                ],
            ]
            .concat(),
            examples: vec![
                "export the data",
                "download raw data as csv",
                "export feedback to a file",
                "dump all tickets",
            ],
            patterns: vec![
                r"(?i)\bexport\b",
                r"(?i)download\s+(the\s+|all\s+)?(raw\s+)?data",
                r"(?i)\bdump\b",
            ],
            boost_keywords: vec!["export"],
            threshold: 0.5,
            base_risk: 4.0,
        },
    ]
}
