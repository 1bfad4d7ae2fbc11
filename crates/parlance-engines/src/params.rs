// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter extraction and flag rendering shared by the schema-driven engines.

use parlance_core::QueryContext;

use crate::catalog::{CompiledSchema, ParamKind, ParamSpec};
use crate::dates::DateRange;
use crate::text::NormalizedQuery;

/// Arguments extracted for one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArgs {
    /// Rendered flags in declaration order.
    pub args: Vec<String>,
    pub range: DateRange,
    /// Whether the range came from the query rather than the default.
    pub range_explicit: bool,
    /// Sum of the risk of every rendered parameter.
    pub added_risk: f32,
}

/// Extract the parameters of `schema` from `query`.
///
/// A context value named after a parameter overrides extraction. Flags
/// listed in `implied` are set even without a trigger phrase.
pub fn extract(
    schema: &CompiledSchema,
    query: &str,
    ctx: &QueryContext,
    implied: &[&str],
) -> ExtractedArgs {
    let today = ctx.today();
    let extracted = DateRange::extract(query, today);
    let range_explicit = extracted.is_some();
    let range = extracted.unwrap_or_else(|| DateRange::resolve(query, today));
    let normalized = NormalizedQuery::new(query);

    let mut args = Vec::new();
    let mut added_risk = 0.0;
    for param in &schema.schema.params {
        let value = match ctx.get(param.name) {
            Some(overridden) => from_context(param, overridden),
            None => from_query(schema, param, query, &normalized, &range, implied),
        };
        if let Some(value) = value {
            added_risk += param.risk;
            args.push(render(param, value));
        }
    }

    ExtractedArgs {
        args,
        range,
        range_explicit,
        added_risk,
    }
}

/// A parameter's resolved value; `None` inside means a bare boolean flag.
type Value = Option<String>;

fn from_context(param: &ParamSpec, raw: &str) -> Option<Value> {
    match &param.kind {
        ParamKind::Flag { .. } => {
            matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1").then_some(None)
        }
        ParamKind::Choice { options, .. } => {
            let raw = raw.trim().to_ascii_lowercase();
            options
                .iter()
                .find(|(value, _)| *value == raw)
                .map(|(value, _)| Some(value.to_string()))
        }
        ParamKind::Integer { min, max, .. } => raw
            .trim()
            .parse::<i64>()
            .ok()
            .map(|n| Some(n.clamp(*min, *max).to_string())),
        ParamKind::StartDate | ParamKind::EndDate => {
            chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .ok()
                .map(|d| Some(d.format("%Y-%m-%d").to_string()))
        }
    }
}

fn from_query(
    schema: &CompiledSchema,
    param: &ParamSpec,
    query: &str,
    normalized: &NormalizedQuery,
    range: &DateRange,
    implied: &[&str],
) -> Option<Value> {
    match &param.kind {
        ParamKind::StartDate => Some(Some(range.start_str())),
        ParamKind::EndDate => Some(Some(range.end_str())),
        ParamKind::Flag { triggers } => {
            let hit = implied.contains(&param.name) || triggers.iter().any(|t| normalized.contains(t));
            hit.then_some(None)
        }
        ParamKind::Choice { options, default } => options
            .iter()
            .find(|(_, triggers)| triggers.iter().any(|t| normalized.contains(t)))
            .map(|(value, _)| *value)
            .or(if param.required { *default } else { None })
            .map(|v| Some(v.to_string())),
        ParamKind::Integer {
            min, max, default, ..
        } => {
            let captured = schema
                .integer_patterns
                .iter()
                .find(|(name, _)| *name == param.name)
                .and_then(|(_, re)| re.captures(query))
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<i64>().ok());
            captured
                .or(if param.required { *default } else { None })
                .map(|n| Some(n.clamp(*min, *max).to_string()))
        }
    }
}

fn render(param: &ParamSpec, value: Value) -> String {
    match value {
        Some(v) => format!("{}={v}", param.flag),
        None => param.flag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::catalog::FunctionCatalog;

    fn ctx() -> QueryContext {
        QueryContext::new().with_reference_date(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap())
    }

    fn args_for(command: &str, query: &str) -> ExtractedArgs {
        let catalog = FunctionCatalog::builtin().unwrap();
        extract(catalog.get(command).unwrap(), query, &ctx(), &[])
    }

    #[test]
    fn dates_and_flags_render_in_declaration_order() {
        let out = args_for("voice-of-customer", "last week's voc with slides for enterprise");
        assert_eq!(
            out.args,
            vec![
                "--start-date=2024-03-04",
                "--end-date=2024-03-10",
                "--generate-slides",
                "--segment=enterprise",
            ]
        );
        assert!(out.range_explicit);
    }

    #[test]
    fn missing_range_defaults_to_a_week() {
        let out = args_for("nps-report", "nps report");
        assert_eq!(out.args, vec!["--start-date=2024-03-06", "--end-date=2024-03-13"]);
        assert!(!out.range_explicit);
    }

    #[test]
    fn integers_are_captured_and_clamped() {
        let out = args_for("ticket-trends", "top 5 ticket categories");
        assert!(out.args.contains(&"--top=5".to_string()));

        let out = args_for("ticket-trends", "top 500 ticket categories");
        assert!(out.args.contains(&"--top=100".to_string()));

        let out = args_for("ticket-trends", "ticket trends");
        assert!(out.args.contains(&"--top=10".to_string()));
    }

    #[test]
    fn required_choices_take_defaults_and_risky_flags_add_risk() {
        let out = args_for("export-data", "export the data including pii");
        assert!(out.args.contains(&"--format=csv".to_string()));
        assert!(out.args.contains(&"--dataset=feedback".to_string()));
        assert!(out.args.contains(&"--include-pii".to_string()));
        assert_eq!(out.added_risk, 2.5);
    }

    #[test]
    fn optional_choices_are_omitted_without_trigger() {
        let out = args_for("sentiment-analysis", "sentiment this month");
        assert!(!out.args.iter().any(|a| a.starts_with("--channel")));
        let out = args_for("sentiment-analysis", "weekly sentiment from live chat");
        assert!(out.args.contains(&"--channel=chat".to_string()));
        assert!(out.args.contains(&"--granularity=weekly".to_string()));
    }

    #[test]
    fn context_values_override_extraction() {
        let catalog = FunctionCatalog::builtin().unwrap();
        let ctx = ctx()
            .with_value("format", "json")
            .with_value("top", "3")
            .with_value("start_date", "2024-01-01");
        let out = extract(catalog.get("ticket-trends").unwrap(), "top 8 tickets", &ctx, &[]);
        assert!(out.args.contains(&"--format=json".to_string()));
        assert!(out.args.contains(&"--top=3".to_string()));
        assert!(out.args.contains(&"--start-date=2024-01-01".to_string()));
    }

    #[test]
    fn implied_flags_are_set() {
        let catalog = FunctionCatalog::builtin().unwrap();
        let out = extract(
            catalog.get("voice-of-customer").unwrap(),
            "quarterly business review",
            &ctx(),
            &["generate_slides"],
        );
        assert!(out.args.contains(&"--generate-slides".to_string()));
    }
}
