// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Deserialization failures become miette diagnostics pointing into the TOML
//! file that caused them. Unknown keys get a Jaro-Winkler "did you mean"
//! against the keys the section accepts.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key needs before it is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, ready for miette to render.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(parlance::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest accepted key, if any is close enough.
        suggestion: Option<String>,
        /// Comma-separated keys the section accepts.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(parlance::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path of the value.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(parlance::config::missing_key),
        help("add `{key} = <value>` to your parlance.toml")
    )]
    MissingKey { key: String },

    /// A value that deserialized but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(parlance::config::validation))]
    Validation { message: String },

    #[error("invalid pattern in `{field}`: {message}")]
    #[diagnostic(
        code(parlance::config::invalid_pattern),
        help("patterns use Rust `regex` syntax; prefix with `(?i)` for case-insensitive matching")
    )]
    InvalidPattern {
        /// Dotted path of the list holding the pattern.
        field: String,
        pattern: String,
        message: String,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(parlance::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error inside a `figment::Error` into a diagnostic.
///
/// `toml_sources` holds `(path, content)` for each file that was merged, so
/// spans can point at the offending line.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = locate(error, &error.path, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.to_string(),
        },
        Kind::InvalidType(actual, expected) => {
            // The path ends with the key itself; its table is everything before.
            let (span, src) = match error.path.split_last() {
                Some((key, table)) => locate(error, table, key, toml_sources),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

/// Span of `key` within `table` in the file the error came from.
fn locate(
    error: &figment::Error,
    table: &[String],
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(figment::Source::File(origin)) = error.metadata.as_ref().and_then(|m| m.source.as_ref())
    else {
        return (None, None);
    };
    let origin = origin.display().to_string();
    let Some((path, content)) = toml_sources.iter().find(|(path, _)| *path == origin) else {
        return (None, None);
    };
    match find_key_offset(content, table, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` as a key inside the table at `path`.
///
/// The table header may be `[a.b]` or `[[a.b]]`. If the full dotted header is
/// absent the search falls back to the outermost table, and an empty path
/// searches from the top of the file.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let body = match path.first() {
        None => 0,
        Some(outer) => header_end(content, &path.join(".")).or_else(|| header_end(content, outer))?,
    };

    let mut offset = body;
    for line in content[body..].split_inclusive('\n') {
        let key_start = line.len() - line.trim_start().len();
        let rest = &line[key_start..];
        if is_header(rest) {
            break;
        }
        if let Some(after) = rest.strip_prefix(field)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + key_start);
        }
        offset += line.len();
    }
    None
}

fn is_header(line: &str) -> bool {
    line.starts_with('[')
}

/// Offset just past the line holding the `[table]` or `[[table]]` header.
fn header_end(content: &str, table: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let name = line
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        if is_header(line.trim_start()) && name == table {
            return Some(offset + line.len());
        }
        offset += line.len();
    }
    None
}

/// Closest entry of `valid_keys` to `unknown` by Jaro-Winkler similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn suggests_close_cache_key() {
        let valid = &["enabled", "similarity_threshold", "max_size", "ttl_secs"];
        assert_eq!(suggest_key("ttl_sec", valid), Some("ttl_secs".to_string()));
    }

    #[test]
    fn suggests_close_approval_key() {
        let valid = &["auto_threshold", "quick_threshold", "timeout_secs"];
        assert_eq!(
            suggest_key("timout_secs", valid),
            Some("timeout_secs".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["log_level"]), None);
    }

    #[test]
    fn key_offset_in_section() {
        let content = "[cache]\nttl_sec = 10\n";
        let o = find_key_offset(content, &path(&["cache"]), "ttl_sec").unwrap();
        assert_eq!(&content[o..o + 7], "ttl_sec");
    }

    #[test]
    fn key_offset_skips_same_key_in_other_tables() {
        let content = "[cache]\nmax_size = 5\n\n[whitelist.commands.nps-report]\nmax_size = 3\n";
        let o = find_key_offset(
            content,
            &path(&["whitelist", "commands", "nps-report"]),
            "max_size",
        )
        .unwrap();
        assert!(o > content.find("[whitelist").unwrap());
    }

    #[test]
    fn key_offset_in_array_of_tables() {
        let content = "[[router.models]]\nnmae = \"x\"\n";
        let o = find_key_offset(content, &path(&["router", "models"]), "nmae").unwrap();
        assert_eq!(&content[o..o + 4], "nmae");
    }

    #[test]
    fn key_offset_ignores_prefix_matches() {
        let content = "[cache]\nttl_secs_max = 1\nttl_secs = 2\n";
        let o = find_key_offset(content, &path(&["cache"]), "ttl_secs").unwrap();
        assert_eq!(&content[o..o + 12], "ttl_secs = 2");
    }

    #[test]
    fn key_offset_stops_at_the_next_table() {
        let content = "[cache]\nenabled = true\n[router]\nbogus = 1\n";
        assert_eq!(find_key_offset(content, &path(&["cache"]), "bogus"), None);
    }

    #[test]
    fn validation_error_renders_message() {
        let err = ConfigError::Validation {
            message: "cache.max_size must be at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "validation error: cache.max_size must be at least 1"
        );
    }
}
