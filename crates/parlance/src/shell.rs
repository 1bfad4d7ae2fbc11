// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parlance shell` command implementation.
//!
//! Launches an interactive REPL with colored prompt and readline history.
//! Every line goes through the guarded pipeline; lines starting with `:`
//! manage approvals and show statistics.

use std::process::ExitCode;

use colored::Colorize;
use parlance_approval::{ApprovalId, ApprovalRequest};
use parlance_config::model::ParlanceConfig;
use parlance_core::{CommandTranslation, ParlanceError, QueryContext};
use parlance_router::ModelRouter;
use parlance_translator::{GuardedPipeline, PipelineOutcome};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

/// Runs the `parlance shell` interactive REPL.
///
/// Readline blocks, so the loop runs on the blocking pool.
pub async fn run_shell(config: ParlanceConfig) -> Result<ExitCode, ParlanceError> {
    tokio::task::spawn_blocking(move || repl(&config))
        .await
        .map_err(|e| ParlanceError::Internal(format!("shell task failed: {e}")))?
}

fn repl(config: &ParlanceConfig) -> Result<ExitCode, ParlanceError> {
    let pipeline = parlance_translator::build_pipeline(config)?;
    let router = ModelRouter::new(&config.router)?;
    let approver = std::env::var("USER").unwrap_or_else(|_| "local".to_string());

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParlanceError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "parlance shell".bold().green());
    println!(
        "Describe the report you need. Type {} for shell commands, {} to exit.\n",
        ":help".yellow(),
        ":quit".yellow()
    );

    let prompt = format!("{}> ", "parlance".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = trimmed.strip_prefix(':') {
                    match ShellCommand::parse(command) {
                        Some(ShellCommand::Quit) => break,
                        Some(cmd) => {
                            if let Err(e) = run_command(&pipeline, &router, &approver, cmd) {
                                print_error(&e);
                            }
                        }
                        None => eprintln!(
                            "{}: unknown shell command `:{command}`, try {}",
                            "error".red(),
                            ":help".yellow()
                        ),
                    }
                    continue;
                }

                let outcome = pipeline.process(trimmed, &QueryContext::new());
                print_outcome(&outcome);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    let stats = pipeline.translator().stats();
    info!(
        queries = stats.total_queries,
        cache_hits = stats.cache_hits,
        "shell session finished"
    );
    Ok(ExitCode::SUCCESS)
}

/// A `:`-prefixed shell command.
#[derive(Debug, Clone, PartialEq)]
enum ShellCommand {
    Help,
    Quit,
    Pending,
    History,
    Stats,
    Cleanup,
    Approve(String),
    Deny { id: String, reason: String },
    Route(String),
}

impl ShellCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(h, r)| (h, r.trim()));
        match (head, rest) {
            ("help" | "h" | "?", _) => Some(Self::Help),
            ("quit" | "exit" | "q", _) => Some(Self::Quit),
            ("pending", _) => Some(Self::Pending),
            ("history", _) => Some(Self::History),
            ("stats", _) => Some(Self::Stats),
            ("cleanup", _) => Some(Self::Cleanup),
            ("approve", id) if !id.is_empty() => Some(Self::Approve(id.to_string())),
            ("deny", rest) if !rest.is_empty() => {
                let (id, reason) = rest
                    .split_once(char::is_whitespace)
                    .map_or((rest, ""), |(i, r)| (i, r.trim()));
                let reason = if reason.is_empty() {
                    "denied from shell"
                } else {
                    reason
                };
                Some(Self::Deny {
                    id: id.to_string(),
                    reason: reason.to_string(),
                })
            }
            ("route", query) if !query.is_empty() => Some(Self::Route(query.to_string())),
            _ => None,
        }
    }
}

fn parse_id(raw: &str) -> Result<ApprovalId, ParlanceError> {
    raw.parse()
        .map_err(|_| ParlanceError::ApprovalNotFound { id: raw.to_string() })
}

fn run_command(
    pipeline: &GuardedPipeline,
    router: &ModelRouter,
    approver: &str,
    command: ShellCommand,
) -> Result<(), ParlanceError> {
    let approvals = pipeline.approvals();
    match command {
        ShellCommand::Help => print_help(),
        ShellCommand::Quit => {}
        ShellCommand::Pending => {
            let pending = approvals.pending();
            if pending.is_empty() {
                println!("{}", "no pending approvals".dimmed());
            }
            for request in &pending {
                print_request(request);
            }
        }
        ShellCommand::History => {
            for request in approvals.history() {
                print_request(&request);
            }
        }
        ShellCommand::Stats => {
            let translator = pipeline.translator().stats();
            println!(
                "queries {}  cache hits {} ({:.0}%)  clarifications {}",
                translator.total_queries,
                translator.cache_hits,
                translator.cache_hit_rate() * 100.0,
                translator.clarifications
            );
            println!(
                "mean confidence {:.2}  mean latency {:.2}ms",
                translator.confidence.mean(),
                translator.latency_ms.mean()
            );
            for (engine, tally) in &translator.engines {
                println!(
                    "  {engine:<18} answered {:<4} failed {}",
                    tally.successes, tally.failures
                );
            }
            if let Some(cache) = pipeline.translator().cache() {
                let stats = cache.stats();
                println!(
                    "cache {} entries, {} hits, {} misses, {} evictions",
                    stats.entries, stats.hits, stats.misses, stats.evictions
                );
            }
            let approval = approvals.stats();
            println!(
                "approvals pending {}  approved {}  denied {}  expired {}",
                approval.pending, approval.approved, approval.denied, approval.expired
            );
        }
        ShellCommand::Cleanup => {
            let expired = approvals.cleanup_expired_requests();
            println!("{expired} request(s) expired");
        }
        ShellCommand::Approve(raw) => {
            let request = approvals.approve(&parse_id(&raw)?, approver)?;
            println!("{} {}", "approved".green().bold(), request.command.bold());
        }
        ShellCommand::Deny { id, reason } => {
            let request = approvals.deny(&parse_id(&id)?, &reason)?;
            println!("{} {}", "denied".red().bold(), request.command);
        }
        ShellCommand::Route(query) => {
            let decision = router.select_model(&query, None)?;
            println!(
                "{} {} tier, ~{} tokens, ${:.5} ({})",
                decision.model.bold(),
                decision.tier,
                decision.estimated_tokens,
                decision.estimated_cost,
                decision.reason.dimmed()
            );
        }
    }
    Ok(())
}

fn print_help() {
    let rows = [
        (":pending", "list requests waiting for approval"),
        (":approve <id>", "approve a pending request"),
        (":deny <id> [reason]", "deny a pending request"),
        (":history", "list resolved requests"),
        (":cleanup", "expire requests past their timeout"),
        (":route <request>", "recommend a model for a request"),
        (":stats", "show translator, cache and approval statistics"),
        (":quit", "leave the shell"),
    ];
    for (command, description) in rows {
        println!("  {:<22} {description}", command.yellow());
    }
}

fn print_translation_header(translation: &CommandTranslation) {
    let engine = translation
        .metadata
        .engine_used
        .map(|e| e.to_string())
        .unwrap_or_default();
    let cached = if translation.metadata.cache_hit {
        " cached"
    } else {
        ""
    };
    println!(
        "{}",
        format!(
            "confidence {:.2}, risk {:.1}, {engine}{cached}",
            translation.confidence, translation.risk_score
        )
        .dimmed()
    );
}

fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Ready {
            translation,
            command_line,
        } => {
            println!("{}", translation.explanation);
            println!("  {}", command_line.join(" ").bold().green());
            print_translation_header(translation);
        }
        PipelineOutcome::NeedsApproval {
            request,
            translation,
        } => {
            println!("{}", translation.explanation);
            println!("  {}", request.command.bold().yellow());
            println!(
                "{} {} review required (id {})",
                "approval:".yellow().bold(),
                request.review,
                request.id
            );
            for warning in &request.warnings {
                println!("  - {warning}");
            }
            println!(
                "  use {} or {}",
                format!(":approve {}", request.id).yellow(),
                format!(":deny {}", request.id).yellow()
            );
        }
        PipelineOutcome::Respond { translation } => {
            println!("{}", translation.explanation);
            for suggestion in &translation.suggestions {
                println!("  - {suggestion}");
            }
        }
        PipelineOutcome::Rejected { error, suggestions } => {
            eprintln!("{}: {error}", "rejected".red().bold());
            for suggestion in suggestions {
                eprintln!("  - {suggestion}");
            }
        }
    }
}

fn print_request(request: &ApprovalRequest) {
    println!("{request}");
}

fn print_error(error: &ParlanceError) {
    eprintln!("{}: {error}", "error".red());
    for hint in error.suggestions() {
        eprintln!("  {} {hint}", "hint:".yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_approval_commands() {
        assert_eq!(
            ShellCommand::parse("approve 1234"),
            Some(ShellCommand::Approve("1234".into()))
        );
        assert_eq!(
            ShellCommand::parse("deny 1234 not on a friday"),
            Some(ShellCommand::Deny {
                id: "1234".into(),
                reason: "not on a friday".into()
            })
        );
        assert_eq!(
            ShellCommand::parse("deny 1234"),
            Some(ShellCommand::Deny {
                id: "1234".into(),
                reason: "denied from shell".into()
            })
        );
    }

    #[test]
    fn arguments_are_required_where_needed() {
        assert_eq!(ShellCommand::parse("approve"), None);
        assert_eq!(ShellCommand::parse("deny "), None);
        assert_eq!(ShellCommand::parse("route"), None);
        assert_eq!(ShellCommand::parse("bogus"), None);
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(ShellCommand::parse("pending"), Some(ShellCommand::Pending));
        assert_eq!(ShellCommand::parse(" stats "), Some(ShellCommand::Stats));
        assert_eq!(ShellCommand::parse("q"), Some(ShellCommand::Quit));
        assert_eq!(
            ShellCommand::parse("route compare churn across segments"),
            Some(ShellCommand::Route("compare churn across segments".into()))
        );
    }

    #[test]
    fn malformed_id_reads_as_not_found() {
        assert!(matches!(
            parse_id("not-a-uuid"),
            Err(ParlanceError::ApprovalNotFound { .. })
        ));
    }

    #[test]
    fn shell_approves_a_parked_export() {
        let config = ParlanceConfig::default();
        let pipeline = parlance_translator::build_pipeline(&config).unwrap();
        let router = ModelRouter::new(&config.router).unwrap();
        let PipelineOutcome::NeedsApproval { request, .. } =
            pipeline.process("export ticket data as csv", &QueryContext::new())
        else {
            panic!("export should need approval");
        };
        run_command(
            &pipeline,
            &router,
            "tester",
            ShellCommand::Approve(request.id.to_string()),
        )
        .unwrap();
        assert_eq!(pipeline.approvals().stats().approved, 1);
    }
}
