// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parlance - natural-language front end for the analytics CLI.
//!
//! This is the binary entry point. It translates requests, screens inputs
//! and command lines, recommends models, and hosts the interactive shell.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod output;
mod shell;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use parlance_config::model::ParlanceConfig;
use parlance_core::{ParlanceError, QueryContext};
use parlance_engines::FunctionCatalog;
use parlance_router::ModelRouter;
use parlance_security::{CommandWhitelist, InputValidator};

/// Parlance - turn plain-language requests into vetted analytics commands.
#[derive(Parser, Debug)]
#[command(name = "parlance", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a request through validation, whitelist and approval policy.
    Translate {
        /// The request, e.g. "voice of customer for last week".
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Skip the security checks and print the raw translation.
        #[arg(long)]
        raw: bool,
        /// Resolve relative dates against this day (YYYY-MM-DD).
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
        /// Override a parameter, e.g. `--set segment=enterprise`.
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        values: Vec<(String, String)>,
    },
    /// Screen a text with the input validator.
    Validate {
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
    },
    /// Check a command line against the whitelist.
    Check {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Recommend a model for a request.
    Route {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Maximum spend for one call, in USD.
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Launch an interactive translation shell.
    Shell,
    /// Run diagnostic checks.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
    /// Print the function definitions of every supported command as JSON.
    Commands,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn load_config(path: Option<&PathBuf>) -> Option<ParlanceConfig> {
    let loaded = match path {
        Some(path) => parlance_config::load_and_validate_path(path),
        None => parlance_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            parlance_config::render_errors(&errors);
            None
        }
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` wins over the config level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parlance={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_ref()) else {
        return ExitCode::FAILURE;
    };
    init_tracing(&config.general.log_level);

    let result = match cli.command {
        Some(Commands::Translate {
            query,
            raw,
            date,
            values,
        }) => {
            let mut ctx = QueryContext::new();
            if let Some(date) = date {
                ctx = ctx.with_reference_date(date);
            }
            for (key, value) in values {
                ctx = ctx.with_value(key, value);
            }
            run_translate(&config, &query.join(" "), &ctx, raw)
        }
        Some(Commands::Validate { input }) => run_validate(&config, &input.join(" ")),
        Some(Commands::Check { command }) => run_check(&config, &command),
        Some(Commands::Route { query, budget }) => run_route(&config, &query.join(" "), budget),
        Some(Commands::Shell) => shell::run_shell(config).await,
        Some(Commands::Doctor { plain }) => {
            doctor::run_doctor(&config, cli.config.as_deref(), plain).await
        }
        Some(Commands::Config) => run_config(&config),
        Some(Commands::Commands) => run_commands(),
        None => {
            println!("parlance: use --help for available commands");
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {e}", "error".red());
            for hint in e.suggestions() {
                eprintln!("  {} {hint}", "hint:".yellow());
            }
            ExitCode::FAILURE
        }
    }
}

fn run_translate(
    config: &ParlanceConfig,
    query: &str,
    ctx: &QueryContext,
    raw: bool,
) -> Result<ExitCode, ParlanceError> {
    if raw {
        let translator = parlance_translator::build_translator(config)?;
        output::print_json(&translator.translate(query, ctx))?;
        return Ok(ExitCode::SUCCESS);
    }
    let pipeline = parlance_translator::build_pipeline(config)?;
    let outcome = pipeline.process(query, ctx);
    output::print_json(&output::outcome_json(&outcome))?;
    Ok(output::exit_code(&outcome))
}

fn run_validate(config: &ParlanceConfig, input: &str) -> Result<ExitCode, ParlanceError> {
    let result = InputValidator::new(&config.validator)?.validate(input);
    output::print_json(&result)?;
    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn run_check(config: &ParlanceConfig, command: &[String]) -> Result<ExitCode, ParlanceError> {
    let result = CommandWhitelist::new(&config.whitelist)?.validate_command(command);
    output::print_json(&result)?;
    Ok(if result.is_allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn run_route(
    config: &ParlanceConfig,
    query: &str,
    budget: Option<f64>,
) -> Result<ExitCode, ParlanceError> {
    let decision = ModelRouter::new(&config.router)?.select_model(query, budget)?;
    output::print_json(&decision)?;
    Ok(ExitCode::SUCCESS)
}

fn run_config(config: &ParlanceConfig) -> Result<ExitCode, ParlanceError> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| ParlanceError::Internal(format!("failed to render config: {e}")))?;
    print!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn run_commands() -> Result<ExitCode, ParlanceError> {
    let catalog = FunctionCatalog::builtin()?;
    output::print_json(&catalog.definitions())?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_translate_with_overrides() {
        let cli = Cli::try_parse_from([
            "parlance",
            "translate",
            "voc",
            "last",
            "week",
            "--set",
            "segment=enterprise",
            "--date",
            "2024-03-13",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Translate {
                query, values, date, ..
            }) => {
                assert_eq!(query.join(" "), "voc last week");
                assert_eq!(values, vec![("segment".into(), "enterprise".into())]);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 13));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn check_accepts_flags_as_arguments() {
        let cli = Cli::try_parse_from(["parlance", "check", "export-data", "--include-pii"]).unwrap();
        match cli.command {
            Some(Commands::Check { command }) => {
                assert_eq!(command, vec!["export-data", "--include-pii"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn key_value_parsing() {
        assert_eq!(
            parse_key_value("format = json").unwrap(),
            ("format".to_string(), "json".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = load_config(None).expect("default config should be valid");
        assert_eq!(config.general.log_level, "info");
    }
}
