// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON rendering for the one-shot subcommands.

use std::process::ExitCode;

use parlance_core::ParlanceError;
use parlance_translator::PipelineOutcome;
use serde::Serialize;
use serde_json::json;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ParlanceError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ParlanceError::Internal(format!("failed to encode JSON: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Machine-readable form of a pipeline outcome.
pub fn outcome_json(outcome: &PipelineOutcome) -> serde_json::Value {
    match outcome {
        PipelineOutcome::Rejected { error, suggestions } => json!({
            "outcome": outcome.label(),
            "error": error.to_string(),
            "suggestions": suggestions,
        }),
        PipelineOutcome::NeedsApproval {
            request,
            translation,
        } => json!({
            "outcome": outcome.label(),
            "approval": request,
            "translation": translation,
        }),
        PipelineOutcome::Ready {
            translation,
            command_line,
        } => json!({
            "outcome": outcome.label(),
            "command_line": command_line,
            "translation": translation,
        }),
        PipelineOutcome::Respond { translation } => json!({
            "outcome": outcome.label(),
            "translation": translation,
        }),
    }
}

/// 0 for runnable or informational answers, 2 for rejections, 3 when a
/// human has to decide.
pub fn exit_code(outcome: &PipelineOutcome) -> ExitCode {
    match outcome {
        PipelineOutcome::Ready { .. } | PipelineOutcome::Respond { .. } => ExitCode::SUCCESS,
        PipelineOutcome::Rejected { .. } => ExitCode::from(2),
        PipelineOutcome::NeedsApproval { .. } => ExitCode::from(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_core::CommandTranslation;

    #[test]
    fn rejected_outcome_carries_error_text() {
        let outcome = PipelineOutcome::Rejected {
            error: ParlanceError::LowConfidenceTranslation {
                best_confidence: 0.1,
            },
            suggestions: vec!["try again".into()],
        };
        let value = outcome_json(&outcome);
        assert_eq!(value["outcome"], "rejected");
        assert!(value["error"].as_str().unwrap().contains("no confident translation"));
        assert_eq!(value["suggestions"][0], "try again");
    }

    #[test]
    fn ready_outcome_lists_the_command_line() {
        let translation = CommandTranslation::execute("nps-report", vec![], "nps", 0.9);
        let outcome = PipelineOutcome::Ready {
            translation,
            command_line: vec!["nps-report".into()],
        };
        let value = outcome_json(&outcome);
        assert_eq!(value["command_line"][0], "nps-report");
        assert_eq!(value["translation"]["action"], "EXECUTE_COMMAND");
    }
}
