// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security sandwich around translation.
//!
//! Validate the input, translate, whitelist-check the command line, then
//! apply the approval policy. Nothing is executed here.

use std::sync::Arc;

use parlance_approval::{ApprovalRequest, HitlController};
use parlance_core::{Action, CommandTranslation, ParlanceError, QueryContext};
use parlance_security::{CommandWhitelist, InputValidator, log_preview};
use tracing::{info, warn};

use crate::translator::HybridTranslator;

/// What the caller should do with a query.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Refused; show the error and the suggestions.
    Rejected {
        error: ParlanceError,
        suggestions: Vec<String>,
    },
    /// Parked until a human approves or denies `request`.
    NeedsApproval {
        request: ApprovalRequest,
        translation: CommandTranslation,
    },
    /// Safe to hand to the analytics CLI as-is.
    Ready {
        translation: CommandTranslation,
        command_line: Vec<String>,
    },
    /// A non-executing answer such as help.
    Respond { translation: CommandTranslation },
}

impl PipelineOutcome {
    fn rejected(error: ParlanceError) -> Self {
        let suggestions = error.suggestions();
        Self::Rejected { error, suggestions }
    }

    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "rejected",
            Self::NeedsApproval { .. } => "needs_approval",
            Self::Ready { .. } => "ready",
            Self::Respond { .. } => "respond",
        }
    }
}

/// Validator, translator, whitelist and approval controller in one place.
pub struct GuardedPipeline {
    validator: InputValidator,
    translator: HybridTranslator,
    whitelist: CommandWhitelist,
    approvals: Arc<HitlController>,
}

impl GuardedPipeline {
    pub fn new(
        validator: InputValidator,
        translator: HybridTranslator,
        whitelist: CommandWhitelist,
        approvals: Arc<HitlController>,
    ) -> Self {
        Self {
            validator,
            translator,
            whitelist,
            approvals,
        }
    }

    pub fn translator(&self) -> &HybridTranslator {
        &self.translator
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    pub fn whitelist(&self) -> &CommandWhitelist {
        &self.whitelist
    }

    pub fn approvals(&self) -> &Arc<HitlController> {
        &self.approvals
    }

    /// Run `query` through every check.
    pub fn process(&self, query: &str, ctx: &QueryContext) -> PipelineOutcome {
        let outcome = self.evaluate(query, ctx);
        metrics::counter!("parlance_pipeline_outcomes_total", "outcome" => outcome.label())
            .increment(1);
        outcome
    }

    fn evaluate(&self, query: &str, ctx: &QueryContext) -> PipelineOutcome {
        let validation = self.validator.validate(query);
        if let Some(error) = validation.to_error() {
            warn!(
                query = %log_preview(query),
                threat_level = %validation.threat_level,
                risk_score = validation.risk_score,
                "input rejected"
            );
            return PipelineOutcome::rejected(error);
        }

        let translation = self.translator.translate(&validation.sanitized_input, ctx);

        match translation.action {
            Action::ExecuteCommand => self.guard_command(translation),
            Action::ClarifyRequest => {
                let error = ParlanceError::LowConfidenceTranslation {
                    best_confidence: translation.confidence,
                };
                let suggestions = if translation.suggestions.is_empty() {
                    error.suggestions()
                } else {
                    translation.suggestions
                };
                PipelineOutcome::Rejected { error, suggestions }
            }
            _ => PipelineOutcome::Respond { translation },
        }
    }

    fn guard_command(&self, translation: CommandTranslation) -> PipelineOutcome {
        let Some(parts) = translation.command_line() else {
            return PipelineOutcome::rejected(ParlanceError::Internal(
                "executable translation without a command".to_string(),
            ));
        };

        let check = self.whitelist.validate_command(&parts);
        if let Some(error) = check.to_error() {
            warn!(command = %parts.join(" "), risk_level = %check.risk_level, "command rejected");
            return PipelineOutcome::rejected(error);
        }

        let command = check.sanitized_command.join(" ");
        let mut reasons =
            self.approvals
                .approval_reasons(&command, translation.risk_score, &check.warnings);
        if translation.confirmation_required {
            reasons.push("translation is marked dangerous".to_string());
        }
        if check.requires_confirmation {
            reasons.push(format!("whitelist risk is {}", check.risk_level));
        }

        if reasons.is_empty() {
            info!(command = %command, "command ready");
            return PipelineOutcome::Ready {
                translation,
                command_line: check.sanitized_command,
            };
        }

        let mut warnings = check.warnings;
        warnings.extend(reasons);
        let request =
            self.approvals
                .create_approval_request(command, translation.risk_score, warnings);
        PipelineOutcome::NeedsApproval {
            request,
            translation,
        }
    }
}
