// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The approval state machine.
//!
//! `PENDING -> {APPROVED, DENIED, EXPIRED}`, each request resolving exactly
//! once. Pending requests live in a map keyed by id; resolved ones move to an
//! append-only history. Both sit behind one mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use parlance_config::model::ApprovalConfig;
use parlance_core::{ApprovalStatus, ParlanceError, RiskLevel};
use regex::Regex;
use tracing::{debug, info};

use crate::request::{ApprovalId, ApprovalRequest, ApprovalStats, ReviewKind};

/// A named set of sensitive keywords compiled into one word-boundary regex.
struct KeywordFamily {
    name: &'static str,
    regex: Option<Regex>,
}

impl KeywordFamily {
    fn compile(name: &'static str, keywords: &[String]) -> Result<Self, ParlanceError> {
        let alternation: Vec<String> = keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| regex::escape(k.trim()))
            .collect();
        if alternation.is_empty() {
            return Ok(Self { name, regex: None });
        }
        let regex = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation.join("|")))
            .map_err(|e| ParlanceError::Config(format!("invalid {name} keywords: {e}")))?;
        Ok(Self {
            name,
            regex: Some(regex),
        })
    }

    fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex.as_ref()?.find(text).map(|m| m.as_str())
    }
}

#[derive(Default)]
struct State {
    pending: HashMap<ApprovalId, ApprovalRequest>,
    history: Vec<ApprovalRequest>,
}

impl State {
    /// Move `id` out of the pending map into history with a terminal status.
    fn finish(
        &mut self,
        id: &ApprovalId,
        status: ApprovalStatus,
        now: DateTime<Utc>,
        approver: Option<String>,
        reason: Option<String>,
    ) -> Option<ApprovalRequest> {
        let mut request = self.pending.remove(id)?;
        request.status = status;
        request.resolved_at = Some(now);
        request.approver = approver;
        request.reason = reason;
        self.history.push(request.clone());
        Some(request)
    }
}

/// Decides which commands need a human and tracks the resulting requests.
pub struct HitlController {
    auto_threshold: f32,
    quick_threshold: f32,
    detailed_threshold: f32,
    timeout: Duration,
    families: Vec<KeywordFamily>,
    state: Mutex<State>,
}

impl HitlController {
    pub fn new(config: &ApprovalConfig) -> Result<Self, ParlanceError> {
        let timeout = i64::try_from(config.timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                ParlanceError::Config(format!(
                    "approval.timeout_secs {} is out of range",
                    config.timeout_secs
                ))
            })?;
        Ok(Self {
            auto_threshold: config.auto_threshold,
            quick_threshold: config.quick_threshold,
            detailed_threshold: config.detailed_threshold,
            timeout,
            families: vec![
                KeywordFamily::compile("destructive", &config.destructive_keywords)?,
                KeywordFamily::compile("system-modifying", &config.system_keywords)?,
                KeywordFamily::compile("network", &config.network_keywords)?,
                KeywordFamily::compile("file-modifying", &config.file_keywords)?,
            ],
            state: Mutex::new(State::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Why `command` needs approval; empty when it does not.
    pub fn approval_reasons(&self, command: &str, risk_score: f32, warnings: &[String]) -> Vec<String> {
        let mut reasons = Vec::new();
        if risk_score >= self.detailed_threshold {
            reasons.push(format!(
                "risk score {risk_score:.1} is at or above {:.1}",
                self.detailed_threshold
            ));
        }
        for family in &self.families {
            if let Some(word) = family.find(command) {
                reasons.push(format!("{} keyword `{word}`", family.name));
            }
        }
        if !warnings.is_empty() {
            reasons.push(format!("{} whitelist warning(s)", warnings.len()));
        }
        reasons
    }

    /// Whether `command` must wait for a human decision.
    pub fn should_require_approval(&self, command: &str, risk_score: f32, warnings: &[String]) -> bool {
        !self.approval_reasons(command, risk_score, warnings).is_empty()
    }

    /// Risk level for a score using the auto/quick/detailed thresholds.
    pub fn risk_level_for(&self, risk_score: f32) -> RiskLevel {
        if risk_score < self.auto_threshold {
            RiskLevel::Low
        } else if risk_score < self.quick_threshold {
            RiskLevel::Medium
        } else if risk_score < self.detailed_threshold {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    /// Park `command` as a new pending request.
    pub fn create_approval_request(
        &self,
        command: impl Into<String>,
        risk_score: f32,
        warnings: Vec<String>,
    ) -> ApprovalRequest {
        self.create_approval_request_at(command, risk_score, warnings, Utc::now())
    }

    /// [`create_approval_request`](Self::create_approval_request) with an explicit clock.
    pub fn create_approval_request_at(
        &self,
        command: impl Into<String>,
        risk_score: f32,
        warnings: Vec<String>,
        now: DateTime<Utc>,
    ) -> ApprovalRequest {
        let risk_level = self.risk_level_for(risk_score);
        let request = ApprovalRequest {
            id: ApprovalId::new(),
            command: command.into(),
            risk_level,
            risk_score,
            review: ReviewKind::for_risk(risk_level),
            warnings,
            status: ApprovalStatus::Pending,
            created_at: now,
            resolved_at: None,
            approver: None,
            reason: None,
        };
        self.state().pending.insert(request.id, request.clone());

        metrics::counter!("parlance_approvals_created_total", "risk_level" => risk_level.to_string())
            .increment(1);
        info!(
            id = %request.id,
            command = %request.command,
            risk_level = %risk_level,
            review = %request.review,
            "approval requested"
        );
        request
    }

    /// Approve a pending request.
    pub fn approve(&self, id: &ApprovalId, approver: &str) -> Result<ApprovalRequest, ParlanceError> {
        self.approve_at(id, approver, Utc::now())
    }

    /// [`approve`](Self::approve) with an explicit clock.
    pub fn approve_at(
        &self,
        id: &ApprovalId,
        approver: &str,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest, ParlanceError> {
        self.resolve(id, ApprovalStatus::Approved, now, Some(approver.to_string()), None)
    }

    /// Deny a pending request.
    pub fn deny(&self, id: &ApprovalId, reason: &str) -> Result<ApprovalRequest, ParlanceError> {
        self.deny_at(id, reason, Utc::now())
    }

    /// [`deny`](Self::deny) with an explicit clock.
    pub fn deny_at(
        &self,
        id: &ApprovalId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRequest, ParlanceError> {
        self.resolve(id, ApprovalStatus::Denied, now, None, Some(reason.to_string()))
    }

    fn resolve(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        now: DateTime<Utc>,
        approver: Option<String>,
        reason: Option<String>,
    ) -> Result<ApprovalRequest, ParlanceError> {
        let mut state = self.state();

        let Some(request) = state.pending.get(id) else {
            return Err(match state.history.iter().find(|r| r.id == *id) {
                Some(done) => ParlanceError::ApprovalResolved {
                    id: id.to_string(),
                    status: done.status,
                },
                None => ParlanceError::ApprovalNotFound { id: id.to_string() },
            });
        };

        if request.is_expired_at(self.timeout, now) {
            state.finish(
                id,
                ApprovalStatus::Expired,
                now,
                None,
                Some("timed out before a decision".to_string()),
            );
            drop(state);
            metrics::counter!("parlance_approvals_resolved_total", "status" => "EXPIRED")
                .increment(1);
            info!(%id, "approval request expired on resolution attempt");
            return Err(ParlanceError::ApprovalExpired { id: id.to_string() });
        }

        let resolved = state
            .finish(id, status, now, approver, reason)
            .ok_or_else(|| ParlanceError::ApprovalNotFound { id: id.to_string() })?;
        drop(state);

        metrics::counter!("parlance_approvals_resolved_total", "status" => status.to_string())
            .increment(1);
        info!(
            %id,
            status = %status,
            approver = resolved.approver.as_deref().unwrap_or("-"),
            "approval request resolved"
        );
        Ok(resolved)
    }

    /// Expire every pending request older than the timeout, returning the count.
    pub fn cleanup_expired_requests(&self) -> usize {
        self.cleanup_expired_requests_at(Utc::now())
    }

    /// [`cleanup_expired_requests`](Self::cleanup_expired_requests) with an explicit clock.
    pub fn cleanup_expired_requests_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state();
        let expired: Vec<ApprovalId> = state
            .pending
            .values()
            .filter(|r| r.is_expired_at(self.timeout, now))
            .map(|r| r.id)
            .collect();
        for id in &expired {
            state.finish(
                id,
                ApprovalStatus::Expired,
                now,
                None,
                Some("timed out before a decision".to_string()),
            );
        }
        drop(state);

        if !expired.is_empty() {
            metrics::counter!("parlance_approvals_resolved_total", "status" => "EXPIRED")
                .increment(expired.len() as u64);
            info!(count = expired.len(), "expired stale approval requests");
        } else {
            debug!("no approval requests to expire");
        }
        expired.len()
    }

    /// Look up a request by id in either the pending map or history.
    pub fn get_request(&self, id: &ApprovalId) -> Option<ApprovalRequest> {
        let state = self.state();
        state
            .pending
            .get(id)
            .cloned()
            .or_else(|| state.history.iter().find(|r| r.id == *id).cloned())
    }

    /// Pending requests, oldest first.
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let mut pending: Vec<_> = self.state().pending.values().cloned().collect();
        pending.sort_by_key(|r| r.created_at);
        pending
    }

    /// Resolved requests in resolution order.
    pub fn history(&self) -> Vec<ApprovalRequest> {
        self.state().history.clone()
    }

    pub fn stats(&self) -> ApprovalStats {
        let state = self.state();
        let mut stats = ApprovalStats {
            pending: state.pending.len(),
            ..ApprovalStats::default()
        };
        for request in &state.history {
            match request.status {
                ApprovalStatus::Approved => stats.approved += 1,
                ApprovalStatus::Denied => stats.denied += 1,
                ApprovalStatus::Expired => stats.expired += 1,
                ApprovalStatus::Pending => {}
            }
        }
        stats
    }
}
