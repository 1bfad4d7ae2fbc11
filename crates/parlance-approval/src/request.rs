// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Approval request records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use parlance_core::{ApprovalStatus, ParlanceError, RiskLevel};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Unique identifier for an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub Uuid);

impl ApprovalId {
    /// Create a new random approval id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApprovalId {
    type Err = ParlanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParlanceError::ApprovalNotFound { id: s.to_string() })
    }
}

/// How much scrutiny a request needs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewKind {
    /// Low risk; a policy may approve without a human.
    Automatic,
    /// Medium risk; a glance at the command line is enough.
    Quick,
    /// High or critical risk; review arguments and warnings in full.
    Detailed,
}

impl ReviewKind {
    pub fn for_risk(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Safe | RiskLevel::Low => ReviewKind::Automatic,
            RiskLevel::Medium => ReviewKind::Quick,
            RiskLevel::High | RiskLevel::Critical => ReviewKind::Detailed,
        }
    }
}

/// A command waiting for, or past, a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    /// The command line as it would run.
    pub command: String,
    pub risk_level: RiskLevel,
    pub risk_score: f32,
    pub review: ReviewKind,
    /// Whitelist and policy warnings shown to the reviewer.
    pub warnings: Vec<String>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub approver: Option<String>,
    /// Reason given when denied, or the expiry note.
    pub reason: Option<String>,
}

impl ApprovalRequest {
    /// Whether the request has been pending for longer than `timeout` at `now`.
    #[must_use]
    pub fn is_expired_at(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && now.signed_duration_since(self.created_at) > timeout
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} `{}` risk {:.1} ({} review, created {})",
            self.status,
            self.id,
            self.command,
            self.risk_score,
            self.review,
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Counts of requests by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalStats {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub expired: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_through_display() {
        let id = ApprovalId::new();
        let parsed: ApprovalId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn malformed_id_is_not_found() {
        let err = "not-a-uuid".parse::<ApprovalId>().unwrap_err();
        assert!(matches!(err, ParlanceError::ApprovalNotFound { id } if id == "not-a-uuid"));
    }

    #[test]
    fn review_kind_follows_risk() {
        assert_eq!(ReviewKind::for_risk(RiskLevel::Low), ReviewKind::Automatic);
        assert_eq!(ReviewKind::for_risk(RiskLevel::Medium), ReviewKind::Quick);
        assert_eq!(ReviewKind::for_risk(RiskLevel::Critical), ReviewKind::Detailed);
    }

    #[test]
    fn request_serializes_status_in_caps() {
        let request = ApprovalRequest {
            id: ApprovalId::new(),
            command: "export-data --include-pii".to_string(),
            risk_level: RiskLevel::High,
            risk_score: 6.0,
            review: ReviewKind::Detailed,
            warnings: vec![],
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            approver: None,
            reason: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["risk_level"], "high");
        assert_eq!(json["review"], "detailed");
    }
}
