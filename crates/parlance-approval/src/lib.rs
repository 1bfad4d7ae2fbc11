// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-in-the-loop approval for risky commands.
//!
//! A translated command that scores high, touches a sensitive keyword family,
//! or carries whitelist warnings is parked as a pending [`ApprovalRequest`]
//! until an operator approves or denies it, or until it expires.

pub mod controller;
pub mod request;

pub use controller::HitlController;
pub use request::{ApprovalId, ApprovalRequest, ApprovalStats, ReviewKind};
