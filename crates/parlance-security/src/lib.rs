// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security controls around the translator.
//!
//! [`InputValidator`] screens raw queries before any engine sees them,
//! [`CommandWhitelist`] checks translated command lines before they are
//! handed to a runner, and [`redact`] keeps customer PII out of the logs.

pub mod redact;
pub mod validator;
pub mod whitelist;

pub use redact::{log_preview, redact};
pub use validator::{InputValidator, ValidationResult, sanitize};
pub use whitelist::{CommandWhitelist, WhitelistValidationResult};
