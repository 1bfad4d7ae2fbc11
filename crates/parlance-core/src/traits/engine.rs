// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching engine trait used by the translator waterfall.

use crate::error::ParlanceError;
use crate::stats::EngineStats;
use crate::types::{CommandTranslation, EngineKind, QueryContext};

/// A query-to-command matcher.
///
/// `Ok(None)` means the engine found nothing acceptable; `Err` means it failed
/// internally. Both let the translator move on to the next engine.
pub trait TranslationEngine: Send + Sync {
    /// Which waterfall stage this engine implements.
    fn kind(&self) -> EngineKind;

    /// Translate `query`, or decline.
    fn translate(
        &self,
        query: &str,
        ctx: &QueryContext,
    ) -> Result<Option<CommandTranslation>, ParlanceError>;

    /// Snapshot of the engine's running statistics.
    fn stats(&self) -> EngineStats;
}
