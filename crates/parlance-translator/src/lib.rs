// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid natural-language translator and the guarded pipeline around it.
//!
//! The [`HybridTranslator`] walks the engine waterfall (cache, function
//! calling, retrieval, intent classification, clarification). The
//! [`GuardedPipeline`] wraps it with input validation, the command whitelist
//! and the approval policy:
//! - Validates the raw query before any engine sees it
//! - Whitelist-checks every executable command line
//! - Parks risky commands as approval requests
//! - Never executes anything

pub mod pipeline;
pub mod translator;

use std::sync::Arc;

use parlance_approval::HitlController;
use parlance_config::model::ParlanceConfig;
use parlance_core::ParlanceError;
use parlance_engines::{FunctionCallingEngine, FunctionCatalog, IntentClassifier, RagEngine};
use parlance_security::{CommandWhitelist, InputValidator};
use tracing::info;

pub use pipeline::{GuardedPipeline, PipelineOutcome};
pub use translator::{EngineTally, HybridTranslator, TranslatorStats};

/// Build the translator with the built-in catalog, the configured intents
/// and the configured cache.
pub fn build_translator(config: &ParlanceConfig) -> Result<HybridTranslator, ParlanceError> {
    let settings = &config.translator;
    let catalog = Arc::new(FunctionCatalog::builtin()?);

    let function_calling =
        FunctionCallingEngine::new(Arc::clone(&catalog), settings.function_match_threshold);
    let rag = RagEngine::new(
        Arc::clone(&catalog),
        settings.rag_min_relevance,
        settings.rag_top_k,
    )?;
    let intent = IntentClassifier::new(
        &config.intents,
        Arc::clone(&catalog),
        settings.intent_min_score,
        settings.clarify_suggestions.clone(),
    )?;

    let translator = HybridTranslator::new(
        Box::new(function_calling),
        Box::new(rag),
        Box::new(intent),
        settings,
    );
    let cache = parlance_cache::cache_from_config(&config.cache);
    info!(
        schemas = catalog.len(),
        intents = config.intents.len(),
        cache = cache.backend_name().unwrap_or("off"),
        "translator ready"
    );
    Ok(translator.with_cache(Arc::new(cache)))
}

/// Build the full guarded pipeline from configuration.
pub fn build_pipeline(config: &ParlanceConfig) -> Result<GuardedPipeline, ParlanceError> {
    Ok(GuardedPipeline::new(
        InputValidator::new(&config.validator)?,
        build_translator(config)?,
        CommandWhitelist::new(&config.whitelist)?,
        Arc::new(HitlController::new(&config.approval)?),
    ))
}
