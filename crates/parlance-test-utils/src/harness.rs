// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles the complete guarded pipeline (validator,
//! translator with its built-in engines and cache, whitelist, approval
//! controller) from a configuration, and pins the reference date so
//! relative date phrases resolve deterministically.

use std::io::Write;

use chrono::NaiveDate;
use parlance_config::model::ParlanceConfig;
use parlance_core::{CommandTranslation, ParlanceError, QueryContext};
use parlance_translator::{GuardedPipeline, PipelineOutcome, build_pipeline};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: ParlanceConfig,
    reference_date: Option<NaiveDate>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: ParlanceConfig::default(),
            reference_date: None,
        }
    }

    /// Start from a specific configuration.
    pub fn with_config(mut self, config: ParlanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from TOML through a temporary file, exercising
    /// the same loader and validation the binary uses.
    pub fn with_toml(mut self, toml: &str) -> Result<Self, ParlanceError> {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .map_err(|e| ParlanceError::Internal(format!("temp config: {e}")))?;
        file.write_all(toml.as_bytes())
            .map_err(|e| ParlanceError::Internal(format!("temp config: {e}")))?;
        self.config = parlance_config::load_and_validate_path(file.path()).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            ParlanceError::Config(messages.join("; "))
        })?;
        Ok(self)
    }

    /// Turn the semantic cache off.
    pub fn without_cache(mut self) -> Self {
        self.config.cache.enabled = false;
        self
    }

    /// Resolve relative dates against `date` instead of today.
    ///
    /// A pinned date also bypasses the cache.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub fn build(self) -> Result<TestHarness, ParlanceError> {
        let pipeline = build_pipeline(&self.config)?;
        tracing::debug!(reference_date = ?self.reference_date, "test harness ready");
        Ok(TestHarness {
            pipeline,
            config: self.config,
            reference_date: self.reference_date,
        })
    }
}

/// A complete pipeline for end-to-end tests.
pub struct TestHarness {
    pipeline: GuardedPipeline,
    config: ParlanceConfig,
    reference_date: Option<NaiveDate>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness over the default configuration.
    pub fn new() -> Result<Self, ParlanceError> {
        Self::builder().build()
    }

    pub fn pipeline(&self) -> &GuardedPipeline {
        &self.pipeline
    }

    pub fn config(&self) -> &ParlanceConfig {
        &self.config
    }

    /// The context every call uses.
    pub fn context(&self) -> QueryContext {
        match self.reference_date {
            Some(date) => QueryContext::new().with_reference_date(date),
            None => QueryContext::new(),
        }
    }

    /// Translate without the security checks.
    pub fn translate(&self, query: &str) -> CommandTranslation {
        self.pipeline.translator().translate(query, &self.context())
    }

    /// Run the full guarded pipeline.
    pub fn process(&self, query: &str) -> PipelineOutcome {
        self.pipeline.process(query, &self.context())
    }
}
