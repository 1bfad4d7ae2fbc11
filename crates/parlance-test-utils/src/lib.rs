// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parlance integration tests.
//!
//! Provides stub engines, stub embedding backends and a harness that
//! assembles the full guarded pipeline, so tests stay fast and deterministic.
//!
//! # Components
//!
//! - [`StubEngine`] - Engine that returns a pre-configured answer
//! - [`FailingEngine`] - Engine whose every call errors
//! - [`UnavailableEmbedder`] - Embedding backend that is always down
//! - [`TestHarness`] - Complete pipeline built from configuration

pub mod harness;
pub mod mock_embedder;
pub mod mock_engine;

pub use harness::TestHarness;
pub use mock_embedder::{FixedEmbedder, UnavailableEmbedder};
pub use mock_engine::{FailingEngine, StubEngine};
