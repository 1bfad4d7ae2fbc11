// SPDX-FileCopyrightText: 2026 Parlance Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./parlance.toml` > `~/.config/parlance/parlance.toml` > `/etc/parlance/parlance.toml`
//! with environment variable overrides via `PARLANCE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ParlanceConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/parlance/parlance.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "parlance.toml";

/// Per-user configuration file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("parlance/parlance.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parlance/parlance.toml` (system-wide)
/// 3. `~/.config/parlance/parlance.toml` (user XDG config)
/// 4. `./parlance.toml` (local directory)
/// 5. `PARLANCE_*` environment variables
pub fn load_config() -> Result<ParlanceConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ParlanceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlanceConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParlanceConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParlanceConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParlanceConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config key.
///
/// Only the section prefix is rewritten, so `cache_similarity_threshold`
/// becomes `cache.similarity_threshold` rather than `cache.similarity.threshold`.
pub fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 7] = [
        "general",
        "validator",
        "whitelist",
        "approval",
        "cache",
        "router",
        "translator",
    ];
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
fn env_provider() -> Env {
    Env::prefixed("PARLANCE_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_on_section() {
        assert_eq!(
            map_env_key("cache_similarity_threshold"),
            "cache.similarity_threshold"
        );
        assert_eq!(map_env_key("general_log_level"), "general.log_level");
        assert_eq!(map_env_key("router_force_model"), "router.force_model");
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }
}
