// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration resolution (Configuration): compiled defaults, then system file, then
//! user file, then project file, then process environment — each layer overriding the last.
//! Missing files are skipped non-fatally; a present-but-malformed file is a startup error.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use pulse_core::NodeConfig;
use std::path::PathBuf;
use thiserror::Error;

const PROJECT_CONFIG_FILE: &str = "pulse.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/pulse/config.toml";
const ENV_PREFIX: &str = "PULSE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve configuration: {0}")]
    Figment(#[from] figment::Error),
}

/// User config path: `$XDG_CONFIG_HOME/pulse/config.toml` or the
/// platform equivalent via `dirs`. `None` if no config directory can be
/// determined for the current user (e.g. no `$HOME`).
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pulse").join("config.toml"))
}

/// Resolves `NodeConfig` from every layer. Each `Toml` provider silently contributes nothing
/// if its file is absent; this is `figment`'s own behavior for `Toml::file`, not special-cased
/// here.
pub fn load() -> Result<NodeConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(NodeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));

    if let Some(user_path) = user_config_path() {
        figment = figment.merge(Toml::file(user_path));
    }

    figment = figment
        .merge(Toml::file(PROJECT_CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    Ok(figment.extract()?)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
