// Copyright 2025 Nodesweep Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persisted user settings: defaults that survive between invocations so common
//! flags do not have to be repeated.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Saved defaults, stored as JSON in the platform config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Node address commands operate on when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_address: Option<Address>,
    /// Content gateway for reward tree documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<Url>,
    /// Rolling estimate document URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_url: Option<Url>,
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "nodesweep")
            .context("could not determine a config directory for this platform")?;
        Ok(dirs.config_dir().join("settings.json"))
    }

    /// Load settings from `path`. A missing file is empty settings, not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings at {}", path.display()))
    }

    /// Load settings from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Write settings to `path`, creating parent directories as needed.
    pub fn store_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(self).context("failed to encode settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Write settings to the default location.
    pub fn store(&self) -> Result<()> {
        self.store_to(&Self::default_path()?)
    }

    /// Delete the settings file at `path`. Deleting a missing file succeeds.
    pub fn clear_at(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }

    /// Delete the settings file at the default location.
    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::default_path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn missing_file_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.node_address.is_none());
        assert!(settings.gateway_url.is_none());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");

        let settings = Settings {
            node_address: Some(address!("0x1111111111111111111111111111111111111111")),
            gateway_url: Some(Url::parse("https://ipfs.example/ipfs/").unwrap()),
            estimate_url: None,
        };
        settings.store_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.node_address, settings.node_address);
        assert_eq!(loaded.gateway_url, settings.gateway_url);
        assert!(loaded.estimate_url.is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().store_to(&path).unwrap();
        Settings::clear_at(&path).unwrap();
        Settings::clear_at(&path).unwrap();
        assert!(!path.exists());
    }
}
