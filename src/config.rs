// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration persistence for kinspect
//!
//! All kinspect data is stored under ~/.kinspect/:
//! - ~/.kinspect/config.json - user configuration
//! - ~/.kinspect/profiles/ - local service profiles
//! - ~/.kinspect/log/ - log files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::kubernetes::kubeconfig;

/// Default daemon port
pub const DEFAULT_DAEMON_PORT: u16 = 30125;

/// Get the base kinspect directory (~/.kinspect/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kinspect"))
        .context("Could not determine home directory")
}

fn default_daemon_port() -> u16 {
    DEFAULT_DAEMON_PORT
}

fn default_daemon_bind() -> String {
    "127.0.0.1".to_string()
}

/// kinspect configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig used when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
    /// Directory holding service profiles (default ~/.kinspect/profiles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,
    #[serde(default = "default_daemon_port")]
    pub daemon_port: u16,
    #[serde(default = "default_daemon_bind")]
    pub daemon_bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            profile_dir: None,
            daemon_port: default_daemon_port(),
            daemon_bind: default_daemon_bind(),
        }
    }
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the config file path (~/.kinspect/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }

    /// Directory of the local profile store
    pub fn profile_dir(&self) -> Result<PathBuf> {
        match &self.profile_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(base_dir()?.join("profiles")),
        }
    }

    /// Kubeconfig file to read: explicit path, then config, then the
    /// standard locations
    pub fn kubeconfig_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.kubeconfig {
            return Ok(path.clone());
        }
        kubeconfig::default_path()
    }

    /// Read the kubeconfig content that requests carry inline
    pub fn read_kubeconfig(&self, explicit: Option<&Path>) -> Result<String> {
        let path = self.kubeconfig_path(explicit)?;
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read kubeconfig: {}", path.display()))
    }
}
