// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Kubeconfig handling for requests that carry the kubeconfig content inline

use anyhow::{Context, Result, anyhow};
use kube::config::Kubeconfig;
use std::path::PathBuf;

/// Parse kubeconfig YAML content
pub fn parse(content: &str) -> Result<Kubeconfig> {
    if content.trim().is_empty() {
        return Err(anyhow!("Empty kubeconfig"));
    }
    Kubeconfig::from_yaml(content).context("Failed to parse kubeconfig")
}

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Namespace of the kubeconfig's current context
///
/// A context without a namespace uses `default`. Errors when the content
/// does not parse, or there is no current context or it is missing.
pub fn default_namespace(content: &str) -> Result<String> {
    let kubeconfig = parse(content)?;
    let current = kubeconfig
        .current_context
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow!("No current context in kubeconfig"))?;

    let context = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == current)
        .ok_or_else(|| anyhow!("Context '{}' not found in kubeconfig", current))?;

    Ok(context
        .context
        .as_ref()
        .and_then(|ctx| ctx.namespace.clone())
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()))
}

/// Locate the kubeconfig file to use when none is given explicitly:
/// `$KUBECONFIG` (first entry), then `~/.kube/config`
pub fn default_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("KUBECONFIG")
        .and_then(|paths| std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty()))
    {
        return Ok(path);
    }
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .context("Could not determine home directory")
}
