// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Local developer profiles
//!
//! Per-application service profiles are developer-only state that never
//! lives in the cluster. Each (namespace, application) pair has one
//! versioned document:
//! - <profile_dir>/<namespace>/<application>/profile.json
//!
//! Resolution is best-effort enrichment: every failure is logged and turns
//! into an empty profile map.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Profile document version this build understands
pub const PROFILE_VERSION: u32 = 2;

/// File name of a profile document inside its application directory
const PROFILE_FILE: &str = "profile.json";

/// Developer metadata for one service of an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProfile {
    pub name: String,
    #[serde(default)]
    pub service_type: String,
    /// Service is currently in development mode
    #[serde(default)]
    pub developing: bool,
    /// This machine owns the development session
    #[serde(default)]
    pub possess: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_image: Option<String>,
    /// Active port forwards as "local:remote"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_forwarded: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syncthing_status: Option<String>,
}

/// Persisted profile document of one application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub version: u32,
    /// Path of the kubeconfig the application was installed with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    /// Entries may be null in documents written by older tools
    #[serde(default)]
    pub svc_profile: Vec<Option<ServiceProfile>>,
}

/// Live description of an application built from its profile document
#[derive(Debug, Clone)]
pub struct AppDescription {
    pub namespace: String,
    pub application: String,
    pub kubeconfig: String,
    pub svc_profile: Vec<ServiceProfile>,
}

impl AppDescription {
    pub fn from_document(namespace: &str, application: &str, doc: ProfileDocument) -> Result<Self> {
        if doc.version != PROFILE_VERSION {
            return Err(anyhow!(
                "Unsupported profile version {} for application '{}' (expected {})",
                doc.version,
                application,
                PROFILE_VERSION
            ));
        }

        let kubeconfig = doc
            .kubeconfig
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("Profile of application '{}' has no kubeconfig", application))?;

        Ok(Self {
            namespace: namespace.to_string(),
            application: application.to_string(),
            kubeconfig,
            svc_profile: doc
                .svc_profile
                .into_iter()
                .flatten()
                .filter(|p| !p.name.is_empty())
                .collect(),
        })
    }

    /// Profiles keyed by service name; later duplicates win
    pub fn into_service_map(self) -> HashMap<String, ServiceProfile> {
        debug!(
            namespace = %self.namespace,
            application = %self.application,
            kubeconfig = %self.kubeconfig,
            services = self.svc_profile.len(),
            "Loaded application profile"
        );
        self.svc_profile
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect()
    }
}

/// Source of per-service profiles for the aggregator
pub trait ProfileResolver: Send + Sync {
    /// Service name → profile for one application; never fails, may be empty
    fn resolve(&self, namespace: &str, application: &str) -> HashMap<String, ServiceProfile>;
}

/// Profile store backed by JSON files on local disk
pub struct LocalProfileStore {
    root: PathBuf,
}

impl LocalProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, namespace: &str, application: &str) -> PathBuf {
        self.root
            .join(sanitize_component(namespace))
            .join(sanitize_component(application))
            .join(PROFILE_FILE)
    }

    /// Load the profile document, `Ok(None)` when none exists
    pub fn load(&self, namespace: &str, application: &str) -> Result<Option<ProfileDocument>> {
        let path = self.document_path(namespace, application);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let doc = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;
        Ok(Some(doc))
    }
}

impl ProfileResolver for LocalProfileStore {
    fn resolve(&self, namespace: &str, application: &str) -> HashMap<String, ServiceProfile> {
        if namespace.is_empty() || application.is_empty() {
            return HashMap::new();
        }

        let doc = match self.load(namespace, application) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                debug!(namespace = %namespace, application = %application, "No local profile");
                return HashMap::new();
            }
            Err(e) => {
                warn!(namespace = %namespace, application = %application, error = %e, "Failed to load profile");
                return HashMap::new();
            }
        };

        match AppDescription::from_document(namespace, application, doc) {
            Ok(description) => description.into_service_map(),
            Err(e) => {
                warn!(namespace = %namespace, application = %application, error = %e, "Failed to describe application");
                HashMap::new()
            }
        }
    }
}

/// Keep a path component inside its parent directory
fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace("..", "__")
}
