// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde::{Deserialize, Serialize};

/// A resource inspection request
///
/// Empty strings mean "not given".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRequest {
    /// Kubeconfig content (YAML), not a path
    pub kube_config: String,
    pub namespace: String,
    pub app_name: String,
    /// Dispatch token: "all", "app"/"application", or a plural kind
    pub resource: String,
    pub resource_name: String,
}

/// What a request asks for, derived from its `resource` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// Every application tree of a namespace (or of every namespace)
    All,
    /// Application metadata
    Application,
    /// Flat query for one resource kind
    Generic(String),
}

impl ResourceKind {
    pub fn classify(token: &str) -> Self {
        match token {
            "all" => Self::All,
            "app" | "application" => Self::Application,
            other => Self::Generic(other.to_string()),
        }
    }
}

impl ResourceRequest {
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::classify(&self.resource)
    }
}
