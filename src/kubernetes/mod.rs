// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cluster-facing collaborators of the aggregator
//!
//! The aggregator only sees the traits defined here. The kube-rs backed
//! implementations live in the submodules.

pub mod appmeta;
mod client;
pub mod discovery;
pub mod kubeconfig;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use appmeta::{ApplicationMeta, ApplicationRegistry, SecretApplicationRegistry};
pub use client::K8sClientPool;

/// Label/annotation marking an object as part of an application
pub const APPLICATION_LABEL: &str = "kinspect.dev/application";

/// Annotation Helm puts on every object of a release
pub const HELM_RELEASE_ANNOTATION: &str = "meta.helm.sh/release-name";

/// Parameters to push down to the Kubernetes API
#[derive(Debug, Clone, Default)]
pub struct ApiFilters {
    /// Field selector string (e.g., "metadata.name=nginx")
    pub field_selector: Option<String>,
}

impl ApiFilters {
    /// Filters selecting a single object by name (no-op for an empty name)
    pub fn by_name(name: &str) -> Self {
        Self {
            field_selector: (!name.is_empty()).then(|| format!("metadata.name={}", name)),
        }
    }
}

/// A cluster object as returned by the API, with `apiVersion` and `kind` set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterObject(serde_json::Value);

impl ClusterObject {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    fn metadata_str(&self, field: &str) -> Option<&str> {
        self.0.get("metadata")?.get(field)?.as_str()
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name").unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    pub fn kind(&self) -> &str {
        self.0
            .get("kind")
            .and_then(|k| k.as_str())
            .unwrap_or_default()
    }

    /// `metadata.creationTimestamp`, `None` when missing or not RFC 3339
    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.metadata_str("creationTimestamp")?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    fn metadata_map_value(&self, map: &str, key: &str) -> Option<&str> {
        self.0.get("metadata")?.get(map)?.get(key)?.as_str()
    }

    /// Whether the object carries the application label/annotation or the
    /// Helm release annotation for `app`
    pub fn belongs_to(&self, app: &str) -> bool {
        [
            self.metadata_map_value("labels", APPLICATION_LABEL),
            self.metadata_map_value("annotations", APPLICATION_LABEL),
            self.metadata_map_value("annotations", HELM_RELEASE_ANNOTATION),
        ]
        .into_iter()
        .flatten()
        .any(|value| value == app)
    }
}

/// Sort objects by creation timestamp, oldest first
///
/// Stable: objects with equal (or missing) timestamps keep their order.
/// Objects without a timestamp sort before all others.
pub fn sort_by_creation_timestamp(objects: &mut [ClusterObject]) {
    objects.sort_by_key(|obj| obj.creation_timestamp());
}

/// Read access to the objects of one cluster, scoped to a default namespace
///
/// An empty `namespace` argument means the namespace the handle was created for.
/// An empty `name` means "any name".
#[async_trait]
pub trait ObjectSearch: Send + Sync {
    /// All objects of a kind, across all namespaces for namespaced kinds
    async fn list_all(&self, kind: &str) -> Result<Vec<ClusterObject>>;

    async fn list_by_kind_and_namespace(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>>;

    async fn list_by_kind_name_app_namespace(
        &self,
        kind: &str,
        name: &str,
        app: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>>;
}

/// Produces [`ObjectSearch`] handles for a kubeconfig and namespace
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, kubeconfig: &str, namespace: &str) -> Result<Arc<dyn ObjectSearch>>;
}
