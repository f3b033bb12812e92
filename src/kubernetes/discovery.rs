// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource kind resolution for Kubernetes clusters.
//!
//! Maps the plural kind tokens used in requests (and their aliases) to the
//! API resource definition needed for dynamic listing. Core resources come
//! from k8s-openapi types; anything else is looked up with the discovery API.

use anyhow::Result;
use kube::Client;
use kube::discovery::{ApiResource, Discovery, Scope};
use std::collections::HashMap;

/// Information about a listable Kubernetes resource
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    /// The API resource definition
    pub api_resource: ApiResource,
    pub scope: Scope,
    /// Plural lowercase name, the canonical kind token (e.g., "pods")
    pub plural: String,
    /// Aliases (e.g., "pod", "po")
    pub aliases: Vec<String>,
}

impl ResourceInfo {
    /// Check if this resource is namespace-scoped
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// Get the full API group/version string
    pub fn api_version(&self) -> String {
        if self.api_resource.group.is_empty() {
            self.api_resource.version.clone()
        } else {
            format!("{}/{}", self.api_resource.group, self.api_resource.version)
        }
    }
}

/// Registry of known resources for a cluster
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    /// Resources indexed by plural name
    by_plural: HashMap<String, ResourceInfo>,
    /// Alias to plural mapping
    alias_map: HashMap<String, String>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the registry
    /// The first resource registered under a plural name wins, so core
    /// resources added first are never shadowed by CRDs
    pub fn add(&mut self, info: ResourceInfo) {
        if self.by_plural.contains_key(&info.plural) {
            return;
        }

        for alias in &info.aliases {
            self.alias_map
                .entry(alias.clone())
                .or_insert_with(|| info.plural.clone());
        }
        self.alias_map
            .insert(info.plural.clone(), info.plural.clone());
        self.by_plural.insert(info.plural.clone(), info);
    }

    /// Look up a resource by plural name or alias (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&ResourceInfo> {
        let plural = self.alias_map.get(&name.to_lowercase())?;
        self.by_plural.get(plural)
    }

    /// List all resources, sorted by plural name
    pub fn list(&self) -> Vec<&ResourceInfo> {
        let mut resources: Vec<_> = self.by_plural.values().collect();
        resources.sort_by(|a, b| a.plural.cmp(&b.plural));
        resources
    }
}

/// Build a registry with the core resources using k8s-openapi types (no I/O)
///
/// Covers every kind of the display taxonomy plus namespaces and a few
/// commonly inspected extras.
pub fn build_core_registry() -> ResourceRegistry {
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        autoscaling::v2::HorizontalPodAutoscaler,
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolume,
            PersistentVolumeClaim, Pod, ResourceQuota, Secret, Service, ServiceAccount,
        },
        networking::v1::{Ingress, NetworkPolicy},
        policy::v1::PodDisruptionBudget,
        storage::v1::StorageClass,
    };

    let mut registry = ResourceRegistry::new();

    // Scope is given explicitly since the Resource trait's Scope is an associated type
    macro_rules! add_resource {
        ($type:ty, namespaced, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Namespaced, [$($alias),*])
        }};
        ($type:ty, cluster, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, Scope::Cluster, [$($alias),*])
        }};
        (@inner $type:ty, $scope:expr, [$($alias:expr),* $(,)?]) => {{
            let ar = ApiResource::erase::<$type>(&());
            registry.add(ResourceInfo {
                plural: ar.plural.clone(),
                api_resource: ar,
                scope: $scope,
                aliases: vec![$($alias.to_string()),*],
            });
        }};
    }

    // Workloads
    add_resource!(Deployment, namespaced, ["deployment", "deploy"]);
    add_resource!(StatefulSet, namespaced, ["statefulset", "sts"]);
    add_resource!(DaemonSet, namespaced, ["daemonset", "ds"]);
    add_resource!(Job, namespaced, ["job"]);
    add_resource!(CronJob, namespaced, ["cronjob", "cj"]);
    add_resource!(Pod, namespaced, ["pod", "po"]);
    add_resource!(ReplicaSet, namespaced, ["replicaset", "rs"]);

    // Networks
    add_resource!(Service, namespaced, ["service", "svc"]);
    add_resource!(Endpoints, namespaced, ["endpoint", "ep"]);
    add_resource!(Ingress, namespaced, ["ingress", "ing"]);
    add_resource!(NetworkPolicy, namespaced, ["networkpolicy", "netpol"]);

    // Configurations
    add_resource!(ConfigMap, namespaced, ["configmap", "cm"]);
    add_resource!(Secret, namespaced, ["secret"]);
    add_resource!(HorizontalPodAutoscaler, namespaced, ["horizontalpodautoscaler", "hpa"]);
    add_resource!(ResourceQuota, namespaced, ["resourcequota", "quota"]);
    add_resource!(PodDisruptionBudget, namespaced, ["poddisruptionbudget", "pdb"]);

    // Storages
    add_resource!(PersistentVolume, cluster, ["persistentvolume", "pv"]);
    add_resource!(PersistentVolumeClaim, namespaced, ["persistentvolumeclaim", "pvc"]);
    add_resource!(StorageClass, cluster, ["storageclass", "sc"]);

    // Other
    add_resource!(Namespace, cluster, ["namespace", "ns"]);
    add_resource!(Node, cluster, ["node", "no"]);
    add_resource!(Event, namespaced, ["event", "ev"]);
    add_resource!(ServiceAccount, namespaced, ["serviceaccount", "sa"]);

    registry
}

/// Discover all resources served by a cluster (including CRDs)
///
/// Used only when a requested kind is not a core resource; the discovery API
/// is slow on clusters with many API groups.
pub async fn discover_resources(client: &Client) -> Result<ResourceRegistry> {
    let mut registry = ResourceRegistry::new();

    let discovery = Discovery::new(client.clone()).run().await?;

    for group in discovery.groups() {
        for (ar, caps) in group.recommended_resources() {
            // Skip subresources (e.g., pods/log, pods/exec)
            if ar.plural.contains('/') {
                continue;
            }

            registry.add(ResourceInfo {
                plural: ar.plural.to_lowercase(),
                aliases: vec![ar.kind.to_lowercase()],
                scope: caps.scope.clone(),
                api_resource: ar,
            });
        }
    }

    Ok(registry)
}
