// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Application metadata registry
//!
//! An application is a named group of objects deployed into one namespace.
//! Its metadata lives in the cluster as a Secret of type
//! `kinspect.dev/application` named `kinspect.application.<name>`, with the
//! data keys `application`, `type`, `state` and the optional `release` and
//! `config`.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use kube::api::ListParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::K8sClientPool;

/// Secret type marking application metadata
pub const APPLICATION_SECRET_TYPE: &str = "kinspect.dev/application";

/// Prefix of application metadata Secret names
pub const APPLICATION_SECRET_PREFIX: &str = "kinspect.application.";

/// Lifecycle state of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationState {
    Installing,
    Installed,
    Uninstalling,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ApplicationState {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "installing" => Self::Installing,
            "installed" => Self::Installed,
            "uninstalling" => Self::Uninstalling,
            _ => Self::Unknown,
        }
    }
}

/// Identity and state of an application deployed into a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMeta {
    pub application: String,
    pub namespace: String,
    #[serde(default)]
    pub application_type: String,
    #[serde(default)]
    pub application_state: ApplicationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_release_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl ApplicationMeta {
    pub fn new(application: &str, namespace: &str) -> Self {
        Self {
            application: application.to_string(),
            namespace: namespace.to_string(),
            application_type: String::new(),
            application_state: ApplicationState::Unknown,
            helm_release_name: None,
            config: None,
        }
    }

    /// Decode an application metadata Secret
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let secret_name = secret.metadata.name.as_deref().unwrap_or_default();
        let empty = BTreeMap::new();
        let data = secret.data.as_ref().unwrap_or(&empty);

        let field = |key: &str| -> Result<Option<String>> {
            data.get(key)
                .map(|bytes| {
                    String::from_utf8(bytes.0.clone())
                        .with_context(|| format!("Key '{}' of secret '{}' is not UTF-8", key, secret_name))
                })
                .transpose()
        };

        let application = match field("application")?.filter(|a| !a.is_empty()) {
            Some(name) => name,
            None => secret_name
                .strip_prefix(APPLICATION_SECRET_PREFIX)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .ok_or_else(|| anyhow!("Secret '{}' does not name an application", secret_name))?,
        };

        Ok(Self {
            application,
            namespace: secret.metadata.namespace.clone().unwrap_or_default(),
            application_type: field("type")?.unwrap_or_default(),
            application_state: field("state")?
                .map(|s| ApplicationState::parse(&s))
                .unwrap_or_default(),
            helm_release_name: field("release")?.filter(|r| !r.is_empty()),
            config: field("config")?.filter(|c| !c.is_empty()),
        })
    }
}

/// Name of the Secret holding an application's metadata
pub fn secret_name(application: &str) -> String {
    format!("{}{}", APPLICATION_SECRET_PREFIX, application)
}

/// Source of application metadata
///
/// Both calls are best-effort: failures are logged by the implementation
/// and surface as `None`.
#[async_trait]
pub trait ApplicationRegistry: Send + Sync {
    /// All applications in a namespace, `None` when they cannot be listed
    async fn list_metas(&self, namespace: &str, kubeconfig: &str) -> Option<Vec<ApplicationMeta>>;

    async fn get_meta(
        &self,
        namespace: &str,
        application: &str,
        kubeconfig: &str,
    ) -> Option<ApplicationMeta>;
}

/// Application registry reading metadata Secrets through the client pool
pub struct SecretApplicationRegistry {
    pool: Arc<K8sClientPool>,
}

impl SecretApplicationRegistry {
    pub fn new(pool: Arc<K8sClientPool>) -> Self {
        Self { pool }
    }

    async fn secrets(&self, namespace: &str, kubeconfig: &str) -> Result<Api<Secret>> {
        let client = self.pool.client(kubeconfig, namespace).await?;
        Ok(if namespace.is_empty() {
            Api::default_namespaced(client)
        } else {
            Api::namespaced(client, namespace)
        })
    }

    async fn try_list(&self, namespace: &str, kubeconfig: &str) -> Result<Vec<ApplicationMeta>> {
        let api = self.secrets(namespace, kubeconfig).await?;
        let params = ListParams::default().fields(&format!("type={}", APPLICATION_SECRET_TYPE));
        let secrets = api
            .list(&params)
            .await
            .with_context(|| format!("Failed to list application secrets in '{}'", namespace))?;

        Ok(secrets
            .items
            .iter()
            .filter_map(|secret| match ApplicationMeta::from_secret(secret) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!(namespace = %namespace, error = %e, "Skipping undecodable application secret");
                    None
                }
            })
            .collect())
    }

    async fn try_get(
        &self,
        namespace: &str,
        application: &str,
        kubeconfig: &str,
    ) -> Result<Option<ApplicationMeta>> {
        let api = self.secrets(namespace, kubeconfig).await?;
        let secret = api
            .get_opt(&secret_name(application))
            .await
            .with_context(|| format!("Failed to get application '{}'", application))?;
        secret.as_ref().map(ApplicationMeta::from_secret).transpose()
    }
}

#[async_trait]
impl ApplicationRegistry for SecretApplicationRegistry {
    async fn list_metas(&self, namespace: &str, kubeconfig: &str) -> Option<Vec<ApplicationMeta>> {
        match self.try_list(namespace, kubeconfig).await {
            Ok(metas) => {
                debug!(namespace = %namespace, count = metas.len(), "Listed applications");
                Some(metas)
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to list applications");
                None
            }
        }
    }

    async fn get_meta(
        &self,
        namespace: &str,
        application: &str,
        kubeconfig: &str,
    ) -> Option<ApplicationMeta> {
        self.try_get(namespace, application, kubeconfig)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    namespace = %namespace,
                    application = %application,
                    error = %e,
                    "Failed to get application"
                );
                None
            })
    }
}
