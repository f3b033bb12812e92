use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams};
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::discovery::{self, ResourceInfo, ResourceRegistry};
use super::{ApiFilters, ClusterObject, ObjectSearch, SearchProvider, kubeconfig};
use crate::progress::ProgressHandle;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Client pool keyed by kubeconfig content and namespace
///
/// Requests carry their kubeconfig inline, so the same cluster is usually
/// asked for many times; clients (and their connection pools) are reused.
/// Objects are never cached here.
pub struct K8sClientPool {
    searches: RwLock<HashMap<(String, String), Arc<KubeSearch>>>,
    core_registry: Arc<ResourceRegistry>,
    progress: ProgressHandle,
}

impl K8sClientPool {
    pub fn new(progress: ProgressHandle) -> Self {
        Self {
            searches: RwLock::new(HashMap::new()),
            core_registry: Arc::new(discovery::build_core_registry()),
            progress,
        }
    }

    /// Get the progress reporter handle for subscribing to updates
    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Client for a kubeconfig, with `namespace` (if non-empty) as its default namespace
    pub async fn client(&self, kubeconfig: &str, namespace: &str) -> Result<Client> {
        Ok(self.get_or_create(kubeconfig, namespace).await?.client.clone())
    }

    async fn get_or_create(&self, content: &str, namespace: &str) -> Result<Arc<KubeSearch>> {
        let key = (content.to_string(), namespace.to_string());
        {
            let searches = self.searches.read().await;
            if let Some(search) = searches.get(&key) {
                return Ok(Arc::clone(search));
            }
        }

        let kubeconfig = kubeconfig::parse(content)?;
        let cluster = kubeconfig
            .current_context
            .clone()
            .unwrap_or_else(|| "default".to_string());

        self.progress.connecting(&cluster);
        let start = Instant::now();

        let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to load kubeconfig for context '{}'", cluster))?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);
        if !namespace.is_empty() {
            config.default_namespace = namespace.to_string();
        }
        let default_namespace = config.default_namespace.clone();

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", cluster))?;

        self.progress
            .connected(&cluster, start.elapsed().as_millis() as u64);

        let search = Arc::new(KubeSearch {
            client,
            cluster,
            namespace: default_namespace,
            core_registry: Arc::clone(&self.core_registry),
            discovered: RwLock::new(None),
            progress: self.progress.clone(),
        });

        let mut searches = self.searches.write().await;
        let search = searches.entry(key).or_insert(search);
        Ok(Arc::clone(search))
    }
}

#[async_trait]
impl SearchProvider for K8sClientPool {
    async fn search(&self, kubeconfig: &str, namespace: &str) -> Result<Arc<dyn ObjectSearch>> {
        let search: Arc<dyn ObjectSearch> = self.get_or_create(kubeconfig, namespace).await?;
        Ok(search)
    }
}

/// Dynamic-API object search for one cluster and default namespace
pub struct KubeSearch {
    client: Client,
    cluster: String,
    namespace: String,
    core_registry: Arc<ResourceRegistry>,
    /// Resources found by the discovery API, filled on the first non-core kind
    discovered: RwLock<Option<ResourceRegistry>>,
    progress: ProgressHandle,
}

impl KubeSearch {
    /// Resolve a kind token, falling back to cluster discovery for CRDs
    async fn resource_info(&self, kind: &str) -> Result<ResourceInfo> {
        if let Some(info) = self.core_registry.get(kind) {
            return Ok(info.clone());
        }

        {
            let discovered = self.discovered.read().await;
            if let Some(registry) = discovered.as_ref() {
                return registry
                    .get(kind)
                    .cloned()
                    .ok_or_else(|| anyhow!("Unknown resource kind: '{}'", kind));
            }
        }

        self.progress.discovering(&self.cluster);
        let registry = discovery::discover_resources(&self.client)
            .await
            .with_context(|| format!("Failed to discover resources on '{}'", self.cluster))?;
        debug!(
            cluster = %self.cluster,
            resources = registry.list().len(),
            "Discovered API resources"
        );
        let info = registry.get(kind).cloned();
        *self.discovered.write().await = Some(registry);

        info.ok_or_else(|| anyhow!("Unknown resource kind: '{}'", kind))
    }

    /// Fetch objects of a kind; `namespace: None` lists across all namespaces
    async fn fetch(
        &self,
        kind: &str,
        namespace: Option<&str>,
        api_filters: &ApiFilters,
    ) -> Result<Vec<ClusterObject>> {
        let resource_info = self.resource_info(kind).await?;
        let ar = &resource_info.api_resource;

        debug!(
            kind = %kind,
            cluster = %self.cluster,
            namespace = ?namespace,
            api_version = %resource_info.api_version(),
            "Fetching K8s resource"
        );

        let api: Api<DynamicObject> = match namespace {
            Some(ns) if resource_info.is_namespaced() => {
                Api::namespaced_with(self.client.clone(), ns, ar)
            }
            _ => Api::all_with(self.client.clone(), ar),
        };

        self.progress.listing(kind, namespace.unwrap_or_default());
        let start = Instant::now();

        let list_params = build_list_params(api_filters);
        let items = self.list_with_retry(&api, &list_params, kind).await?;

        let api_version = resource_info.api_version();
        let objects: Vec<ClusterObject> = items
            .into_iter()
            .map(|item| {
                let mut value = serde_json::to_value(item).unwrap_or(serde_json::Value::Null);
                // K8s list API doesn't include apiVersion/kind per item
                if let serde_json::Value::Object(ref mut map) = value {
                    map.insert(
                        "apiVersion".to_string(),
                        serde_json::Value::String(api_version.clone()),
                    );
                    map.insert(
                        "kind".to_string(),
                        serde_json::Value::String(ar.kind.clone()),
                    );
                }
                ClusterObject::new(value)
            })
            .collect();

        self.progress
            .listed(kind, objects.len(), start.elapsed().as_millis() as u64);

        Ok(objects)
    }

    fn scoped<'a>(&'a self, namespace: &'a str) -> &'a str {
        if namespace.is_empty() {
            &self.namespace
        } else {
            namespace
        }
    }

    /// List with pagination and retry logic, following continue tokens
    async fn list_with_retry(
        &self,
        api: &Api<DynamicObject>,
        base_params: &ListParams,
        kind: &str,
    ) -> Result<Vec<DynamicObject>> {
        let mut all_items: Vec<DynamicObject> = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = base_params.clone().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list = self.list_page_with_retry(api, &params, kind).await?;

            let items_count = list.items.len();
            all_items.extend(list.items);
            page_count += 1;

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    debug!(
                        kind = %kind,
                        cluster = %self.cluster,
                        page = page_count,
                        items_this_page = items_count,
                        total_so_far = all_items.len(),
                        "Fetched page, continuing"
                    );
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        Ok(all_items)
    }

    /// Fetch a single page with retry logic
    async fn list_page_with_retry(
        &self,
        api: &Api<DynamicObject>,
        params: &ListParams,
        kind: &str,
    ) -> Result<kube::api::ObjectList<DynamicObject>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match api.list(params).await {
                Ok(list) => return Ok(list),
                Err(e) => {
                    if is_retryable_error(&e) {
                        let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                        warn!(
                            kind = %kind,
                            cluster = %self.cluster,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Retryable error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(e);
                    } else {
                        debug!(
                            kind = %kind,
                            cluster = %self.cluster,
                            error = %e,
                            "Non-retryable error"
                        );
                        return Err(anyhow!("K8s API error: {}", e));
                    }
                }
            }
        }

        Err(anyhow!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        ))
    }
}

#[async_trait]
impl ObjectSearch for KubeSearch {
    async fn list_all(&self, kind: &str) -> Result<Vec<ClusterObject>> {
        self.fetch(kind, None, &ApiFilters::default()).await
    }

    async fn list_by_kind_and_namespace(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>> {
        let namespace = self.scoped(namespace);
        let objects = self
            .fetch(kind, Some(namespace), &ApiFilters::by_name(name))
            .await?;
        Ok(filter_by_name(objects, name))
    }

    async fn list_by_kind_name_app_namespace(
        &self,
        kind: &str,
        name: &str,
        app: &str,
        namespace: &str,
    ) -> Result<Vec<ClusterObject>> {
        let objects = self
            .list_by_kind_and_namespace(kind, name, namespace)
            .await?;
        Ok(objects.into_iter().filter(|o| o.belongs_to(app)).collect())
    }
}

/// Keep only objects named `name` (all of them for an empty name)
fn filter_by_name(objects: Vec<ClusterObject>, name: &str) -> Vec<ClusterObject> {
    if name.is_empty() {
        return objects;
    }
    objects.into_iter().filter(|o| o.name() == name).collect()
}

/// Check if an error is retryable (transient failures)
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        // Network/connection errors are retryable
        kube::Error::HyperError(_) => true,
        // API errors: retry on 429 (rate limit), 503 (unavailable), 504 (timeout)
        kube::Error::Api(api_err) => matches!(api_err.code, 429 | 503 | 504),
        _ => false,
    }
}

/// Build ListParams from API filters (field selectors)
fn build_list_params(filters: &ApiFilters) -> ListParams {
    let mut params = ListParams::default();

    if let Some(ref field_sel) = filters.field_selector {
        params = params.fields(field_sel);
    }

    trace!(field_selector = ?filters.field_selector, "Built ListParams");

    params
}
