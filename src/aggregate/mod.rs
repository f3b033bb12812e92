// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Resource aggregation
//!
//! Turns one [`ResourceRequest`] into one [`Response`] by combining three
//! sources: the cluster object search, the application registry and the
//! local profile store. Only the search handle is required; every other
//! failure degrades the response instead of failing it.

pub mod request;
pub mod response;
pub mod taxonomy;

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

pub use request::{ResourceKind, ResourceRequest};
pub use response::{App, Group, Item, NamespaceTree, Resource, Response};

use crate::kubernetes::{
    ApplicationRegistry, ClusterObject, ObjectSearch, SearchProvider, kubeconfig,
    sort_by_creation_timestamp,
};
use crate::profile::{ProfileResolver, ServiceProfile};
use taxonomy::RESOURCE_GROUPS;

/// Outcome of a flat resource query before it is collapsed for the wire
#[derive(Debug)]
enum FlatQuery {
    Items(Vec<Item>),
    Item(Item),
    /// The query succeeded but matched nothing
    Empty,
    Failed(anyhow::Error),
}

impl FlatQuery {
    /// Empty and failed queries both become `None`
    fn into_response(self, kind: &str, namespace: &str) -> Option<Response> {
        match self {
            FlatQuery::Items(items) => Some(Response::Items(items)),
            FlatQuery::Item(item) => Some(Response::Item(item)),
            FlatQuery::Empty => {
                debug!(kind = %kind, namespace = %namespace, "No matching objects");
                None
            }
            FlatQuery::Failed(e) => {
                warn!(kind = %kind, namespace = %namespace, error = %e, "Resource query failed");
                None
            }
        }
    }
}

pub struct ResourceAggregator {
    searches: Arc<dyn SearchProvider>,
    registry: Arc<dyn ApplicationRegistry>,
    profiles: Arc<dyn ProfileResolver>,
}

impl ResourceAggregator {
    pub fn new(
        searches: Arc<dyn SearchProvider>,
        registry: Arc<dyn ApplicationRegistry>,
        profiles: Arc<dyn ProfileResolver>,
    ) -> Self {
        Self {
            searches,
            registry,
            profiles,
        }
    }

    /// Answer one request; `None` means "no data" (including failures)
    pub async fn aggregate(&self, request: &ResourceRequest) -> Option<Response> {
        let derived_namespace = if request.namespace.is_empty() {
            kubeconfig::default_namespace(&request.kube_config).unwrap_or_else(|e| {
                debug!(error = %e, "No default namespace in kubeconfig");
                String::new()
            })
        } else {
            String::new()
        };
        let namespace = if request.namespace.is_empty() {
            derived_namespace.as_str()
        } else {
            request.namespace.as_str()
        };

        let search = match self.searches.search(&request.kube_config, namespace).await {
            Ok(search) => search,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to connect to cluster");
                return None;
            }
        };

        let kind = request.kind();
        let response = match &kind {
            ResourceKind::All => Some(self.all(request, namespace, search.as_ref()).await),
            ResourceKind::Application => self.applications(request, namespace).await,
            ResourceKind::Generic(kind) => self
                .flat_query(kind, request, namespace, search.as_ref())
                .await
                .into_response(kind, namespace),
        };

        info!(
            resource = %request.resource,
            namespace = %namespace,
            shape = response.as_ref().map(|r| r.shape()).unwrap_or("none"),
            "Aggregated request"
        );
        response
    }

    /// Application trees of every namespace, or of the request's namespace
    async fn all(
        &self,
        request: &ResourceRequest,
        namespace: &str,
        search: &dyn ObjectSearch,
    ) -> Response {
        if request.namespace.is_empty() {
            match search.list_all("namespaces").await {
                Ok(namespaces) if !namespaces.is_empty() => {
                    let mut trees = Vec::with_capacity(namespaces.len());
                    for ns in &namespaces {
                        trees.push(
                            self.namespace_tree(ns.name(), &request.kube_config, search)
                                .await,
                        );
                    }
                    return Response::Trees(trees);
                }
                Ok(_) => {
                    debug!(namespace = %namespace, "No namespaces listed, using default namespace");
                }
                Err(e) => {
                    warn!(namespace = %namespace, error = %e, "Cannot list namespaces, using default namespace");
                }
            }
        }

        Response::Tree(
            self.namespace_tree(namespace, &request.kube_config, search)
                .await,
        )
    }

    async fn applications(&self, request: &ResourceRequest, namespace: &str) -> Option<Response> {
        if request.resource_name.is_empty() {
            let mut metas = self
                .registry
                .list_metas(namespace, &request.kube_config)
                .await?;
            // Stable: equal names keep registry order
            metas.sort_by(|a, b| a.application.cmp(&b.application));
            Some(Response::Applications(metas))
        } else {
            self.registry
                .get_meta(namespace, &request.resource_name, &request.kube_config)
                .await
                .map(Response::Application)
        }
    }

    /// All application trees of one namespace
    async fn namespace_tree(
        &self,
        namespace: &str,
        kubeconfig: &str,
        search: &dyn ObjectSearch,
    ) -> NamespaceTree {
        let metas = self
            .registry
            .list_metas(namespace, kubeconfig)
            .await
            .unwrap_or_default();

        let mut applications = Vec::with_capacity(metas.len());
        for meta in &metas {
            applications.push(self.app(namespace, &meta.application, search).await);
        }

        NamespaceTree {
            namespace: namespace.to_string(),
            applications,
        }
    }

    /// One application: all four groups, one entry per kind that could be listed
    async fn app(&self, namespace: &str, application: &str, search: &dyn ObjectSearch) -> App {
        let profiles = self.profiles.resolve(namespace, application);

        // Results come back in taxonomy order regardless of completion order
        let queries = taxonomy::all_kinds()
            .map(|kind| search.list_by_kind_and_namespace(kind, "", namespace));
        let mut results = join_all(queries).await.into_iter();

        let mut groups = Vec::with_capacity(RESOURCE_GROUPS.len());
        for group in RESOURCE_GROUPS {
            let mut resources = Vec::with_capacity(group.kinds.len());
            for kind in group.kinds {
                match results.next() {
                    Some(Ok(objects)) => resources.push(Resource {
                        name: kind.to_string(),
                        items: to_items(objects, &profiles),
                    }),
                    Some(Err(e)) => {
                        debug!(
                            namespace = %namespace,
                            application = %application,
                            kind = %kind,
                            error = %e,
                            "Omitting resource kind"
                        );
                    }
                    None => {}
                }
            }
            groups.push(Group {
                name: group.name.to_string(),
                resources,
            });
        }

        App {
            name: application.to_string(),
            groups,
        }
    }

    async fn flat_query(
        &self,
        kind: &str,
        request: &ResourceRequest,
        namespace: &str,
        search: &dyn ObjectSearch,
    ) -> FlatQuery {
        // Profiles are keyed by service name, which matches the workload
        // name the caller puts in resource_name
        let profiles = self.profiles.resolve(namespace, &request.resource_name);

        let result = if request.app_name.is_empty() {
            search
                .list_by_kind_and_namespace(kind, &request.resource_name, namespace)
                .await
        } else {
            search
                .list_by_kind_name_app_namespace(
                    kind,
                    &request.resource_name,
                    &request.app_name,
                    namespace,
                )
                .await
        };

        let mut objects = match result {
            Ok(objects) if objects.is_empty() => return FlatQuery::Empty,
            Ok(objects) => objects,
            Err(e) => return FlatQuery::Failed(e),
        };

        if request.resource_name.is_empty() {
            sort_by_creation_timestamp(&mut objects);
            FlatQuery::Items(to_items(objects, &profiles))
        } else {
            let first = objects.swap_remove(0);
            let description = profiles.get(first.name()).cloned();
            FlatQuery::Item(Item {
                metadata: first,
                description,
            })
        }
    }
}

fn to_items(objects: Vec<ClusterObject>, profiles: &HashMap<String, ServiceProfile>) -> Vec<Item> {
    objects
        .into_iter()
        .map(|obj| {
            let description = profiles.get(obj.name()).cloned();
            Item {
                metadata: obj,
                description,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::{APPLICATION_LABEL, ApplicationMeta};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
users:
- name: me
  user:
    token: abc
contexts:
- name: dev
  context:
    cluster: local
    user: me
    namespace: team-a
"#;

    fn object(kind: &str, name: &str, namespace: &str, created: &str) -> ClusterObject {
        ClusterObject::new(json!({
            "kind": kind,
            "metadata": {
                "name": name,
                "namespace": namespace,
                "creationTimestamp": created,
            }
        }))
    }

    fn app_object(kind: &str, name: &str, namespace: &str, app: &str) -> ClusterObject {
        ClusterObject::new(json!({
            "kind": kind,
            "metadata": {
                "name": name,
                "namespace": namespace,
                "creationTimestamp": "2024-01-01T00:00:00Z",
                "labels": {APPLICATION_LABEL: app},
            }
        }))
    }

    #[derive(Default)]
    struct FakeSearch {
        /// kind → objects
        objects: HashMap<String, Vec<ClusterObject>>,
        failing_kinds: HashSet<String>,
        namespaces: Option<Vec<ClusterObject>>,
    }

    impl FakeSearch {
        fn with(mut self, kind: &str, objects: Vec<ClusterObject>) -> Self {
            self.objects.insert(kind.to_string(), objects);
            self
        }

        fn failing(mut self, kind: &str) -> Self {
            self.failing_kinds.insert(kind.to_string());
            self
        }

        fn with_namespaces(mut self, names: &[&str]) -> Self {
            self.namespaces = Some(
                names
                    .iter()
                    .map(|n| ClusterObject::new(json!({"kind": "Namespace", "metadata": {"name": n}})))
                    .collect(),
            );
            self
        }
    }

    #[async_trait]
    impl ObjectSearch for FakeSearch {
        async fn list_all(&self, kind: &str) -> Result<Vec<ClusterObject>> {
            if kind == "namespaces" {
                return self
                    .namespaces
                    .clone()
                    .ok_or_else(|| anyhow!("namespaces are forbidden"));
            }
            Ok(self.objects.get(kind).cloned().unwrap_or_default())
        }

        async fn list_by_kind_and_namespace(
            &self,
            kind: &str,
            name: &str,
            namespace: &str,
        ) -> Result<Vec<ClusterObject>> {
            if self.failing_kinds.contains(kind) {
                return Err(anyhow!("cannot list {}", kind));
            }
            Ok(self
                .objects
                .get(kind)
                .map(|objects| {
                    objects
                        .iter()
                        .filter(|o| o.namespace().is_none_or(|ns| ns == namespace))
                        .filter(|o| name.is_empty() || o.name() == name)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn list_by_kind_name_app_namespace(
            &self,
            kind: &str,
            name: &str,
            app: &str,
            namespace: &str,
        ) -> Result<Vec<ClusterObject>> {
            let objects = self.list_by_kind_and_namespace(kind, name, namespace).await?;
            Ok(objects.into_iter().filter(|o| o.belongs_to(app)).collect())
        }
    }

    struct FakeProvider {
        search: Option<Arc<FakeSearch>>,
        requested_namespaces: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        async fn search(&self, _kubeconfig: &str, namespace: &str) -> Result<Arc<dyn ObjectSearch>> {
            self.requested_namespaces
                .lock()
                .unwrap()
                .push(namespace.to_string());
            match &self.search {
                Some(search) => {
                    let search: Arc<dyn ObjectSearch> = search.clone();
                    Ok(search)
                }
                None => Err(anyhow!("cluster unreachable")),
            }
        }
    }

    #[derive(Default)]
    struct FakeRegistry {
        /// namespace → metas; a missing namespace lists as None
        metas: HashMap<String, Vec<ApplicationMeta>>,
    }

    impl FakeRegistry {
        fn with(mut self, namespace: &str, apps: &[&str]) -> Self {
            self.metas.insert(
                namespace.to_string(),
                apps.iter().map(|a| ApplicationMeta::new(a, namespace)).collect(),
            );
            self
        }
    }

    #[async_trait]
    impl ApplicationRegistry for FakeRegistry {
        async fn list_metas(&self, namespace: &str, _kubeconfig: &str) -> Option<Vec<ApplicationMeta>> {
            self.metas.get(namespace).cloned()
        }

        async fn get_meta(
            &self,
            namespace: &str,
            application: &str,
            _kubeconfig: &str,
        ) -> Option<ApplicationMeta> {
            self.metas
                .get(namespace)?
                .iter()
                .find(|m| m.application == application)
                .cloned()
        }
    }

    #[derive(Default)]
    struct FakeProfiles {
        profiles: HashMap<(String, String), HashMap<String, ServiceProfile>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeProfiles {
        fn with(mut self, namespace: &str, application: &str, services: &[&str]) -> Self {
            let map = services
                .iter()
                .map(|s| {
                    (
                        s.to_string(),
                        ServiceProfile {
                            name: s.to_string(),
                            developing: true,
                            ..Default::default()
                        },
                    )
                })
                .collect();
            self.profiles
                .insert((namespace.to_string(), application.to_string()), map);
            self
        }
    }

    impl ProfileResolver for FakeProfiles {
        fn resolve(&self, namespace: &str, application: &str) -> HashMap<String, ServiceProfile> {
            let key = (namespace.to_string(), application.to_string());
            self.calls.lock().unwrap().push(key.clone());
            self.profiles.get(&key).cloned().unwrap_or_default()
        }
    }

    struct Harness {
        provider: Arc<FakeProvider>,
        profiles: Arc<FakeProfiles>,
        aggregator: ResourceAggregator,
    }

    fn harness(search: Option<FakeSearch>, registry: FakeRegistry, profiles: FakeProfiles) -> Harness {
        let provider = Arc::new(FakeProvider {
            search: search.map(Arc::new),
            requested_namespaces: Mutex::new(Vec::new()),
        });
        let profiles = Arc::new(profiles);
        let aggregator = ResourceAggregator::new(
            provider.clone(),
            Arc::new(registry),
            profiles.clone(),
        );
        Harness {
            provider,
            profiles,
            aggregator,
        }
    }

    fn request(resource: &str, namespace: &str) -> ResourceRequest {
        ResourceRequest {
            kube_config: KUBECONFIG.to_string(),
            namespace: namespace.to_string(),
            resource: resource.to_string(),
            ..Default::default()
        }
    }

    fn item_names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.metadata.name()).collect()
    }

    fn three_pods() -> Vec<ClusterObject> {
        vec![
            object("Pod", "t2", "ns1", "2024-01-02T00:00:00Z"),
            object("Pod", "t1", "ns1", "2024-01-01T00:00:00Z"),
            object("Pod", "t3", "ns1", "2024-01-03T00:00:00Z"),
        ]
    }

    #[tokio::test]
    async fn test_flat_list_sorted_by_creation_time() {
        let h = harness(
            Some(FakeSearch::default().with("pods", three_pods())),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        match h.aggregator.aggregate(&request("pods", "ns1")).await {
            Some(Response::Items(items)) => assert_eq!(item_names(&items), vec!["t1", "t2", "t3"]),
            other => panic!("expected items, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flat_list_empty_and_error_are_none() {
        let h = harness(
            Some(FakeSearch::default().with("pods", vec![]).failing("services")),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        assert!(h.aggregator.aggregate(&request("pods", "ns1")).await.is_none());
        assert!(h.aggregator.aggregate(&request("services", "ns1")).await.is_none());
        // Named query with no match
        let mut named = request("pods", "ns1");
        named.resource_name = "ghost".to_string();
        assert!(h.aggregator.aggregate(&named).await.is_none());
    }

    #[tokio::test]
    async fn test_named_query_returns_first_match_only() {
        let duplicates = vec![
            object("Pod", "web", "ns1", "2024-01-02T00:00:00Z"),
            object("Pod", "web", "ns1", "2024-01-01T00:00:00Z"),
            object("Pod", "other", "ns1", "2024-01-01T00:00:00Z"),
        ];
        let h = harness(
            Some(FakeSearch::default().with("pods", duplicates)),
            FakeRegistry::default(),
            FakeProfiles::default().with("ns1", "web", &["web"]),
        );

        let mut named = request("pods", "ns1");
        named.resource_name = "web".to_string();
        match h.aggregator.aggregate(&named).await {
            Some(Response::Item(item)) => {
                assert_eq!(item.metadata.name(), "web");
                assert_eq!(
                    item.metadata.creation_timestamp().unwrap().to_rfc3339(),
                    "2024-01-02T00:00:00+00:00"
                );
                assert!(item.description.unwrap().developing);
            }
            other => panic!("expected a single item, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flat_query_profile_key_is_resource_name() {
        let h = harness(
            Some(FakeSearch::default().with("deployments", vec![object("Deployment", "api", "ns1", "2024-01-01T00:00:00Z")])),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        let mut named = request("deployments", "ns1");
        named.resource_name = "api".to_string();
        named.app_name = "shop".to_string();
        let _ = h.aggregator.aggregate(&named).await;

        let calls = h.profiles.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("ns1".to_string(), "api".to_string())]);
    }

    #[tokio::test]
    async fn test_flat_query_scoped_to_application() {
        let objects = vec![
            app_object("Deployment", "cart", "ns1", "shop"),
            app_object("Deployment", "posts", "ns1", "blog"),
            object("Deployment", "loose", "ns1", "2024-01-01T00:00:00Z"),
        ];
        let h = harness(
            Some(FakeSearch::default().with("deployments", objects)),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        let mut scoped = request("deployments", "ns1");
        scoped.app_name = "shop".to_string();
        match h.aggregator.aggregate(&scoped).await {
            Some(Response::Items(items)) => assert_eq!(item_names(&items), vec!["cart"]),
            other => panic!("expected items, got {:?}", other),
        }

        let mut missing = request("deployments", "ns1");
        missing.app_name = "wiki".to_string();
        assert!(h.aggregator.aggregate(&missing).await.is_none());
    }

    #[tokio::test]
    async fn test_applications_sorted_stably() {
        let mut registry = FakeRegistry::default();
        let mut first_b = ApplicationMeta::new("b", "ns1");
        first_b.application_type = "first".to_string();
        let mut second_b = ApplicationMeta::new("b", "ns1");
        second_b.application_type = "second".to_string();
        registry.metas.insert(
            "ns1".to_string(),
            vec![
                ApplicationMeta::new("c", "ns1"),
                first_b,
                ApplicationMeta::new("a", "ns1"),
                second_b,
            ],
        );
        let h = harness(Some(FakeSearch::default()), registry, FakeProfiles::default());

        match h.aggregator.aggregate(&request("app", "ns1")).await {
            Some(Response::Applications(metas)) => {
                let order: Vec<_> = metas
                    .iter()
                    .map(|m| (m.application.as_str(), m.application_type.as_str()))
                    .collect();
                assert_eq!(
                    order,
                    vec![("a", ""), ("b", "first"), ("b", "second"), ("c", "")]
                );
            }
            other => panic!("expected applications, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_application_list_failure_passes_through() {
        let h = harness(
            Some(FakeSearch::default()),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );
        assert!(h.aggregator.aggregate(&request("application", "ns1")).await.is_none());
    }

    #[tokio::test]
    async fn test_single_application_lookup() {
        let h = harness(
            Some(FakeSearch::default()),
            FakeRegistry::default().with("ns1", &["myapp", "other"]),
            FakeProfiles::default(),
        );

        let mut named = request("app", "ns1");
        named.resource_name = "myapp".to_string();
        match h.aggregator.aggregate(&named).await {
            Some(Response::Application(meta)) => assert_eq!(meta.application, "myapp"),
            other => panic!("expected application, got {:?}", other),
        }

        named.resource_name = "absent".to_string();
        assert!(h.aggregator.aggregate(&named).await.is_none());
    }

    fn assert_complete_groups(app: &App, failing: &[&str]) {
        let names: Vec<_> = app.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Workloads", "Networks", "Configurations", "Storages"]);

        for (group, expected) in app.groups.iter().zip(RESOURCE_GROUPS) {
            let got: HashSet<_> = group.resources.iter().map(|r| r.name.as_str()).collect();
            let want: HashSet<_> = expected
                .kinds
                .iter()
                .copied()
                .filter(|k| !failing.contains(k))
                .collect();
            assert_eq!(got, want, "group {}", group.name);
        }
    }

    #[tokio::test]
    async fn test_tree_has_all_groups_and_profiles() {
        let search = FakeSearch::default()
            .with("deployments", vec![object("Deployment", "cart", "ns1", "2024-01-01T00:00:00Z")])
            .with("services", vec![object("Service", "cart", "ns1", "2024-01-01T00:00:00Z")])
            .with("pods", vec![object("Pod", "cart-0", "ns1", "2024-01-01T00:00:00Z")]);
        let h = harness(
            Some(search),
            FakeRegistry::default().with("ns1", &["shop"]),
            FakeProfiles::default().with("ns1", "shop", &["cart"]),
        );

        let tree = match h.aggregator.aggregate(&request("all", "ns1")).await {
            Some(Response::Tree(tree)) => tree,
            other => panic!("expected a tree, got {:?}", other),
        };
        assert_eq!(tree.namespace, "ns1");
        assert_eq!(tree.applications.len(), 1);

        let app = &tree.applications[0];
        assert_eq!(app.name, "shop");
        assert_complete_groups(app, &[]);

        let workloads = &app.groups[0];
        let deployments = workloads.resources.iter().find(|r| r.name == "deployments").unwrap();
        assert!(deployments.items[0].description.as_ref().unwrap().developing);
        let pods = workloads.resources.iter().find(|r| r.name == "pods").unwrap();
        assert!(pods.items[0].description.is_none());

        let storages = &app.groups[3];
        assert!(storages.resources.iter().all(|r| r.items.is_empty()));
    }

    #[tokio::test]
    async fn test_tree_omits_only_failing_kind() {
        let search = FakeSearch::default()
            .with("services", vec![object("Service", "cart", "ns1", "2024-01-01T00:00:00Z")])
            .failing("ingresses");
        let h = harness(
            Some(search),
            FakeRegistry::default().with("ns1", &["shop"]),
            FakeProfiles::default(),
        );

        let tree = match h.aggregator.aggregate(&request("all", "ns1")).await {
            Some(Response::Tree(tree)) => tree,
            other => panic!("expected a tree, got {:?}", other),
        };
        let app = &tree.applications[0];
        assert_complete_groups(app, &["ingresses"]);

        let networks = &app.groups[1];
        assert!(networks.resources.iter().all(|r| r.name != "ingresses"));
        let services = networks.resources.iter().find(|r| r.name == "services").unwrap();
        assert_eq!(item_names(&services.items), vec!["cart"]);
    }

    #[tokio::test]
    async fn test_tree_groups_present_when_every_kind_fails() {
        let mut search = FakeSearch::default();
        for kind in taxonomy::all_kinds() {
            search = search.failing(kind);
        }
        let h = harness(
            Some(search),
            FakeRegistry::default().with("ns1", &["shop"]),
            FakeProfiles::default(),
        );

        let tree = match h.aggregator.aggregate(&request("all", "ns1")).await {
            Some(Response::Tree(tree)) => tree,
            other => panic!("expected a tree, got {:?}", other),
        };
        let app = &tree.applications[0];
        assert_eq!(app.groups.len(), 4);
        assert!(app.groups.iter().all(|g| g.resources.is_empty()));
    }

    #[tokio::test]
    async fn test_all_namespaces_one_tree_each_in_order() {
        let h = harness(
            Some(FakeSearch::default().with_namespaces(&["ns1", "ns2"])),
            FakeRegistry::default()
                .with("ns1", &["shop"])
                .with("ns2", &["blog", "wiki"]),
            FakeProfiles::default(),
        );

        match h.aggregator.aggregate(&request("all", "")).await {
            Some(Response::Trees(trees)) => {
                let namespaces: Vec<_> = trees.iter().map(|t| t.namespace.as_str()).collect();
                assert_eq!(namespaces, vec!["ns1", "ns2"]);
                assert_eq!(trees[0].applications.len(), 1);
                assert_eq!(trees[1].applications.len(), 2);
                for tree in &trees {
                    for app in &tree.applications {
                        assert_complete_groups(app, &[]);
                    }
                }
            }
            other => panic!("expected trees, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_falls_back_to_default_namespace() {
        // Namespace listing is forbidden: fall back to the kubeconfig namespace
        let h = harness(
            Some(FakeSearch::default()),
            FakeRegistry::default().with("team-a", &["shop"]),
            FakeProfiles::default(),
        );

        match h.aggregator.aggregate(&request("all", "")).await {
            Some(Response::Tree(tree)) => {
                assert_eq!(tree.namespace, "team-a");
                assert_eq!(tree.applications.len(), 1);
            }
            other => panic!("expected a tree, got {:?}", other),
        }
        assert_eq!(
            h.provider.requested_namespaces.lock().unwrap().as_slice(),
            ["team-a".to_string()]
        );
    }

    #[tokio::test]
    async fn test_context_without_namespace_uses_default() {
        let search = FakeSearch::default()
            .with("deployments", vec![object("Deployment", "cart", "default", "2024-01-01T00:00:00Z")]);
        let h = harness(
            Some(search),
            FakeRegistry::default().with("default", &["shop"]),
            FakeProfiles::default().with("default", "shop", &["cart"]),
        );

        let mut req = request("all", "");
        req.kube_config = KUBECONFIG.replace("    namespace: team-a\n", "");

        let tree = match h.aggregator.aggregate(&req).await {
            Some(Response::Tree(tree)) => tree,
            other => panic!("expected a tree, got {:?}", other),
        };
        assert_eq!(tree.namespace, "default");
        assert_eq!(tree.applications.len(), 1);

        let deployments = tree.applications[0].groups[0]
            .resources
            .iter()
            .find(|r| r.name == "deployments")
            .unwrap();
        assert!(deployments.items[0].description.as_ref().unwrap().developing);
        assert_eq!(
            h.provider.requested_namespaces.lock().unwrap().as_slice(),
            ["default".to_string()]
        );
        assert_eq!(
            h.profiles.calls.lock().unwrap().as_slice(),
            [("default".to_string(), "shop".to_string())]
        );
    }

    #[tokio::test]
    async fn test_all_with_empty_namespace_list_falls_back() {
        let h = harness(
            Some(FakeSearch::default().with_namespaces(&[])),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        match h.aggregator.aggregate(&request("all", "")).await {
            Some(Response::Tree(tree)) => {
                assert_eq!(tree.namespace, "team-a");
                assert!(tree.applications.is_empty());
            }
            other => panic!("expected a tree, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_given_namespace_skips_enumeration() {
        let h = harness(
            Some(FakeSearch::default().with_namespaces(&["ns1", "ns2"])),
            FakeRegistry::default().with("ns2", &["blog"]),
            FakeProfiles::default(),
        );

        match h.aggregator.aggregate(&request("all", "ns2")).await {
            Some(Response::Tree(tree)) => assert_eq!(tree.namespace, "ns2"),
            other => panic!("expected a single tree, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_failure_fails_request() {
        let h = harness(
            None,
            FakeRegistry::default().with("ns1", &["shop"]),
            FakeProfiles::default(),
        );

        assert!(h.aggregator.aggregate(&request("all", "ns1")).await.is_none());
        assert!(h.aggregator.aggregate(&request("app", "ns1")).await.is_none());
        assert!(h.aggregator.aggregate(&request("pods", "ns1")).await.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_kubeconfig_leaves_namespace_empty() {
        let h = harness(
            Some(FakeSearch::default().with("pods", three_pods())),
            FakeRegistry::default(),
            FakeProfiles::default(),
        );

        let mut req = request("pods", "");
        req.kube_config = "garbage".to_string();
        let _ = h.aggregator.aggregate(&req).await;
        assert_eq!(
            h.provider.requested_namespaces.lock().unwrap().as_slice(),
            [String::new()]
        );
    }
}
