use crate::{
    core::{InventoryClient, RoutingClient},
    k8s::{
        istio, Api, ApiResource, Client, DynamicObject, ListParams, Namespace, Pod, PostParams,
        ResourceExt, RoutingObject,
    },
};
use anyhow::{anyhow, Result};
use std::{future::Future, time::Duration};
use tokio::time;
use tracing::debug;

const FIELD_MANAGER: &str = "canary-controller";

/// Reads and writes routing objects through the Kubernetes API.
///
/// Each call is bounded by a single timeout.
#[derive(Clone)]
pub struct KubeClient {
    client: Client,
    timeout: Duration,
    gateways: ApiResource,
    virtual_services: ApiResource,
}

// === impl KubeClient ===

impl KubeClient {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            gateways: istio::gateway(),
            virtual_services: istio::virtual_service(),
        }
    }

    fn gateway_api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.gateways)
    }

    fn virtual_service_api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.virtual_services)
    }

    async fn timed<T>(&self, fut: impl Future<Output = kube::Result<T>>) -> Result<T> {
        let rsp = time::timeout(self.timeout, fut)
            .await
            .map_err(|_| anyhow!("request timed out after {:?}", self.timeout))??;
        Ok(rsp)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

fn list_params(selector: Option<&str>) -> ListParams {
    match selector {
        Some(selector) => ListParams::default().labels(selector),
        None => ListParams::default(),
    }
}

#[async_trait::async_trait]
impl RoutingClient for KubeClient {
    async fn list_gateways(&self, namespace: &str) -> Result<Vec<RoutingObject>> {
        let list = self
            .timed(self.gateway_api(namespace).list(&ListParams::default()))
            .await?;
        debug!(%namespace, gateways = list.items.len(), "Listed gateways");
        Ok(list.items.into_iter().map(RoutingObject::from).collect())
    }

    async fn list_route_objects(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<RoutingObject>> {
        let list = self
            .timed(self.virtual_service_api(namespace).list(&list_params(selector)))
            .await?;
        debug!(%namespace, ?selector, routes = list.items.len(), "Listed route objects");
        Ok(list.items.into_iter().map(RoutingObject::from).collect())
    }

    async fn create_route_object(
        &self,
        namespace: &str,
        route: RoutingObject,
    ) -> Result<RoutingObject> {
        let obj = route.into_dynamic(&self.virtual_services);
        let created = self
            .timed(
                self.virtual_service_api(namespace)
                    .create(&Self::post_params(), &obj),
            )
            .await?;
        debug!(%namespace, name = %created.name_any(), "Created route object");
        Ok(created.into())
    }

    async fn update_route_object(
        &self,
        namespace: &str,
        route: RoutingObject,
    ) -> Result<RoutingObject> {
        let name = route.name().to_string();
        let obj = route.into_dynamic(&self.virtual_services);
        let updated = self
            .timed(
                self.virtual_service_api(namespace)
                    .replace(&name, &Self::post_params(), &obj),
            )
            .await?;
        debug!(%namespace, %name, "Updated route object");
        Ok(updated.into())
    }
}

#[async_trait::async_trait]
impl InventoryClient for KubeClient {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let api = Api::<Namespace>::all(self.client.clone());
        let list = self.timed(api.list(&ListParams::default())).await?;
        Ok(list.items)
    }

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>> {
        let api = Api::<Pod>::namespaced(self.client.clone(), namespace);
        let list = self.timed(api.list(&list_params(selector))).await?;
        Ok(list.items)
    }
}
