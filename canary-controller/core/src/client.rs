use anyhow::Result;
use canary_controller_k8s_api::{Namespace, Pod, RoutingObject};

/// Models access to the routing objects in a cluster.
///
/// Implementations own any deadline applied to individual calls.
#[async_trait::async_trait]
pub trait RoutingClient: Send + Sync {
    async fn list_gateways(&self, namespace: &str) -> Result<Vec<RoutingObject>>;

    async fn list_route_objects(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<RoutingObject>>;

    async fn create_route_object(
        &self,
        namespace: &str,
        route: RoutingObject,
    ) -> Result<RoutingObject>;

    async fn update_route_object(
        &self,
        namespace: &str,
        route: RoutingObject,
    ) -> Result<RoutingObject>;
}

/// Models read access to the namespaces and pods that routing objects refer
/// to.
#[async_trait::async_trait]
pub trait InventoryClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;

    async fn list_pods(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<Pod>>;
}
