use crate::{
    aggregate_releases, aggregate_traffic_segments, dispatch, patch::patch_release, PatchOutcome,
    Release, RoutingClient, RoutingObject, TrafficSegment,
};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, num::NonZeroUsize, sync::Arc};
use tracing::{info, instrument};

/// Serves release and traffic segment views over a routing client.
///
/// Every call works on a fresh snapshot of the routing objects; nothing is
/// cached between calls.
pub struct Controller<C: ?Sized> {
    client: Arc<C>,
    route_selector: Option<String>,
    update_concurrency: NonZeroUsize,
}

// === impl Controller ===

impl<C: ?Sized> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            route_selector: self.route_selector.clone(),
            update_concurrency: self.update_concurrency,
        }
    }
}

impl<C> Controller<C>
where
    C: RoutingClient + ?Sized,
{
    pub fn new(
        client: Arc<C>,
        route_selector: Option<String>,
        update_concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            client,
            route_selector,
            update_concurrency,
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub async fn route_objects(&self, namespace: &str) -> Result<Vec<RoutingObject>> {
        self.client
            .list_route_objects(namespace, self.route_selector.as_deref())
            .await
            .context("failed to list route objects")
    }

    pub async fn gateways(&self, namespace: &str) -> Result<Vec<RoutingObject>> {
        self.client
            .list_gateways(namespace)
            .await
            .context("failed to list gateways")
    }

    #[instrument(skip(self))]
    pub async fn releases(&self, namespace: &str) -> Result<BTreeMap<String, Release>> {
        let routes = self.route_objects(namespace).await?;
        let releases = aggregate_releases(&routes);
        info!(routes = routes.len(), releases = releases.len(), "Aggregated releases");
        Ok(releases)
    }

    #[instrument(skip(self))]
    pub async fn traffic_segments(&self, namespace: &str) -> Result<Vec<TrafficSegment>> {
        let gateways = self.gateways(namespace).await?;
        let routes = self.route_objects(namespace).await?;
        let segments = aggregate_traffic_segments(&gateways, &routes);
        info!(
            gateways = gateways.len(),
            routes = routes.len(),
            segments = segments.len(),
            "Aggregated traffic segments"
        );
        Ok(segments)
    }

    /// Appends the rules for `release` to the affected route objects and
    /// submits them. Failing to list route objects fails the whole call;
    /// failing to update an object is reported in that object's outcome.
    #[instrument(skip(self, release), fields(release = %release.id))]
    pub async fn apply_release(
        &self,
        namespace: &str,
        release: &Release,
    ) -> Result<Vec<PatchOutcome>> {
        let routes = self.route_objects(namespace).await?;
        let patched = patch_release(release, &routes);
        info!(routes = routes.len(), patched = patched.len(), "Submitting route updates");
        Ok(dispatch(&*self.client, namespace, patched, self.update_concurrency).await)
    }
}
