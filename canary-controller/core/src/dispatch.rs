use crate::RoutingClient;
use canary_controller_k8s_api::RoutingObject;
use futures::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, num::NonZeroUsize};
use tracing::{info, warn};

/// The result of submitting a single updated route object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: PatchStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PatchStatus {
    Ok,
    Error { error: String },
}

impl PatchOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, PatchStatus::Ok)
    }
}

/// Submits updated route objects, at most `concurrency` at a time.
///
/// Objects are keyed by name before submission so that no object has more
/// than one update in flight. A failed update is recorded in its outcome and
/// never prevents the remaining updates from being submitted. Outcomes are
/// ordered by object name.
pub async fn dispatch<C>(
    client: &C,
    namespace: &str,
    routes: impl IntoIterator<Item = RoutingObject>,
    concurrency: NonZeroUsize,
) -> Vec<PatchOutcome>
where
    C: RoutingClient + ?Sized,
{
    let routes = routes
        .into_iter()
        .map(|route| (route.name().to_string(), route))
        .collect::<BTreeMap<_, _>>();

    let mut outcomes = stream::iter(routes)
        .map(|(name, route)| async move {
            let status = match client.update_route_object(namespace, route).await {
                Ok(_) => {
                    info!(%namespace, %name, "Updated route object");
                    PatchStatus::Ok
                }
                Err(error) => {
                    warn!(%namespace, %name, %error, "Failed to update route object");
                    PatchStatus::Error {
                        error: format!("{error:#}"),
                    }
                }
            };
            PatchOutcome { name, status }
        })
        .buffer_unordered(concurrency.get())
        .collect::<Vec<_>>()
        .await;

    outcomes.sort_by(|a, b| a.name.cmp(&b.name));
    outcomes
}
