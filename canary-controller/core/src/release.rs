use crate::{
    attributes::Attributes,
    fragment::{fragments, Destination},
    managed,
};
use canary_controller_k8s_api::RoutingObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A canary deployment: a set of application version pins reachable through
/// an entry host set.
///
/// Releases are not stored anywhere. They are reconstructed from the rules of
/// the managed route objects on every read, joined on the release id carried
/// by the `devtio` header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub id: String,
    pub name: String,
    pub gateway: Gateway,
    pub apps: Vec<App>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gateway {
    pub hosts: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    pub hosts: Vec<String>,
    pub labels: AppLabels,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct AppLabels {
    pub app: String,
    pub version: String,
}

// === impl Release ===

impl Release {
    pub fn new(id: impl ToString) -> Self {
        let id = id.to_string();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }
}

// === impl App ===

impl App {
    pub fn new(hosts: Vec<String>, app: impl ToString, version: impl ToString) -> Self {
        Self {
            hosts,
            labels: AppLabels {
                app: app.to_string(),
                version: version.to_string(),
            },
        }
    }

    fn sort_key(&self) -> (&AppLabels, &[String]) {
        (&self.labels, &self.hosts)
    }
}

/// Reconstructs releases from the rule fragments of managed route objects.
///
/// A fragment contributes to a release in two independent ways:
///
/// - an `appendHeaders.devtio` value names a release and sets its gateway
///   hosts to the object's hosts. When several objects name the same
///   release, the last one scanned wins.
/// - each `match[].headers.devtio.exact` value adds an app to that release,
///   pinned to the fragment's first route destination.
///
/// Apps are sorted so that the result does not depend on the order in which
/// objects were listed.
pub fn aggregate_releases<'o>(
    routes: impl IntoIterator<Item = &'o RoutingObject>,
) -> BTreeMap<String, Release> {
    let mut releases = BTreeMap::<String, Release>::new();

    for route in managed(routes) {
        let hosts = route.spec.get_strings("hosts");

        for fragment in fragments(&route.spec) {
            if let Some(id) = fragment.release() {
                debug!(name = %route.name(), release = %id, ?hosts, "Found release gateway");
                releases
                    .entry(id.to_string())
                    .or_insert_with(|| Release::new(id))
                    .gateway
                    .hosts = hosts.clone();
            }

            let Destination {
                host: app,
                subset: version,
            } = fragment.destination().unwrap_or_default();

            for id in fragment.release_matches() {
                debug!(name = %route.name(), release = %id, %app, %version, "Found release app");
                releases
                    .entry(id.to_string())
                    .or_insert_with(|| Release::new(id))
                    .apps
                    .push(App::new(hosts.clone(), app, version));
            }
        }
    }

    for release in releases.values_mut() {
        release.apps.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    releases
}
