//! Synthesizes the rule additions that bind a posted release to the managed
//! route objects.

use crate::{
    attributes::Attributes,
    fragment::{fragments, Destination},
    managed, set_equal, Release, RELEASE_HEADER,
};
use canary_controller_k8s_api::RoutingObject;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Rules to append to a single route object, keyed by app host. Keying by app
/// collapses repeated apps into a single rule.
#[derive(Debug, Default)]
struct Additions<'a> {
    gateway_bound: BTreeMap<&'a str, &'a str>,
    host_bound: BTreeMap<&'a str, &'a str>,
}

/// Computes the updated route objects for a release.
///
/// For each managed route object, every fragment's first route destination
/// host is compared against the apps of the release. When an app matches:
///
/// - if the object declares gateways and its hosts equal the release's
///   gateway hosts, a route-only rule to the app's version is appended;
/// - if the app is one of the object's hosts, a rule matching the release
///   header and routing to the app's version is appended.
///
/// Existing rules are never removed or reordered. Objects without additions
/// are not returned.
pub fn patch_release<'o>(
    release: &Release,
    routes: impl IntoIterator<Item = &'o RoutingObject>,
) -> Vec<RoutingObject> {
    let mut patched = Vec::new();

    for route in managed(routes) {
        let additions = additions(release, route);
        if additions.is_empty() {
            continue;
        }

        let mut route = route.clone();
        let Some(rules) = route.spec.get_mut("http").and_then(Value::as_array_mut) else {
            continue;
        };
        for (app, version) in additions.gateway_bound {
            debug!(%app, %version, "Adding gateway-bound rule");
            rules.push(route_rule(app, version));
        }
        for (app, version) in additions.host_bound {
            debug!(%app, %version, "Adding host-bound rule");
            rules.push(release_rule(&release.id, app, version));
        }
        debug!(name = %route.name(), release = %release.id, "Patched route object");
        patched.push(route);
    }

    patched
}

fn additions<'a>(release: &'a Release, route: &'a RoutingObject) -> Additions<'a> {
    let mut additions = Additions::default();

    let hosts = route.spec.get_strings("hosts");
    let gateway_bound =
        route.spec.get_array("gateways").is_some() && set_equal(&hosts, &release.gateway.hosts);

    for fragment in fragments(&route.spec) {
        let app = match fragment.destination() {
            Some(Destination { host, .. }) if !host.is_empty() => host,
            _ => continue,
        };

        for pinned in release.apps.iter().filter(|a| a.labels.app == app) {
            let version = pinned.labels.version.as_str();
            if gateway_bound {
                additions.gateway_bound.insert(app, version);
            }
            if hosts.iter().any(|h| h == app) {
                additions.host_bound.insert(app, version);
            }
        }
    }

    additions
}

fn route_rule(app: &str, version: &str) -> Value {
    json!({
        "route": [{ "destination": { "host": app, "subset": version } }],
    })
}

fn release_rule(id: &str, app: &str, version: &str) -> Value {
    json!({
        "match": [{ "headers": { RELEASE_HEADER: { "exact": id } } }],
        "route": [{ "destination": { "host": app, "subset": version } }],
    })
}

impl Additions<'_> {
    fn is_empty(&self) -> bool {
        self.gateway_bound.is_empty() && self.host_bound.is_empty()
    }
}
