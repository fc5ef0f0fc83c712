use crate::{
    attributes::{AttributeMap, Attributes},
    fragment::fragments,
    managed, set_equal,
};
use ahash::AHashMap as HashMap;
use canary_controller_k8s_api::RoutingObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A named, header-based request match bound to a gateway entry point.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficSegment {
    pub id: String,
    pub name: String,
    #[serde(rename = "match")]
    pub http_match: HttpMatch,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpMatch {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, StringMatch>,
}

/// Matches a header value.
///
/// Each field is read independently from the source match block, so a block
/// that sets more than one of `exact`, `regex` and `prefix` yields a match
/// with all of them populated.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct StringMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Hosts served by each managed gateway, keyed by gateway name.
type GatewayHosts = HashMap<String, Vec<String>>;

// === impl TrafficSegment ===

impl TrafficSegment {
    pub fn new(id: impl ToString, header: impl ToString, value: StringMatch) -> Self {
        let id = id.to_string();
        Self {
            name: id.clone(),
            id,
            http_match: HttpMatch {
                headers: Some((header.to_string(), value)).into_iter().collect(),
            },
        }
    }
}

// === impl StringMatch ===

impl StringMatch {
    pub fn exact(value: impl ToString) -> Self {
        Self {
            exact: Some(value.to_string()),
            ..Default::default()
        }
    }
}

impl From<&AttributeMap> for StringMatch {
    fn from(block: &AttributeMap) -> Self {
        Self {
            exact: block.get_str("exact").map(str::to_string),
            regex: block.get_str("regex").map(str::to_string),
            prefix: block.get_str("prefix").map(str::to_string),
        }
    }
}

fn gateway_hosts<'o>(gateways: impl IntoIterator<Item = &'o RoutingObject>) -> GatewayHosts {
    let mut index = GatewayHosts::default();
    for gateway in managed(gateways) {
        let hosts = index.entry(gateway.name().to_string()).or_default();
        for server in gateway.spec.get_maps("servers") {
            hosts.extend(server.get_strings("hosts"));
        }
    }
    index
}

/// Reconstructs traffic segments from route objects that are bound to a
/// managed gateway.
///
/// A route object is bound to one of its declared gateways when the
/// gateway's aggregated host set equals the object's own hosts. For every
/// fragment of a bound object that appends a release id, each header of
/// each match block yields one segment named by that release id.
pub fn aggregate_traffic_segments<'o>(
    gateways: impl IntoIterator<Item = &'o RoutingObject>,
    routes: impl IntoIterator<Item = &'o RoutingObject>,
) -> Vec<TrafficSegment> {
    let gateway_hosts = gateway_hosts(gateways);
    let mut segments = Vec::new();

    for route in managed(routes) {
        let hosts = route.spec.get_strings("hosts");

        for gateway in route.spec.get_strings("gateways") {
            let bound_hosts = gateway_hosts
                .get(&gateway)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if !set_equal(bound_hosts, &hosts) {
                debug!(name = %route.name(), %gateway, "Hosts do not match gateway");
                continue;
            }

            for fragment in fragments(&route.spec) {
                let Some(id) = fragment.release() else {
                    continue;
                };

                for headers in fragment.header_matches() {
                    for (header, value) in headers {
                        if let Some(block) = value.as_object() {
                            segments.push(TrafficSegment::new(id, header, block.into()));
                        }
                    }
                }
            }
        }
    }

    segments.sort();
    segments
}
