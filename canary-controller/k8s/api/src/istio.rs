//! Descriptors for the Istio networking kinds this controller reads and
//! rewrites. The objects are handled as `DynamicObject`s so their specs stay
//! untyped attribute trees.

use kube::core::{ApiResource, GroupVersionKind};

pub const GROUP: &str = "networking.istio.io";
pub const VERSION: &str = "v1alpha3";

pub const GATEWAY_KIND: &str = "Gateway";
pub const VIRTUAL_SERVICE_KIND: &str = "VirtualService";

/// `gateways.networking.istio.io`
pub fn gateway() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(GROUP, VERSION, GATEWAY_KIND))
}

/// `virtualservices.networking.istio.io`
pub fn virtual_service() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(GROUP, VERSION, VIRTUAL_SERVICE_KIND))
}
