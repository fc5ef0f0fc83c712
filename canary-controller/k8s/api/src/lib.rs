#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod istio;
pub mod labels;
mod routing_object;

pub use self::{labels::Labels, routing_object::RoutingObject};
pub use k8s_openapi::api::{
    self,
    core::v1::{Namespace, Pod},
};
pub use kube::{
    api::{Api, ListParams, ObjectMeta, PostParams, ResourceExt},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
