#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod attributes;
mod client;
mod controller;
mod dispatch;
mod fragment;
mod managed;
pub mod patch;
pub mod release;
mod set;
pub mod traffic_segment;


pub use self::{
    client::{InventoryClient, RoutingClient},
    controller::Controller,
    dispatch::{dispatch, PatchOutcome, PatchStatus},
    managed::managed,
    release::{aggregate_releases, App, AppLabels, Gateway, Release},
    set::set_equal,
    traffic_segment::{aggregate_traffic_segments, HttpMatch, StringMatch, TrafficSegment},
};
pub use canary_controller_k8s_api::RoutingObject;

/// The header that carries a release id, both as a response header appended
/// by a rule and as a request header matched by a rule.
pub const RELEASE_HEADER: &str = "devtio";
