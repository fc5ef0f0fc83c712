#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use canary_controller_core as core;
pub use canary_controller_k8s_api as k8s;

mod api;
mod args;
mod client;
mod metrics;
mod server;

pub use self::{api::Api, args::Args, client::KubeClient, metrics::ApiMetrics};
