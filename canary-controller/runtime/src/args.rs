use crate::{core::Controller, server, Api, ApiMetrics, KubeClient};
use anyhow::{bail, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use std::{net::SocketAddr, num::NonZeroUsize, sync::Arc};
use tokio::{net::TcpListener, time::Duration};
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "canary", about = "A canary traffic routing controller")]
pub struct Args {
    #[clap(
        long,
        default_value = "canary=info,warn",
        env = "CANARY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    #[clap(long, default_value = "0.0.0.0:8090")]
    api_addr: SocketAddr,

    /// The maximum number of route object updates in flight for a single
    /// release.
    #[clap(long, default_value = "4")]
    update_concurrency: NonZeroUsize,

    #[clap(long, default_value = "5000")]
    patch_timeout_ms: u64,

    /// Restricts the route objects considered to those matching this label
    /// selector.
    #[clap(long)]
    route_selector: Option<String>,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            api_addr,
            update_concurrency,
            patch_timeout_ms,
            route_selector,
        } = self;

        let mut prom = <Registry>::default();
        let api_metrics = ApiMetrics::register(prom.sub_registry_with_prefix("canary_api"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        let client = KubeClient::new(
            runtime.client(),
            Duration::from_millis(patch_timeout_ms),
        );
        let controller = Controller::new(Arc::new(client), route_selector, update_concurrency);

        // Serve the API, reading and writing routing objects on each request.
        let listener = TcpListener::bind(api_addr).await?;
        tokio::spawn(
            server::serve(
                listener,
                Api::new(controller, api_metrics),
                runtime.shutdown_handle().signaled(),
            )
            .instrument(info_span!("api", port = %api_addr.port())),
        );

        // Block the main thread on the shutdown signal.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
