use crate::{
    core::{InventoryClient, RoutingClient},
    Api,
};
use anyhow::Result;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

/// Serves the HTTP API until `shutdown` completes. Connections that are in
/// flight when it completes are not awaited.
#[instrument(skip_all)]
pub(crate) async fn serve<C, S>(listener: TcpListener, api: Api<C>, shutdown: S) -> Result<()>
where
    C: RoutingClient + InventoryClient + 'static,
    S: Future + Send,
{
    info!(addr = %listener.local_addr()?, "canary API server listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, client_addr) = match res {
                    Ok(conn) => conn,
                    Err(error) => {
                        warn!(%error, "Failed to accept connection");
                        continue;
                    }
                };
                let svc = TowerToHyperService::new(api.clone());
                tokio::spawn(
                    async move {
                        let builder = auto::Builder::new(TokioExecutor::new());
                        let conn = builder.serve_connection(TokioIo::new(stream), svc);
                        if let Err(error) = conn.await {
                            debug!(%error, "Connection closed with error");
                        }
                    }
                    .instrument(info_span!("conn", client.addr = %client_addr)),
                );
            }

            _ = &mut shutdown => {
                debug!("Shutting down canary API server");
                return Ok(());
            }
        }
    }
}
