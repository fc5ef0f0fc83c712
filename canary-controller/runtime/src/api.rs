use crate::{
    core::{Controller, InventoryClient, Release, RoutingClient, RoutingObject},
    k8s::labels::release_selector,
    ApiMetrics,
};
use futures::future;
use http_body_util::BodyExt;
use hyper::{
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE},
    http::{Method, StatusCode},
    Request, Response,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, trace, warn};

#[cfg(test)]
mod tests;

type Body = http_body_util::Full<bytes::Bytes>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serves the JSON API over namespaces, pods, routing objects, releases and
/// traffic segments.
pub struct Api<C> {
    controller: Controller<C>,
    metrics: ApiMetrics,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

/// A request body that cannot be used. Both cases are answered with 400.
#[derive(Debug, Error)]
enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(#[source] BoxError),

    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Route<'p> {
    Health,
    Namespaces,
    Gateways(&'p str),
    VirtualServices(&'p str),
    Pods(&'p str, Option<&'p str>),
    Releases(&'p str),
    TrafficSegments(&'p str),
}

// === impl Api ===

impl<C> Clone for Api<C> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<B, C> tower::Service<Request<B>> for Api<C>
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
    C: RoutingClient + InventoryClient + 'static,
{
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), uri = %req.uri());
        let api = self.clone();
        Box::pin(api.handle(req))
    }
}

impl<C> Api<C>
where
    C: RoutingClient + InventoryClient + 'static,
{
    pub fn new(controller: Controller<C>, metrics: ApiMetrics) -> Self {
        Self {
            controller,
            metrics,
        }
    }

    async fn handle<B>(self, req: Request<B>) -> Result<Response<Body>, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let Some(route) = Route::parse(&path) else {
            debug!(%path, "No such route");
            let rsp = error_response(StatusCode::NOT_FOUND, "not found")?;
            self.metrics.request("unknown", &method, rsp.status());
            return Ok(rsp);
        };

        let rsp = match (route, &method) {
            (Route::Health, &Method::GET) => {
                json_response(StatusCode::OK, &json!({ "status": "OK" }))
            }

            (Route::Namespaces, &Method::GET) => {
                let result = self.controller.client().list_namespaces().await;
                ok_or_error(result)
            }

            (Route::Gateways(ns), &Method::GET) => {
                ok_or_error(self.controller.gateways(ns).await)
            }

            (Route::VirtualServices(ns), &Method::GET) => {
                ok_or_error(self.controller.route_objects(ns).await)
            }

            (Route::VirtualServices(ns), &Method::POST) => {
                let obj = match read_json::<RoutingObject, _>(req).await {
                    Ok(obj) => obj,
                    Err(error) => return self.bad_request(route_name(route), &method, error),
                };
                match self
                    .controller
                    .client()
                    .create_route_object(ns, obj)
                    .await
                {
                    Ok(created) => json_response(StatusCode::CREATED, &created),
                    Err(error) => server_error(error),
                }
            }

            (Route::Pods(ns, release), &Method::GET) => {
                let selector = release.map(release_selector);
                let result = self
                    .controller
                    .client()
                    .list_pods(ns, selector.as_deref())
                    .await;
                ok_or_error(result)
            }

            (Route::Releases(ns), &Method::GET) => {
                ok_or_error(self.controller.releases(ns).await)
            }

            (Route::Releases(ns), &Method::POST) => {
                let release = match read_json::<Release, _>(req).await {
                    Ok(release) => release,
                    Err(error) => return self.bad_request(route_name(route), &method, error),
                };
                match self.controller.apply_release(ns, &release).await {
                    Ok(outcomes) => {
                        self.metrics.patch_outcomes(&outcomes);
                        json_response(StatusCode::OK, &outcomes)
                    }
                    Err(error) => server_error(error),
                }
            }

            (Route::TrafficSegments(ns), &Method::GET) => {
                ok_or_error(self.controller.traffic_segments(ns).await)
            }

            _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
        }?;

        self.metrics.request(route_name(route), &method, rsp.status());
        Ok(rsp)
    }

    fn bad_request(
        &self,
        route: &'static str,
        method: &Method,
        error: BodyError,
    ) -> Result<Response<Body>, Error> {
        warn!(%error, "Invalid request body");
        let rsp = error_response(StatusCode::BAD_REQUEST, &error.to_string())?;
        self.metrics.request(route, method, rsp.status());
        Ok(rsp)
    }
}

// === impl Route ===

impl<'p> Route<'p> {
    fn parse(path: &'p str) -> Option<Self> {
        let segments = path.trim_matches('/').split('/').collect::<Vec<_>>();
        let route = match segments[..] {
            ["health"] => Self::Health,
            ["api", "namespaces"] => Self::Namespaces,
            ["api", "gateways", ns] => Self::Gateways(ns),
            ["api", "virtual-services", ns] => Self::VirtualServices(ns),
            ["api", "pods", ns] => Self::Pods(ns, None),
            ["api", "pods", ns, release] => Self::Pods(ns, Some(release)),
            ["api", "releases", ns] => Self::Releases(ns),
            ["api", "traffic-segments", ns] => Self::TrafficSegments(ns),
            _ => return None,
        };
        match route {
            Self::Gateways(ns)
            | Self::VirtualServices(ns)
            | Self::Releases(ns)
            | Self::TrafficSegments(ns)
            | Self::Pods(ns, None)
                if ns.is_empty() =>
            {
                None
            }
            Self::Pods(ns, Some(release)) if ns.is_empty() || release.is_empty() => None,
            route => Some(route),
        }
    }
}

fn route_name(route: Route<'_>) -> &'static str {
    match route {
        Route::Health => "health",
        Route::Namespaces => "namespaces",
        Route::Gateways(_) => "gateways",
        Route::VirtualServices(_) => "virtual-services",
        Route::Pods(_, None) => "pods",
        Route::Pods(_, Some(_)) => "release-pods",
        Route::Releases(_) => "releases",
        Route::TrafficSegments(_) => "traffic-segments",
    }
}

/// Reads the request body as JSON.
async fn read_json<T, B>(req: Request<B>) -> Result<T, BodyError>
where
    T: DeserializeOwned,
    B: hyper::body::Body,
    B::Error: Into<BoxError>,
{
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|error| BodyError::Read(error.into()))?
        .to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

fn ok_or_error<T: Serialize>(result: anyhow::Result<T>) -> Result<Response<Body>, Error> {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(error) => server_error(error),
    }
}

fn server_error(error: anyhow::Error) -> Result<Response<Body>, Error> {
    let error = format!("{error:#}");
    warn!(%error, "Request failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &error)
}

fn error_response(status: StatusCode, error: &str) -> Result<Response<Body>, Error> {
    json_response(status, &json!({ "error": error }))
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(body)?;
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Body::from(bytes))
        .expect("json response must be valid"))
}
