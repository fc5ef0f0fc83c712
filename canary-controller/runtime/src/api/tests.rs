use super::*;
use crate::{
    core::Controller,
    k8s::{labels::MANAGED, Namespace, ObjectMeta, Pod},
};
use bytes::Bytes;
use hyper::body::Frame;
use maplit::btreemap;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use prometheus_client::registry::Registry;
use serde_json::Value;
use std::{
    num::NonZeroUsize,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tower::Service;

const NS: &str = "bookinfo";

#[derive(Default)]
struct FakeClient {
    gateways: Vec<RoutingObject>,
    routes: Vec<RoutingObject>,
    pods: Vec<Pod>,
    unavailable: bool,
    created: Mutex<Vec<RoutingObject>>,
    updated: Mutex<Vec<RoutingObject>>,
    pod_selectors: Mutex<Vec<Option<String>>>,
}

#[async_trait::async_trait]
impl RoutingClient for FakeClient {
    async fn list_gateways(&self, _: &str) -> anyhow::Result<Vec<RoutingObject>> {
        Ok(self.gateways.clone())
    }

    async fn list_route_objects(
        &self,
        _: &str,
        _: Option<&str>,
    ) -> anyhow::Result<Vec<RoutingObject>> {
        if self.unavailable {
            anyhow::bail!("connection refused");
        }
        Ok(self.routes.clone())
    }

    async fn create_route_object(
        &self,
        _: &str,
        route: RoutingObject,
    ) -> anyhow::Result<RoutingObject> {
        self.created.lock().push(route.clone());
        Ok(route)
    }

    async fn update_route_object(
        &self,
        _: &str,
        route: RoutingObject,
    ) -> anyhow::Result<RoutingObject> {
        self.updated.lock().push(route.clone());
        Ok(route)
    }
}

#[async_trait::async_trait]
impl InventoryClient for FakeClient {
    async fn list_namespaces(&self) -> anyhow::Result<Vec<Namespace>> {
        Ok(vec![Namespace {
            metadata: ObjectMeta {
                name: Some(NS.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }])
    }

    async fn list_pods(&self, _: &str, selector: Option<&str>) -> anyhow::Result<Vec<Pod>> {
        self.pod_selectors.lock().push(selector.map(str::to_string));
        Ok(self.pods.clone())
    }
}

fn mk_managed(name: &str, spec: Value) -> RoutingObject {
    RoutingObject::new(
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NS.to_string()),
            labels: Some(btreemap! { MANAGED.to_string() => "true".to_string() }),
            ..Default::default()
        },
        spec,
    )
}

fn frontend() -> RoutingObject {
    mk_managed(
        "frontend",
        json!({
            "gateways": ["gw1"],
            "hosts": ["foo.com"],
            "http": [{
                "appendHeaders": { "devtio": "r1" },
                "match": [{ "headers": { "devtio": { "exact": "r1" } } }],
                "route": [{ "destination": { "host": "reviews", "subset": "v2" } }],
            }],
        }),
    )
}

fn gw1() -> RoutingObject {
    mk_managed("gw1", json!({ "servers": [{ "hosts": ["foo.com"] }] }))
}

/// A request body whose connection is reset before any data arrives.
struct ResetBody;

impl hyper::body::Body for ResetBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        Poll::Ready(Some(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ))))
    }
}

struct Harness {
    api: Api<FakeClient>,
    client: Arc<FakeClient>,
    metrics: ApiMetrics,
}

impl Harness {
    fn new(client: FakeClient) -> Self {
        let client = Arc::new(client);
        let metrics = ApiMetrics::register(&mut Registry::default());
        let controller = Controller::new(
            client.clone(),
            None,
            NonZeroUsize::new(2).expect("non-zero"),
        );
        Self {
            api: Api::new(controller, metrics.clone()),
            client,
            metrics,
        }
    }

    async fn send(&mut self, method: Method, path: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::from(Bytes::copy_from_slice(body.as_bytes())))
            .expect("request must be valid");
        let rsp = self.api.call(req).await.expect("request must be served");
        read_response(rsp).await
    }

    async fn get(&mut self, path: &str) -> (StatusCode, Value) {
        self.send(Method::GET, path, "").await
    }
}

async fn read_response(rsp: Response<Body>) -> (StatusCode, Value) {
    assert_eq!(rsp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(rsp.headers()[CONTENT_TYPE], "application/json");
    let status = rsp.status();
    let bytes = rsp
        .into_body()
        .collect()
        .await
        .expect("body must be read")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("body must be json");
    (status, body)
}

#[tokio::test]
async fn health() {
    let mut h = Harness::new(FakeClient::default());
    assert_eq!(
        h.get("/health").await,
        (StatusCode::OK, json!({ "status": "OK" }))
    );
    assert_eq!(
        h.metrics
            .request_count("health", &Method::GET, StatusCode::OK),
        1
    );
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let mut h = Harness::new(FakeClient::default());

    let (status, body) = h.get("/api/unknown/bookinfo").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not found" }));

    let (status, _) = h.get("/api/releases/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.send(Method::DELETE, "/api/releases/bookinfo", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({ "error": "method not allowed" }));

    let (status, _) = h.send(Method::POST, "/api/traffic-segments/bookinfo", "{}").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn lists_releases() {
    let mut h = Harness::new(FakeClient {
        routes: vec![frontend()],
        ..Default::default()
    });

    let (status, body) = h.get("/api/releases/bookinfo/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "r1": {
                "id": "r1",
                "name": "r1",
                "gateway": { "hosts": ["foo.com"] },
                "apps": [{ "hosts": ["foo.com"], "labels": { "app": "reviews", "version": "v2" } }],
            },
        })
    );
}

#[tokio::test]
async fn lists_traffic_segments() {
    let mut h = Harness::new(FakeClient {
        gateways: vec![gw1()],
        routes: vec![frontend()],
        ..Default::default()
    });

    let (status, body) = h.get("/api/traffic-segments/bookinfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "id": "r1",
            "name": "r1",
            "match": { "headers": { "devtio": { "exact": "r1" } } },
        }])
    );
}

#[tokio::test]
async fn lists_raw_objects() {
    let mut h = Harness::new(FakeClient {
        gateways: vec![gw1()],
        routes: vec![frontend()],
        ..Default::default()
    });

    let (status, body) = h.get("/api/gateways/bookinfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["metadata"]["name"], "gw1");

    let (status, body) = h.get("/api/virtual-services/bookinfo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["spec"], frontend().spec);

    let (status, body) = h.get("/api/namespaces").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["metadata"]["name"], NS);
}

#[tokio::test]
async fn pods_are_selected_by_release() {
    let mut h = Harness::new(FakeClient::default());

    let (status, body) = h.get("/api/pods/bookinfo").await;
    assert_eq!((status, body), (StatusCode::OK, json!([])));
    let (status, _) = h.get("/api/pods/bookinfo/r1").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        *h.client.pod_selectors.lock(),
        vec![None, Some("release=r1".to_string())]
    );
}

#[tokio::test]
async fn applies_release() {
    let mut h = Harness::new(FakeClient {
        routes: vec![frontend()],
        ..Default::default()
    });

    let release = json!({
        "id": "r2",
        "gateway": { "hosts": ["foo.com"] },
        "apps": [{ "labels": { "app": "reviews", "version": "v3" } }],
    });
    let (status, body) = h
        .send(Method::POST, "/api/releases/bookinfo", &release.to_string())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "name": "frontend", "status": "ok" }]));

    let updated = h.client.updated.lock();
    assert_eq!(updated.len(), 1);
    assert_eq!(
        updated[0].spec["http"][1],
        json!({ "route": [{ "destination": { "host": "reviews", "subset": "v3" } }] })
    );
    assert_eq!(h.metrics.patch_count("ok"), 1);
    assert_eq!(h.metrics.patch_count("error"), 0);
}

#[tokio::test]
async fn malformed_bodies_are_rejected() {
    let mut h = Harness::new(FakeClient {
        routes: vec![frontend()],
        ..Default::default()
    });

    let (status, body) = h
        .send(Method::POST, "/api/releases/bookinfo", "{\"id\": ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = h
        .send(Method::POST, "/api/virtual-services/bookinfo", "frontend")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(h.client.updated.lock().is_empty());
    assert!(h.client.created.lock().is_empty());
    assert_eq!(
        h.metrics
            .request_count("releases", &Method::POST, StatusCode::BAD_REQUEST),
        1
    );
}

#[tokio::test]
async fn unreadable_bodies_are_rejected() {
    let mut h = Harness::new(FakeClient {
        routes: vec![frontend()],
        ..Default::default()
    });

    for path in ["/api/releases/bookinfo", "/api/virtual-services/bookinfo"] {
        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .body(ResetBody)
            .expect("request must be valid");
        let rsp = h.api.call(req).await.expect("request must be answered");
        let (status, body) = read_response(rsp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "failed to read request body: connection reset by peer" })
        );
    }

    assert!(h.client.updated.lock().is_empty());
    assert!(h.client.created.lock().is_empty());
    assert_eq!(
        h.metrics
            .request_count("releases", &Method::POST, StatusCode::BAD_REQUEST),
        1
    );
    assert_eq!(
        h.metrics
            .request_count("virtual-services", &Method::POST, StatusCode::BAD_REQUEST),
        1
    );
}

#[tokio::test]
async fn creates_route_objects() {
    let mut h = Harness::new(FakeClient::default());

    let obj = frontend();
    let (status, body) = h
        .send(
            Method::POST,
            "/api/virtual-services/bookinfo",
            &serde_json::to_string(&obj).unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["metadata"]["name"], "frontend");
    assert_eq!(*h.client.created.lock(), vec![obj]);
}

#[tokio::test]
async fn collaborator_failures_are_server_errors() {
    let mut h = Harness::new(FakeClient {
        unavailable: true,
        ..Default::default()
    });

    let (status, body) = h.get("/api/releases/bookinfo").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "error": "failed to list route objects: connection refused" })
    );

    let (status, _) = h
        .send(
            Method::POST,
            "/api/releases/bookinfo",
            &json!({ "id": "r2" }).to_string(),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn parses_routes() {
    assert_eq!(Route::parse("/health"), Some(Route::Health));
    assert_eq!(Route::parse("/health/"), Some(Route::Health));
    assert_eq!(
        Route::parse("/api/pods/bookinfo/r1"),
        Some(Route::Pods("bookinfo", Some("r1")))
    );
    assert_eq!(
        Route::parse("/api/virtual-services/bookinfo"),
        Some(Route::VirtualServices("bookinfo"))
    );
    assert_eq!(Route::parse("/api/releases"), None);
    assert_eq!(Route::parse("/api/releases/a/b"), None);
    assert_eq!(Route::parse("/"), None);
}
