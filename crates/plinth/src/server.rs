// ── HTTP dispatch ──
//
// A single fallback handler serves every unit route. The route table is
// loaded once per request, so a request that starts before a publish
// finishes against the table it started with.

use axum::{
    Json, Router,
    extract::State,
    http::{Method, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use plinth_core::{Host, Reply, RouteInfo, RouteRequest};

/// Debug listing of the current routes, mounted in dev mode only.
pub const ROUTES_PATH: &str = "/_plinth/routes";

pub fn router(host: Host, dev: bool) -> Router {
    let mut router = Router::new();
    if dev {
        router = router.route(ROUTES_PATH, get(list_routes));
    }
    router
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(host)
}

async fn dispatch(State(host): State<Host>, method: Method, uri: Uri) -> Response {
    let table = host.current();
    let mut request = RouteRequest::new(method, uri.path());
    request.query = uri.query().map(str::to_owned);

    let reply = table
        .dispatch(&request)
        .unwrap_or_else(|| Reply::not_found(uri.path()));
    (reply.status, Json(reply.body)).into_response()
}

#[derive(Debug, Serialize)]
struct RouteListing {
    revision: u64,
    units: Vec<String>,
    routes: Vec<RouteInfo>,
}

async fn list_routes(State(host): State<Host>) -> Json<RouteListing> {
    let published = host.published();
    Json(RouteListing {
        revision: published.revision,
        units: published.table.units().into_iter().map(str::to_owned).collect(),
        routes: published.table.describe(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use plinth_core::ConfigSnapshot;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn host() -> Host {
        let host = Host::new(plinth_units::builtin_registry().unwrap());
        host.apply(&ConfigSnapshot::new(["order"])).unwrap();
        host
    }

    async fn call(router: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn dispatches_to_unit_route() {
        let (status, body) = call(router(host(), false), Method::GET, "/order?id=7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "msg": "Order module using DSN: memory://default" })
        );
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = call(router(host(), false), Method::GET, "/user").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "not found", "path": "/user" }));
    }

    #[tokio::test]
    async fn wrong_method_is_404() {
        let (status, _) = call(router(host(), false), Method::POST, "/auth").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn route_listing_only_in_dev_mode() {
        let (status, _) = call(router(host(), false), Method::GET, ROUTES_PATH).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(router(host(), true), Method::GET, ROUTES_PATH).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], json!(1));
        assert_eq!(body["units"], json!(["auth", "order"]));
        assert_eq!(body["routes"][1]["path"], json!("/order"));
    }

    #[tokio::test]
    async fn requests_see_newly_published_routes() {
        let host = host();
        let app = router(host.clone(), false);

        host.apply(&ConfigSnapshot::new(["user"])).unwrap();

        let (status, _) = call(app.clone(), Method::GET, "/user").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(app, Method::GET, "/order").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
