use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use snowcat_router::{preferred_status, Dispatcher, MockResponse, RouteTable};
use snowcat_telemetry::log_request_completed;

/// Answer every request from `dispatcher`, with permissive CORS.
pub fn mock_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(handle)
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// One `METHOD\tSTATUS\tPATTERN` line per route, in dispatch order.
pub fn route_lines(table: &RouteTable) -> Vec<String> {
    table
        .iter()
        .map(|route| format!("{}\t{}\t{}", route.method, route.status, route.pattern))
        .collect()
}

async fn handle(
    State(dispatcher): State<Arc<Dispatcher>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let prefer = headers
        .get("prefer")
        .and_then(|value| value.to_str().ok())
        .and_then(preferred_status);

    let mock = dispatcher.dispatch_preferring(method.as_str(), uri.path(), prefer);
    log_request_completed!(
        method = %method,
        path = %uri.path(),
        status = mock.status,
        "mock request"
    );
    into_response(mock)
}

fn into_response(mock: MockResponse) -> Response {
    let mut headers = HeaderMap::new();
    for header in &mock.headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::try_from(header.name.as_str()),
            HeaderValue::try_from(header.value.as_str()),
        ) else {
            tracing::debug!(header = %header.name, "skipping invalid declared header");
            continue;
        };
        // Framing headers are computed from the actual body.
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        headers.append(name, value);
    }

    let mut response = Response::new(Body::from(mock.body));
    *response.status_mut() =
        StatusCode::from_u16(mock.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    *response.headers_mut() = headers;
    response
}
