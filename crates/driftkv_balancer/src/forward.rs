//! HTTP forwarding: proxies an inbound request to its routed backend.

use crate::config::BalancerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{BalancerError, BalancerResult};
use crate::health::HealthOracle;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

/// Response header naming the backend a traced request was served by.
const LB_FROM: &str = "lb-from";

/// Shared state for the balancer's request handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub oracle: Arc<HealthOracle>,
    pub client: reqwest::Client,
    pub config: Arc<BalancerConfig>,
}

/// Fallback handler: route the path, forward the request, stream the
/// response back.
///
/// Routing and transport failures both yield `503 Service Unavailable`;
/// no retry against another backend is attempted, the hashing discipline
/// takes precedence.
pub(crate) async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let path = request.uri().path().to_string();

    let backend = match state.dispatcher.route(&path) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "no backend available");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    };

    match proxy(&state, &backend, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(backend = %backend, path = %path, error = %e, "forward failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// Forwards `request` verbatim to `backend` and rebuilds the response.
async fn proxy(state: &AppState, backend: &str, request: Request) -> BalancerResult<Response> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let url = format!("{}://{}{}", state.config.scheme(), backend, path_and_query);

    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(BalancerError::Body)?;

    // The Host header must name the backend, not the balancer; reqwest
    // sets it from the URL.
    let mut headers = parts.headers;
    headers.remove(header::HOST);

    let upstream = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body_bytes)
        .timeout(state.config.timeout)
        .send()
        .await
        .map_err(|source| BalancerError::Forward {
            backend: backend.to_string(),
            source,
        })?;

    tracing::info!(status = %upstream.status(), url = %url, "fwd");

    let mut response = Response::builder().status(upstream.status());
    if let Some(headers_out) = response.headers_mut() {
        for (name, value) in upstream.headers() {
            // Hop-by-hop headers are per-connection and must not be copied.
            if name == header::CONNECTION || name == header::TRANSFER_ENCODING {
                continue;
            }
            headers_out.append(name.clone(), value.clone());
        }

        if state.config.trace {
            let value = HeaderValue::try_from(backend).map_err(axum::http::Error::from)?;
            headers_out.insert(HeaderName::from_static(LB_FROM), value);
        }
    }

    Ok(response.body(Body::from_stream(upstream.bytes_stream()))?)
}
