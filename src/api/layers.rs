//! Common HTTP middleware layers used by the API service.

use axum::body::Body;
use axum::response::Response;
use http::Request;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, DefaultOnFailure, DefaultOnRequest, HttpMakeClassifier,
    TraceLayer,
};
use tracing::{Level, Span};

/// Create a permissive CORS layer allowing any origin and HTTP method.
pub fn cors() -> CorsLayer {
    CorsLayer::new().allow_methods(Any {}).allow_origin(Any {})
}

/// Configure request/response tracing with structured spans and logs.
#[allow(clippy::type_complexity)]
pub fn tracing() -> TraceLayer<
    HttpMakeClassifier,
    impl Fn(&Request<Body>) -> Span + Clone,
    DefaultOnRequest,
    impl Fn(&Response<Body>, Duration, &Span) + Clone,
> {
    TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::span!(
                Level::INFO,
                "request",
                method = ?req.method(),
                uri = %req.uri()
            )
        })
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(
            |res: &http::Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = %res.status(),
                    latency=%latency.as_millis(),
                    "finished processing request"
                );
            },
        )
        .on_body_chunk(DefaultOnBodyChunk::new())
        .on_eos(DefaultOnEos::new().level(Level::DEBUG))
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}
