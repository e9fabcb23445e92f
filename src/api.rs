use crate::config;
use crate::engine::Engine;
use crate::order::book::ladder::Ladder;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
pub mod layers;
mod orders;
mod validation;

/// Shared handler state: the engine over the production book.
pub type BookEngine = Arc<Engine<Ladder>>;

#[derive(OpenApi)]
#[openapi(
    info(title = "Matchbook API", version = "1.0.0"),
    nest(
        (path = "/api/v1", api = orders::OrdersApi)
    )
)]
pub struct ApiDoc;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to setup Prometheus recorder: {0}")]
    PrometheusSetup(#[from] metrics_exporter_prometheus::BuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn start(
    cfg: &config::ApiConfig,
    engine: BookEngine,
    cancellation_token: CancellationToken,
) -> Result<(), ApiError> {
    let api_router = Router::new().merge(orders::router()).with_state(engine);

    let prom_handle = PrometheusBuilder::new().install_recorder()?;
    let app = Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/metrics", get(|| async move { prom_handle.render() }))
        .nest("/api/v1", api_router)
        .layer(layers::cors())
        .layer(layers::tracing());

    let listener = tokio::net::TcpListener::bind((cfg.host.clone(), cfg.port)).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
        })
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
