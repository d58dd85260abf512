//! HTTP API over the loaded engines.
//!
//! The engines are loaded once and shared behind an `Arc`; every request is
//! answered from that immutable state without locking.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::{InputError, ServerError};
use crate::estimation::{
    Advice, EngineSummary, Engines, PredictionInput, PredictionResult, Product, advise,
};

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: PredictionResult,
    pub advice: Advice,
}

#[derive(Debug, Serialize)]
pub struct ClientsResponse {
    pub product: Product,
    pub clients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, err: InputError) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn parse_product(raw: &str) -> Result<Product, ApiError> {
    raw.parse().map_err(|e| api_error(StatusCode::NOT_FOUND, e))
}

/// The estimator's HTTP API.
pub struct EstimatorApi;

impl EstimatorApi {
    /// Build the router.
    pub fn router(engines: Arc<Engines>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/products/{product}/clients", get(list_clients))
            .route("/products/{product}/summary", get(engine_summary))
            .route("/products/{product}/predict", post(predict))
            .layer(TraceLayer::new_for_http())
            .with_state(engines)
    }

    /// Serve until Ctrl-C.
    pub async fn start(engines: Arc<Engines>, addr: SocketAddr) -> Result<(), ServerError> {
        let router = Self::router(engines);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("Estimator API listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
            .await?;
        Ok(())
    }
}

/// Resolve once `signal` fires. If the signal cannot be installed, never resolve.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Estimator API shutting down"),
        Err(e) => {
            tracing::error!("Failed to install shutdown signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

// -- Handlers --

async fn health_check() -> &'static str {
    "ok"
}

async fn list_clients(
    State(engines): State<Arc<Engines>>,
    Path(product): Path<String>,
) -> Result<Json<ClientsResponse>, ApiError> {
    let product = parse_product(&product)?;
    let clients = engines
        .get(product)
        .clients()
        .into_iter()
        .map(str::to_string)
        .collect();
    Ok(Json(ClientsResponse { product, clients }))
}

async fn engine_summary(
    State(engines): State<Arc<Engines>>,
    Path(product): Path<String>,
) -> Result<Json<EngineSummary>, ApiError> {
    let product = parse_product(&product)?;
    Ok(Json(engines.get(product).summary()))
}

async fn predict(
    State(engines): State<Arc<Engines>>,
    Path(product): Path<String>,
    Json(input): Json<PredictionInput>,
) -> Result<Json<PredictResponse>, ApiError> {
    let product = parse_product(&product)?;
    input
        .validate()
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    let prediction = engines.get(product).predict(&input);
    tracing::debug!(
        "Predicted {}h ({}) for client '{}' on {}",
        prediction.central_hours,
        prediction.confidence,
        input.client,
        product
    );
    let advice = advise(&prediction);
    Ok(Json(PredictResponse { prediction, advice }))
}
