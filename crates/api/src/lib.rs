//! HTTP surface for the order fulfillment orchestrator.
//!
//! Exposes the workflow as `POST /orders/process`, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use axum::routing::{get, post};
use domain::Money;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{
    HttpWorker, HttpWorkerConfig, InMemoryInventoryWorker, InMemoryPaymentWorker,
    InMemoryShippingWorker, InMemoryTaxWorker, InventoryWorker, OrchestratorConfig,
    OrderOrchestrator, PaymentWorker, ShippingWorker, TaxWorker, WorkerKind,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, WorkerEndpoints};
use error::{ApiError, StartupError};
use routes::orders::{AppState, SharedOrchestrator, WorkerMode};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/process", post(routes::orders::process))
        .with_state(state)
        .merge(metrics_router)
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {uri}"))
}

/// Creates the application state from configuration.
///
/// Remote workers are used when their endpoints are configured, the
/// in-memory workers otherwise.
pub fn create_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let orchestrator_config = config.orchestrator_config();
    let (orchestrator, worker_mode) = match &config.workers {
        Some(endpoints) => (
            http_orchestrator(endpoints, config, orchestrator_config)?,
            WorkerMode::Http,
        ),
        None => (in_memory_orchestrator(orchestrator_config), WorkerMode::InMemory),
    };

    tracing::info!(
        workers = worker_mode.as_str(),
        currency = %config.currency,
        finalize_delay_ms = config.finalize_delay.as_millis() as u64,
        "orchestrator configured"
    );

    Ok(Arc::new(AppState {
        orchestrator,
        function_name: config.function_name.clone(),
        worker_mode,
    }))
}

/// Creates application state around caller-supplied workers.
pub fn create_state_with_workers(
    inventory: Arc<dyn InventoryWorker>,
    payment: Arc<dyn PaymentWorker>,
    shipping: Arc<dyn ShippingWorker>,
    tax: Arc<dyn TaxWorker>,
    orchestrator_config: OrchestratorConfig,
    function_name: impl Into<String>,
) -> Arc<AppState> {
    Arc::new(AppState {
        orchestrator: OrderOrchestrator::new(inventory, payment, shipping, tax, orchestrator_config),
        function_name: function_name.into(),
        worker_mode: WorkerMode::Injected,
    })
}

fn http_orchestrator(
    endpoints: &WorkerEndpoints,
    config: &Config,
    orchestrator_config: OrchestratorConfig,
) -> Result<SharedOrchestrator, StartupError> {
    let client = |kind: WorkerKind| -> Result<Arc<HttpWorker>, StartupError> {
        let worker_config = HttpWorkerConfig::new(endpoints.endpoint(kind))
            .with_timeout(config.worker_timeout)
            .with_max_attempts(config.worker_max_attempts);
        let worker = HttpWorker::new(kind, worker_config).map_err(|e| {
            StartupError::WorkerClient {
                worker: kind.worker_name(),
                message: e.to_string(),
            }
        })?;
        Ok(Arc::new(worker))
    };

    let inventory: Arc<dyn InventoryWorker> = client(WorkerKind::Inventory)?;
    let payment: Arc<dyn PaymentWorker> = client(WorkerKind::Payment)?;
    let shipping: Arc<dyn ShippingWorker> = client(WorkerKind::Shipping)?;
    let tax: Arc<dyn TaxWorker> = client(WorkerKind::Tax)?;

    Ok(OrderOrchestrator::new(
        inventory,
        payment,
        shipping,
        tax,
        orchestrator_config,
    ))
}

/// Demo workers: $5.00 flat shipping and a small state tax table.
fn in_memory_orchestrator(orchestrator_config: OrchestratorConfig) -> SharedOrchestrator {
    let inventory: Arc<dyn InventoryWorker> = Arc::new(InMemoryInventoryWorker::new());
    let payment: Arc<dyn PaymentWorker> = Arc::new(InMemoryPaymentWorker::new());
    let shipping: Arc<dyn ShippingWorker> =
        Arc::new(InMemoryShippingWorker::with_flat_cost(Money::from_cents(500)));
    let tax: Arc<dyn TaxWorker> = Arc::new(InMemoryTaxWorker::with_rates(DEMO_TAX_RATES));

    OrderOrchestrator::new(inventory, payment, shipping, tax, orchestrator_config)
}

const DEMO_TAX_RATES: [(&str, f64); 4] = [("WA", 0.1), ("CA", 0.0725), ("NY", 0.08), ("TX", 0.0625)];
