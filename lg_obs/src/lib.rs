//! ABOUTME: Metric registry for broadcast gauges plus observability endpoints
//! ABOUTME: Serves the Prometheus scrape, health and readiness routes

use actix_web::{
    dev::{ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, HttpResponse, Result as ActixResult,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

pub mod registry;

pub use registry::{MetricName, MetricRegistry, MetricSample};

/// Content type of the text exposition format
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Source of the readiness probe answer
///
/// The exporter is ready while it holds a credential it can poll with.
#[async_trait]
pub trait ReadinessCheck: Send + Sync + fmt::Debug {
    async fn is_ready(&self) -> bool;
}

/// Manually toggled readiness flag
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new(ready: bool) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(ready)),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl ReadinessCheck for ReadinessGate {
    async fn is_ready(&self) -> bool {
        self.get()
    }
}

/// Application state for observability endpoints
#[derive(Debug, Clone)]
pub struct ObsState {
    pub readiness: Arc<dyn ReadinessCheck>,
    pub metrics: Arc<MetricRegistry>,
}

impl ObsState {
    pub fn new(metrics: Arc<MetricRegistry>, readiness: Arc<dyn ReadinessCheck>) -> Self {
        Self { readiness, metrics }
    }
}

impl Default for ObsState {
    fn default() -> Self {
        Self::new(
            Arc::new(MetricRegistry::new()),
            Arc::new(ReadinessGate::default()),
        )
    }
}

/// Body of the health and readiness probes
#[derive(Debug, Serialize)]
struct ProbeStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl ProbeStatus {
    fn up(status: &'static str) -> Self {
        Self {
            status,
            reason: None,
        }
    }
}

/// Liveness: the process is serving requests
async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ProbeStatus::up("ok")))
}

/// Readiness: a credential is held, so cycles can reach the platform
async fn readiness(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    if state.readiness.is_ready().await {
        return Ok(HttpResponse::Ok().json(ProbeStatus::up("ready")));
    }

    tracing::debug!("Readiness probe while unauthorized");
    Ok(HttpResponse::ServiceUnavailable().json(ProbeStatus {
        status: "not ready",
        reason: Some("not authorized"),
    }))
}

/// Scrape: current gauge values in the text exposition format
async fn metrics(state: web::Data<ObsState>) -> ActixResult<HttpResponse> {
    let body = match state.metrics.encode() {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Metrics scrape failed");
            return Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to encode metrics"
            })));
        }
    };

    tracing::trace!(bytes = body.len(), "Metrics scraped");
    Ok(HttpResponse::Ok()
        .content_type(METRICS_CONTENT_TYPE)
        .body(body))
}

/// Register the observability routes; expects `web::Data<ObsState>` in app data
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(health))
        .route("/readyz", web::get().to(readiness))
        .route("/metrics", web::get().to(metrics));
}

/// Create a standalone observability service factory
pub fn create_service(
    state: ObsState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(Logger::default())
        .configure(configure)
}
