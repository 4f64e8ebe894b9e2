//! Server crate provides HTTP server functionality.
//!
//! This module implements an HTTP server for submitting gift batches,
//! looking up recorded submissions, and exposing health and metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{MatchedPath, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cache::SubmissionCache;
use model::{GiftBatch, SubmissionResult};
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use serde::Serialize;
use service::{GiftOrderService, ServiceError};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

/// Server represents an HTTP server for submitting gift batches.
pub struct Server {
    service: Arc<dyn GiftOrderService>,
    cache: Arc<SubmissionCache>,
    port: String,
    metrics: Arc<Metrics>,
}

/// Metrics collects and exposes HTTP server and submission metrics.
struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
    recipient_outcomes_total: CounterVec,
}

impl Metrics {
    fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )
        .expect("Failed to create http_requests_total metric");

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "endpoint"],
        )
        .expect("Failed to create http_request_duration_seconds metric");

        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of errors"),
            &["source", "endpoint"],
        )
        .expect("Failed to create errors_total metric");

        let recipient_outcomes_total = CounterVec::new(
            Opts::new(
                "recipient_outcomes_total",
                "Fulfillment outcomes per recipient",
            ),
            &["outcome"],
        )
        .expect("Failed to create recipient_outcomes_total metric");

        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("Failed to register http_requests_total metric");
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .expect("Failed to register http_request_duration_seconds metric");
        registry
            .register(Box::new(errors_total.clone()))
            .expect("Failed to register errors_total metric");
        registry
            .register(Box::new(recipient_outcomes_total.clone()))
            .expect("Failed to register recipient_outcomes_total metric");

        Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
            recipient_outcomes_total,
        }
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.http_requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, source: &str, endpoint: &str) {
        self.errors_total.with_label_values(&[source, endpoint]).inc();
    }

    fn record_outcomes(&self, result: &SubmissionResult) {
        self.recipient_outcomes_total
            .with_label_values(&["confirmed"])
            .inc_by(result.confirmed_count() as f64);
        self.recipient_outcomes_total
            .with_label_values(&["failed"])
            .inc_by(result.failed_count() as f64);
    }
}

/// Body returned for a recipient's fulfillment-order lookup.
#[derive(Serialize)]
struct RecipientOrderResponse {
    recipient_id: String,
    fulfillment_order_id: String,
}

/// Body returned for a processed batch.
#[derive(Serialize)]
struct SubmitResponse {
    message: String,
    result: SubmissionResult,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `service` - The order service that submits batches
    /// * `cache` - Store of recorded submissions
    pub fn new(
        port: String,
        service: Arc<dyn GiftOrderService>,
        cache: Arc<SubmissionCache>,
    ) -> Self {
        info!("Initializing HTTP server on port {}", port);

        Self {
            service,
            cache,
            port,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let metrics = self.metrics.clone();

        Router::new()
            .route(
                "/api/gift-batches",
                post(Self::handle_submit_batch).get(Self::handle_get_submissions),
            )
            .route("/api/gift-batches/{id}", get(Self::handle_get_submission))
            .route(
                "/api/recipients/{id}/fulfillment-order",
                get(Self::handle_get_recipient_order),
            )
            .route("/api/reconciliation", get(Self::handle_get_unreconciled))
            .route("/health", get(Self::handle_health))
            .route("/metrics", get(Self::handle_metrics))
            .layer(axum::middleware::from_fn_with_state(
                metrics.clone(),
                Self::metrics_middleware,
            ))
            .with_state(AppState {
                service: self.service.clone(),
                cache: self.cache.clone(),
                metrics,
            })
    }

    /// Middleware for collecting metrics on HTTP requests, labelled by route template
    async fn metrics_middleware(
        State(metrics): State<Arc<Metrics>>,
        req: axum::extract::Request,
        next: axum::middleware::Next,
    ) -> Response {
        let method = req.method().to_string();
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched| matched.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());

        let start = std::time::Instant::now();
        let response = next.run(req).await;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        metrics.record_request(&method, &path, status, duration);
        if status >= 400 {
            metrics.record_error("http", &path);
        }

        response
    }

    async fn handle_submit_batch(
        State(state): State<AppState>,
        Json(batch): Json<GiftBatch>,
    ) -> Response {
        info!(
            recipients = batch.recipients.len(),
            "Received gift batch submission"
        );

        match state.service.submit(&batch).await {
            Ok(result) => {
                state.metrics.record_outcomes(&result);
                let record = state.cache.set(result).await;
                let response = SubmitResponse {
                    message: record.result.summary(),
                    result: record.result,
                };
                (StatusCode::OK, Json(response)).into_response()
            }
            Err(ServiceError::InvalidBatch(reason)) => {
                warn!("Rejected gift batch: {}", reason);
                (StatusCode::BAD_REQUEST, reason).into_response()
            }
            Err(err @ ServiceError::Billing(_)) => {
                error!("Gift batch failed: {}", err);
                state.metrics.record_error("billing", "/api/gift-batches");
                (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
            }
        }
    }

    async fn handle_get_submission(
        State(state): State<AppState>,
        Path(billing_order_id): Path<String>,
    ) -> Response {
        info!("Received submission request for billing order: {}", billing_order_id);

        match state.cache.get(&billing_order_id).await {
            Some(record) => (StatusCode::OK, Json(record)).into_response(),
            None => {
                warn!("Submission not found: {}", billing_order_id);
                (StatusCode::NOT_FOUND, "submission not found").into_response()
            }
        }
    }

    async fn handle_get_recipient_order(
        State(state): State<AppState>,
        Path(recipient_id): Path<String>,
    ) -> Response {
        match state.cache.fulfillment_order_id(&recipient_id).await {
            Some(fulfillment_order_id) => (
                StatusCode::OK,
                Json(RecipientOrderResponse {
                    recipient_id,
                    fulfillment_order_id,
                }),
            )
                .into_response(),
            None => {
                warn!("No fulfillment order recorded for recipient: {}", recipient_id);
                (StatusCode::NOT_FOUND, "fulfillment order not found").into_response()
            }
        }
    }

    async fn handle_get_submissions(State(state): State<AppState>) -> Response {
        let records = state.cache.get_all().await;
        (StatusCode::OK, Json(records)).into_response()
    }

    async fn handle_get_unreconciled(State(state): State<AppState>) -> Response {
        let failures = state.cache.unreconciled().await;
        (StatusCode::OK, Json(failures)).into_response()
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<AppState>) -> Response {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&state.metrics.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
        }

        match String::from_utf8(buffer) {
            Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
            Err(e) => {
                error!("Failed to convert metrics to UTF-8: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid metrics data").into_response()
            }
        }
    }
}

/// Application state shared between request handlers
#[derive(Clone)]
struct AppState {
    service: Arc<dyn GiftOrderService>,
    cache: Arc<SubmissionCache>,
    metrics: Arc<Metrics>,
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use commerce::CommerceError;
    use model::{BillingOrder, FulfillmentFailure, FulfillmentOrder, Money, RecipientOutcome};
    use tower::ServiceExt;

    /// What the stubbed order service answers.
    #[derive(Clone, Copy)]
    enum Answer {
        PartialSuccess,
        BillingDown,
    }

    struct StubService(Answer);

    #[async_trait]
    impl GiftOrderService for StubService {
        async fn submit(&self, batch: &GiftBatch) -> Result<SubmissionResult, ServiceError> {
            if batch.recipients.is_empty() {
                return Err(ServiceError::InvalidBatch("batch has no recipients".into()));
            }
            match self.0 {
                Answer::BillingDown => Err(ServiceError::Billing(CommerceError::Api {
                    status: 503,
                    body: "unavailable".into(),
                })),
                Answer::PartialSuccess => Ok(SubmissionResult {
                    billing_order: BillingOrder {
                        id: "900".into(),
                        number: "#D12".into(),
                        total: Money::from_dollars(138),
                    },
                    outcomes: batch
                        .recipients
                        .iter()
                        .enumerate()
                        .map(|(i, r)| {
                            if i % 2 == 0 {
                                RecipientOutcome::Confirmed(FulfillmentOrder {
                                    id: format!("50{i}"),
                                    number: format!("#100{i}"),
                                    recipient_id: r.id.clone(),
                                    billing_order_id: "900".into(),
                                })
                            } else {
                                RecipientOutcome::Failed(FulfillmentFailure {
                                    recipient_id: r.id.clone(),
                                    reason: "Shopify API error: 422 - bad zip".into(),
                                })
                            }
                        })
                        .collect(),
                }),
            }
        }
    }

    fn create_test_server(answer: Answer) -> Server {
        Server::new(
            "8080".to_string(),
            Arc::new(StubService(answer)),
            Arc::new(SubmissionCache::new()),
        )
    }

    const BATCH_JSON: &str = r#"{
        "sender": {"name": "Dana Cole", "email": "dana@acme.test", "phone": "+1 305 555 0100"},
        "delivery_date": "2025-12-25",
        "recipients": [
            {"id": "r-1", "name": "Sam Lee",
             "address": {"address1": "100 Biscayne Blvd", "city": "Miami", "state": "FL", "zip": "33132"}},
            {"id": "r-2", "name": "Ana Ruiz",
             "address": {"address1": "1 Ocean Dr", "city": "Miami Beach", "state": "FL", "zip": "33139"}}
        ]
    }"#;

    fn post_batch(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/gift-batches")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_server_creation() {
        let server = create_test_server(Answer::PartialSuccess);
        assert_eq!(server.port, "8080");
    }

    #[tokio::test]
    async fn test_submit_reports_partial_success_and_records_it() {
        let server = create_test_server(Answer::PartialSuccess);
        let app = server.create_router();

        let response = app.clone().oneshot(post_batch(BATCH_JSON)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["message"], "1 of 2 recipients confirmed");
        assert_eq!(body["result"]["outcomes"][1]["status"], "failed");

        let response = app.clone().oneshot(get("/api/gift-batches/900")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get("/api/recipients/r-1/fulfillment-order"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["fulfillment_order_id"], "500");

        let response = app
            .clone()
            .oneshot(get("/api/recipients/r-2/fulfillment-order"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.clone().oneshot(get("/api/reconciliation")).await.unwrap();
        let failures: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(failures[0]["recipient_id"], "r-2");

        let response = app.oneshot(get("/metrics")).await.unwrap();
        let text = body_string(response).await;
        assert!(text.contains("recipient_outcomes_total{outcome=\"confirmed\"} 1"));
        assert!(text.contains("recipient_outcomes_total{outcome=\"failed\"} 1"));
    }

    #[tokio::test]
    async fn test_billing_failure_maps_to_bad_gateway() {
        let server = create_test_server(Answer::BillingDown);
        let app = server.create_router();

        let response = app.clone().oneshot(post_batch(BATCH_JSON)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app.oneshot(get("/api/gift-batches")).await.unwrap();
        assert_eq!(body_string(response).await, "[]");
    }

    #[tokio::test]
    async fn test_empty_batch_is_bad_request() {
        let app = create_test_server(Answer::PartialSuccess).create_router();
        let body = r#"{"sender": {"name": "A", "email": "a@b.c", "phone": "1"}, "recipients": []}"#;
        let response = app.oneshot(post_batch(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_batch_is_rejected() {
        let app = create_test_server(Answer::PartialSuccess).create_router();
        let response = app
            .oneshot(post_batch(r#"{"sender": {}, "recipients": "nope"}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_metrics_are_labelled_by_route_template() {
        let app = create_test_server(Answer::PartialSuccess).create_router();

        for id in ["a-1", "a-2", "a-3"] {
            let uri = format!("/api/gift-batches/{id}");
            let response = app.clone().oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
        let response = app.clone().oneshot(get("/no/such/route")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/metrics")).await.unwrap();
        let text = body_string(response).await;
        assert!(text.contains(
            "http_requests_total{endpoint=\"/api/gift-batches/{id}\",method=\"GET\",status=\"404\"} 3"
        ));
        assert!(text.contains("endpoint=\"unmatched\""));
        assert!(!text.contains("a-1"));
    }

    #[tokio::test]
    async fn test_unknown_submission_and_health() {
        let app = create_test_server(Answer::PartialSuccess).create_router();

        let response = app.clone().oneshot(get("/api/gift-batches/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }
}
