//! Admission webhook server.
//!
//! Serves one POST endpoint per registered gate. To enable the webhook:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a ValidatingWebhookConfiguration with one webhook per protected
//!    kind, pointing at the gate's route and matching only CREATE
//! 3. Mount the TLS certificate secret to the pod at /etc/webhook/certs/

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::gate::singleton::SingletonGate;
use crate::gate::store::InstanceLister;
use crate::gate::verdict::Verdict;
use crate::health::HealthState;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;

/// Shared state for one gate's handler
pub struct WebhookState<L> {
    pub gate: Arc<SingletonGate<L>>,
    pub health: Option<Arc<HealthState>>,
}

/// Query parameters the API server appends to webhook calls
#[derive(Debug, Default, Deserialize)]
pub struct WebhookParams {
    /// Caller deadline, e.g. `10s`
    pub timeout: Option<String>,
}

/// Parse the API server's `timeout` query value (`10s`, `500ms`, `1m`).
pub fn parse_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Some(ms) = value.strip_suffix("ms") {
        return ms.parse().ok().map(Duration::from_millis);
    }
    if let Some(secs) = value.strip_suffix('s') {
        return secs.parse().ok().map(Duration::from_secs);
    }
    if let Some(mins) = value.strip_suffix('m') {
        return mins
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs);
    }
    None
}

/// Create the router serving a single gate under its route
pub fn gate_router<L: InstanceLister>(state: Arc<WebhookState<L>>) -> Router {
    let route = state.gate.route();
    Router::new()
        .route(&route, axum::routing::post(admit::<L>))
        .with_state(state)
}

/// Admission handler shared by every gate route
async fn admit<L: InstanceLister>(
    State(state): State<Arc<WebhookState<L>>>,
    Query(params): Query<WebhookParams>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> impl IntoResponse {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e))
                        .into_review(),
                ),
            );
        }
    };

    let uid = request.uid.clone();
    let timeout = params.timeout.as_deref().and_then(|t| {
        let parsed = parse_timeout(t);
        if parsed.is_none() {
            debug!(uid = %uid, timeout = %t, "Ignoring unparseable timeout");
        }
        parsed
    });

    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = %request.name,
        route = %state.gate.route(),
        "Processing admission request"
    );

    let started = Instant::now();
    let verdict = state.gate.handle_with_timeout(&request, timeout).await;
    let elapsed = started.elapsed().as_secs_f64();

    if let Some(health) = &state.health {
        health
            .metrics
            .record_admission(&state.gate.identity().to_string(), verdict.label(), elapsed);
    }

    match &verdict {
        Verdict::Allow => debug!(uid = %uid, "Admission request allowed"),
        Verdict::Deny(reason) => {
            warn!(uid = %uid, namespace = ?request.namespace, reason = %reason, "Admission request denied")
        }
        Verdict::Error(e) => {
            error!(
                uid = %uid,
                namespace = ?request.namespace,
                error = %e,
                retryable = e.is_retryable(),
                "Admission request errored"
            )
        }
    }

    (
        StatusCode::OK,
        Json(verdict.into_response(&request).into_review()),
    )
}

/// Run the webhook server with TLS on `0.0.0.0:<port>`.
///
/// TLS certificates are loaded from the given PEM files.
pub async fn run_webhook_server(
    app: Router,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| Error::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| Error::Server(e.to_string()))?;

    Ok(())
}
