//! Prometheus metrics definitions and HTTP server

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, CounterVec, Encoder,
    Histogram, HistogramVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info};

lazy_static::lazy_static! {
    /// Total number of reconciliations
    pub static ref RECONCILIATIONS: CounterVec = register_counter_vec!(
        "xtradb_backup_operator_reconciliations_total",
        "Total number of reconciliations",
        &["kind"]
    ).unwrap();

    /// Total number of reconciliation errors
    pub static ref RECONCILIATION_ERRORS: CounterVec = register_counter_vec!(
        "xtradb_backup_operator_reconciliation_errors_total",
        "Total number of reconciliation errors by reason",
        &["kind", "reason"]
    ).unwrap();

    /// Reconciliation duration histogram
    pub static ref RECONCILE_DURATION: HistogramVec = register_histogram_vec!(
        "xtradb_backup_operator_reconcile_duration_seconds",
        "Duration of reconciliations in seconds",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]
    ).unwrap();

    /// Backup status writes by resulting state
    pub static ref BACKUP_STATES: CounterVec = register_counter_vec!(
        "xtradb_backup_operator_backup_state_transitions_total",
        "Backup status updates by resulting state",
        &["state", "namespace"]
    ).unwrap();

    /// Time spent waiting for backup volumes to bind
    pub static ref VOLUME_WAIT_DURATION: Histogram = register_histogram!(
        "xtradb_backup_operator_volume_wait_seconds",
        "Time spent waiting for a backup PVC to become Bound",
        vec![0.1, 1.0, 3.0, 6.0, 10.0, 15.0, 30.0]
    ).unwrap();

    /// Operator health (1 = healthy, 0 = unhealthy)
    pub static ref OPERATOR_HEALTH: prometheus::Gauge = prometheus::register_gauge!(
        "xtradb_backup_operator_health",
        "Operator health status (1 = healthy, 0 = unhealthy)"
    ).unwrap();
}

/// Start the metrics HTTP server
pub async fn serve(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    OPERATOR_HEALTH.set(1.0);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!("Error serving connection: {}", e);
            }
        });
    }
}

/// Handle HTTP requests
async fn handle_request(
    req: Request<hyper::body::Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    Ok(route(req.uri().path()))
}

fn route(path: &str) -> Response<Full<Bytes>> {
    match path {
        "/metrics" => metrics_response(),
        "/healthz" | "/health" | "/readyz" | "/ready" => text_response(StatusCode::OK, "ok"),
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

/// Generate metrics response
fn metrics_response() -> Response<Full<Bytes>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics");
    }

    let mut response = Response::new(Full::new(Bytes::from(buffer)));
    if let Ok(content_type) = encoder.format_type().parse() {
        response
            .headers_mut()
            .insert(hyper::header::CONTENT_TYPE, content_type);
    }
    response
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        assert_eq!(route("/healthz").status(), StatusCode::OK);
        assert_eq!(route("/readyz").status(), StatusCode::OK);
        assert_eq!(route("/nope").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_metrics_are_exposed() {
        RECONCILIATIONS.with_label_values(&["PerconaXtraDBBackup"]).inc();

        let response = route("/metrics");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(hyper::header::CONTENT_TYPE));
    }
}
