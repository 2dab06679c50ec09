// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the fleetrbac operator.
//!
//! This module provides metrics collection with the namespace prefix
//! `fleetrbac_firestoned_io_` (prometheus-safe version of "fleetrbac.firestoned.io").
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Remote Object Metrics** - Track RBAC objects written to and deleted from remote clusters
//! - **Propagation Metrics** - Track per-cluster propagation state and failure reasons
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetrbac::metrics::record_reconciliation_success;
//!
//! // Record a successful reconciliation
//! record_reconciliation_success("TeamRoleBinding", std::time::Duration::from_secs(1));
//! ```

use crate::constants::{HEALTHZ_PATH, METRICS_SERVER_PATH};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all fleetrbac metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "fleetrbac_firestoned_io";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource (e.g., `TeamRoleBinding`)
/// - `status`: Outcome (`success`, `error`, `requeue`)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliations by resource type and status",
    );
    let counter = CounterVec::new(opts, &["resource_type", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`ready`, `degraded`, `deletion`, `error`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_requeues_total"),
        "Total number of requeue operations by resource type and reason",
    );
    let counter = CounterVec::new(opts, &["resource_type", "reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Remote Object Metrics
// ============================================================================

/// Total number of operations on remote RBAC objects
///
/// Labels:
/// - `cluster`: Remote cluster name
/// - `kind`: `ClusterRole`, `ClusterRoleBinding` or `RoleBinding`
/// - `result`: `created`, `updated`, `none`, `deleted` or `error`
pub static REMOTE_OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_remote_operations_total"),
        "Total number of operations on remote RBAC objects by cluster, kind and result",
    );
    let counter = CounterVec::new(opts, &["cluster", "kind", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Propagation Metrics
// ============================================================================

/// Total number of per-cluster or whole-binding propagation failures
///
/// Labels:
/// - `reason`: Status condition reason (e.g., `ClusterConnectionFailed`)
pub static PROPAGATION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_propagation_failures_total"),
        "Total number of propagation failures by reason",
    );
    let counter = CounterVec::new(opts, &["reason"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Clusters tracked by a binding, split by readiness
///
/// Labels:
/// - `namespace`: Hub namespace of the binding
/// - `binding`: `TeamRoleBinding` name
/// - `state`: `ready` or `failed`
pub static PROPAGATION_CLUSTERS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_propagation_clusters"),
        "Number of clusters a TeamRoleBinding is propagated to, by state",
    );
    let gauge = GaugeVec::new(opts, &["namespace", "binding", "state"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `resource_type` - The kind of resource reconciled (e.g., `TeamRoleBinding`)
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record the result of a remote create, update, delete or failure
///
/// # Arguments
/// * `cluster` - Remote cluster name
/// * `kind` - RBAC kind touched
/// * `result` - `created`, `updated`, `none`, `deleted` or `error`
pub fn record_remote_operation(cluster: &str, kind: &str, result: &str) {
    REMOTE_OPERATIONS_TOTAL
        .with_label_values(&[cluster, kind, result])
        .inc();
}

/// Record a propagation failure by condition reason
pub fn record_propagation_failure(reason: &str) {
    PROPAGATION_FAILURES_TOTAL
        .with_label_values(&[reason])
        .inc();
}

/// Publish how many clusters a binding tracks and how many of them are ready
pub fn set_propagation_clusters(namespace: &str, binding: &str, ready: usize, failed: usize) {
    #[allow(clippy::cast_precision_loss)]
    {
        PROPAGATION_CLUSTERS
            .with_label_values(&[namespace, binding, "ready"])
            .set(ready as f64);
        PROPAGATION_CLUSTERS
            .with_label_values(&[namespace, binding, "failed"])
            .set(failed as f64);
    }
}

/// Drop the per-binding gauges once a binding is deleted
pub fn clear_propagation_clusters(namespace: &str, binding: &str) {
    for state in ["ready", "failed"] {
        let _ = PROPAGATION_CLUSTERS.remove_label_values(&[namespace, binding, state]);
    }
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

async fn metrics_handler() -> (StatusCode, String) {
    match gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// HTTP routes for `/metrics` and `/healthz`
pub fn metrics_router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTHZ_PATH, get(healthz_handler))
}

/// Serve [`metrics_router`] until the listener fails
///
/// # Errors
/// Returns error if the address cannot be bound or the server stops
pub async fn serve_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);
    axum::serve(listener, metrics_router()).await?;
    Ok(())
}
