// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use fleetrbac::{
    config::OperatorConfig,
    constants::{KIND_TEAM_ROLE_BINDING, TOKIO_WORKER_THREADS},
    context::Context,
    crd::{Cluster, Team, TeamRole, TeamRoleBinding},
    metrics::{
        record_reconciliation_error, record_reconciliation_requeue, record_reconciliation_success,
        serve_metrics,
    },
    reconcilers::{reconcile_teamrolebinding, ReconcileResult},
    selector::{cluster_mapper, team_mapper, team_role_mapper},
};
use futures::StreamExt;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    runtime::{
        controller::{self, Action},
        watcher::Config,
        Controller,
    },
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let config = OperatorConfig::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("fleetrbac-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_logging() {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging();

    info!("Starting fleetrbac controller");
    debug!(?config, "Loaded configuration");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Arc::new(Context::new(client.clone(), config.clone()));

    // Neither task should ever exit; if one does, the process exits with it
    tokio::select! {
        result = serve_metrics(config.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("metrics server exited unexpectedly without error")
        }
        result = run_teamrolebinding_controller(client, ctx) => {
            error!("CRITICAL: TeamRoleBinding controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("TeamRoleBinding controller exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed");
            Ok(())
        }
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix (pod termination).
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, shutting down");
    }
    Ok(())
}

/// `Api` over one namespace, or all of them.
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Debug,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `TeamRoleBinding` controller
///
/// Changes to a `TeamRole`, `Team` or `Cluster` re-trigger every binding that
/// depends on it, found by filtering the controller's own binding cache.
async fn run_teamrolebinding_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting TeamRoleBinding controller");

    let namespace = ctx.config.watch_namespace.clone();
    let ns = namespace.as_deref();

    let controller = Controller::new(scoped_api::<TeamRoleBinding>(&client, ns), Config::default())
        .with_config(controller::Config::default().concurrency(ctx.config.concurrency));
    let store = controller.store();

    controller
        .watches(
            scoped_api::<TeamRole>(&client, ns),
            Config::default(),
            team_role_mapper(store.clone()),
        )
        .watches(
            scoped_api::<Team>(&client, ns),
            Config::default(),
            team_mapper(store.clone()),
        )
        .watches(
            scoped_api::<Cluster>(&client, ns),
            Config::default(),
            cluster_mapper(store),
        )
        .run(reconcile_teamrolebinding_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `TeamRoleBinding`
async fn reconcile_teamrolebinding_wrapper(
    binding: Arc<TeamRoleBinding>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let namespace = binding.namespace().unwrap_or_default();
    let name = binding.name_any();

    match reconcile_teamrolebinding(ctx.clone(), (*binding).clone()).await {
        Ok(result) => {
            record_reconciliation_success(KIND_TEAM_ROLE_BINDING, start.elapsed());
            match result {
                ReconcileResult::DeletionPending => {
                    record_reconciliation_requeue(KIND_TEAM_ROLE_BINDING, "deletion_pending");
                }
                ReconcileResult::Deleted => {
                    info!("TeamRoleBinding {}/{} deleted", namespace, name);
                }
                ReconcileResult::Ready | ReconcileResult::Empty => {
                    debug!("TeamRoleBinding {}/{} reconciled: {:?}", namespace, name, result);
                }
            }
            Ok(requeue_action(result, &ctx.config))
        }
        Err(e) => {
            record_reconciliation_error(KIND_TEAM_ROLE_BINDING, start.elapsed());
            error!(
                "Failed to reconcile TeamRoleBinding {}/{}: {:#}",
                namespace, name, e
            );
            Err(e.into())
        }
    }
}

/// Requeue interval for a successful reconciliation
fn requeue_action(result: ReconcileResult, config: &OperatorConfig) -> Action {
    match result {
        ReconcileResult::Ready => Action::requeue(config.requeue_ready()),
        ReconcileResult::Empty => Action::requeue(config.requeue_degraded()),
        ReconcileResult::DeletionPending => Action::requeue(config.requeue_deletion()),
        ReconcileResult::Deleted => Action::await_change(),
    }
}

/// Error policy for controller
fn error_policy(
    _resource: Arc<TeamRoleBinding>,
    _err: &ReconcileError,
    ctx: Arc<Context>,
) -> Action {
    record_reconciliation_requeue(KIND_TEAM_ROLE_BINDING, "error");
    Action::requeue(ctx.config.requeue_error())
}
