// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `TeamRoleBinding` reconciliation logic.
//!
//! One pass runs, in order:
//!
//! 1. Load the referenced `TeamRole` and `Team`, validate selector and subjects
//! 2. Resolve target clusters; selected clusters that are not ready are marked failed
//! 3. Clean up clusters that are tracked in status but no longer targeted
//! 4. Per target: prune objects the current spec no longer wants, then apply
//! 5. Aggregate per-cluster entries into `RBACReady` / `Ready`
//!
//! Cleanup always precedes apply. A failure on one cluster is recorded against that
//! cluster and never stops the others; the pass still fails afterwards so the
//! controller backs off. Whole-binding errors stop the pass before any cluster is
//! touched.
//!
//! Deletion is resumable: status entries are the only record of clusters that may
//! still hold objects, and the finalizer is released once none remain.

use super::applier::apply_to_cluster;
use super::cleanup::{cleanup_cluster, gc_stale_clusters, not_ready_error, prune_retained_cluster};
use super::desired::{build_desired, validate_subjects, DesiredState};
use super::finalizers::{ensure_finalizer, has_finalizer, is_being_deleted, remove_finalizer};
use super::status::{find_condition, TeamRoleBindingStatusUpdater};
use super::targets::{resolve_targets, validate_selector, Resolution};
use crate::constants::{CONDITION_TYPE_READY, STATUS_TRUE};
use crate::context::Context;
use crate::crd::{Cluster, TeamRoleBinding};
use crate::errors::PropagationError;
use crate::events::{actions, reasons, EventPublisher};
use crate::inventory::Inventory;
use crate::labels::FINALIZER_TEAM_ROLE_BINDING;
use crate::metrics::{
    clear_propagation_clusters, record_propagation_failure, set_propagation_clusters,
};
use crate::remote::ClusterClientFactory;
use crate::status_reasons::{MESSAGE_ALL_CLUSTERS_READY, REASON_ALL_CLUSTERS_READY};
use anyhow::{bail, Result};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a normal reconciliation pass achieved.
#[derive(Debug, Default)]
pub struct PropagationOutcome {
    /// Clusters the binding is now fully applied on
    pub ready: Vec<String>,
    /// Per-cluster failures, one per affected cluster
    pub failures: Vec<PropagationError>,
    /// Clusters the binding was removed from
    pub pruned: Vec<String>,
    /// No ready cluster is targeted
    pub empty: bool,
}

/// Progress of a deletion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// No cluster holds objects of the binding any more.
    Complete,
    /// Some clusters could not be cleaned yet; they remain in status.
    Pending,
}

/// Publish one Warning per failure.
pub async fn publish_failures(
    events: &dyn EventPublisher,
    object_ref: &ObjectReference,
    failures: &[PropagationError],
    action: &str,
) {
    for err in failures {
        events
            .publish(
                object_ref,
                EventType::Warning,
                err.reason(),
                action,
                Some(err.to_string()),
            )
            .await;
    }
}

/// Publish the Events of a normal reconciliation pass: a Warning per failed
/// cluster, a Normal per pruned cluster, and `AllClustersReady` when readiness
/// turns True.
pub async fn publish_outcome(
    events: &dyn EventPublisher,
    object_ref: &ObjectReference,
    outcome: &PropagationOutcome,
    was_ready: bool,
) {
    publish_failures(events, object_ref, &outcome.failures, actions::PROPAGATE).await;
    for cluster in &outcome.pruned {
        events
            .publish(
                object_ref,
                EventType::Normal,
                reasons::CLUSTER_PRUNED,
                actions::CLEANUP,
                Some(format!("RBAC objects removed from cluster {cluster}")),
            )
            .await;
    }
    if outcome.failures.is_empty() && !outcome.empty && !was_ready {
        events
            .publish(
                object_ref,
                EventType::Normal,
                REASON_ALL_CLUSTERS_READY,
                actions::PROPAGATE,
                Some(MESSAGE_ALL_CLUSTERS_READY.to_string()),
            )
            .await;
    }
}

/// What a deletion pass achieved.
#[derive(Debug)]
pub struct TeardownReport {
    pub outcome: TeardownOutcome,
    /// Clusters that still hold, or may hold, objects of the binding
    pub failures: Vec<PropagationError>,
}

/// Result of [`reconcile_teamrolebinding`], used to pick the requeue interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Applied on every target
    Ready,
    /// Nothing targeted
    Empty,
    /// Deletion waits for clusters that could not be cleaned
    DeletionPending,
    /// Deletion finished (or the finalizer was already gone)
    Deleted,
}

fn record_failure(
    updater: &mut TeamRoleBindingStatusUpdater,
    failures: &mut Vec<PropagationError>,
    cluster: &str,
    err: PropagationError,
) {
    warn!("{}", err);
    record_propagation_failure(err.reason());
    updater.set_cluster_failed(cluster, &err);
    failures.push(err);
}

/// Bring one target cluster to the desired state.
async fn sync_cluster(
    clients: &dyn ClusterClientFactory,
    cluster: &Cluster,
    binding: &TeamRoleBinding,
    desired: &DesiredState,
) -> Result<(), PropagationError> {
    let name = cluster.name_any();
    let client = clients
        .client_for(cluster)
        .await
        .map_err(|e| PropagationError::ClusterConnection {
            cluster: name.clone(),
            reason: e.to_string(),
        })?;

    prune_retained_cluster(client.as_ref(), &name, binding, desired)
        .await
        .map_err(|source| PropagationError::Cleanup {
            cluster: name.clone(),
            source,
        })?;

    apply_to_cluster(
        client.as_ref(),
        &name,
        desired,
        binding.spec.create_namespaces,
    )
    .await
}

/// Propagate a binding to its current targets and record the result in `updater`.
///
/// # Errors
///
/// Returns a whole-binding [`PropagationError`] (missing `TeamRole` or `Team`,
/// invalid selector, no subjects, hub failure). Per-cluster failures are returned in
/// [`PropagationOutcome::failures`] instead.
pub async fn propagate(
    inventory: &dyn Inventory,
    clients: &dyn ClusterClientFactory,
    binding: &TeamRoleBinding,
    updater: &mut TeamRoleBindingStatusUpdater,
) -> Result<PropagationOutcome, PropagationError> {
    let namespace = binding.namespace().unwrap_or_default();
    let spec = &binding.spec;

    let team_role = inventory
        .get_team_role(&namespace, &spec.team_role_ref)
        .await?
        .ok_or_else(|| PropagationError::TeamRoleNotFound {
            namespace: namespace.clone(),
            name: spec.team_role_ref.clone(),
        })?;
    let team = inventory
        .get_team(&namespace, &spec.team_ref)
        .await?
        .ok_or_else(|| PropagationError::TeamNotFound {
            namespace: namespace.clone(),
            name: spec.team_ref.clone(),
        })?;
    validate_selector(binding)?;
    validate_subjects(binding, &team)?;

    let resolution = resolve_targets(inventory, binding).await?;
    let mut outcome = PropagationOutcome::default();

    for cluster in &resolution.not_ready {
        let name = cluster.name_any();
        record_failure(updater, &mut outcome.failures, &name, not_ready_error(&name));
    }

    let gc = gc_stale_clusters(inventory, clients, binding, &resolution, updater).await?;
    outcome.pruned = gc.pruned;
    for err in gc.failures {
        record_propagation_failure(err.reason());
        outcome.failures.push(err);
    }

    if resolution.targets.is_empty() {
        info!(
            "TeamRoleBinding {}/{} selects no ready cluster",
            namespace,
            binding.name_any()
        );
        updater.set_empty_target_list();
        outcome.empty = true;
        return Ok(outcome);
    }

    let desired = build_desired(binding, &team_role, &team);
    for cluster in &resolution.targets {
        let name = cluster.name_any();
        match sync_cluster(clients, cluster, binding, &desired).await {
            Ok(()) => {
                debug!(cluster = %name, "RBAC propagated");
                updater.set_cluster_ready(&name);
                outcome.ready.push(name);
            }
            Err(e) => record_failure(updater, &mut outcome.failures, &name, e),
        }
    }

    updater.aggregate();
    Ok(outcome)
}

/// Remove a deleted binding's objects from every cluster that may hold them.
///
/// The current targets are unioned with the clusters tracked in status so that a
/// cluster that recently stopped matching is cleaned up as well. An invalid selector
/// only means the status entries are used on their own.
///
/// # Errors
///
/// Returns [`PropagationError::Hub`] if the hub cannot be queried.
pub async fn teardown(
    inventory: &dyn Inventory,
    clients: &dyn ClusterClientFactory,
    binding: &TeamRoleBinding,
    updater: &mut TeamRoleBindingStatusUpdater,
) -> Result<TeardownReport, PropagationError> {
    let namespace = binding.namespace().unwrap_or_default();
    let mut failures = Vec::new();

    let resolution = match resolve_targets(inventory, binding).await {
        Ok(resolution) => resolution,
        Err(PropagationError::InvalidSelector { reason }) => {
            debug!("Ignoring invalid selector during deletion: {}", reason);
            Resolution::default()
        }
        Err(e) => return Err(e),
    };

    let mut clusters: BTreeSet<String> = updater.tracked_clusters().into_iter().collect();
    clusters.extend(resolution.target_names());

    for name in clusters {
        match inventory.get_cluster(&namespace, &name).await? {
            None => {
                updater.remove_cluster(&name);
            }
            Some(cluster) if !cluster.is_ready() => {
                debug!(
                    "Deferring removal of TeamRoleBinding {}/{} from cluster {}",
                    namespace,
                    binding.name_any(),
                    name
                );
                record_failure(updater, &mut failures, &name, not_ready_error(&name));
            }
            Some(cluster) => match cleanup_cluster(clients, &cluster, binding).await {
                Ok(_) => {
                    info!(
                        "Removed TeamRoleBinding {}/{} from cluster {}",
                        namespace,
                        binding.name_any(),
                        name
                    );
                    updater.remove_cluster(&name);
                }
                Err(e) => record_failure(updater, &mut failures, &name, e),
            },
        }
    }

    let outcome = if updater.tracked_clusters().is_empty() {
        TeardownOutcome::Complete
    } else {
        updater.set_deletion_pending();
        TeardownOutcome::Pending
    };
    Ok(TeardownReport { outcome, failures })
}

fn was_ready(binding: &TeamRoleBinding) -> bool {
    binding
        .status
        .as_ref()
        .and_then(|s| find_condition(&s.conditions, CONDITION_TYPE_READY))
        .is_some_and(|c| c.status == STATUS_TRUE)
}

/// Reconciles a `TeamRoleBinding` resource.
///
/// # Errors
///
/// Returns an error if a whole-binding error occurred, if any target cluster failed,
/// or if the hub rejected a status or finalizer patch.
pub async fn reconcile_teamrolebinding(
    ctx: Arc<Context>,
    binding: TeamRoleBinding,
) -> Result<ReconcileResult> {
    let namespace = binding.namespace().unwrap_or_default();
    let name = binding.name_any();
    let object_ref = binding.object_ref(&());

    info!("Reconciling TeamRoleBinding: {}/{}", namespace, name);
    debug!(
        namespace = %namespace,
        name = %name,
        generation = ?binding.metadata.generation,
        team_role = %binding.spec.team_role_ref,
        team = %binding.spec.team_ref,
        "Starting TeamRoleBinding reconciliation"
    );

    let mut updater = TeamRoleBindingStatusUpdater::new(&binding);

    if is_being_deleted(&binding) {
        if !has_finalizer(&binding, FINALIZER_TEAM_ROLE_BINDING) {
            return Ok(ReconcileResult::Deleted);
        }

        let report = match teardown(
            ctx.inventory.as_ref(),
            ctx.clients.as_ref(),
            &binding,
            &mut updater,
        )
        .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!("TeamRoleBinding {}/{}: {}", namespace, name, err);
                record_propagation_failure(err.reason());
                publish_failures(
                    ctx.events.as_ref(),
                    &object_ref,
                    std::slice::from_ref(&err),
                    actions::DELETE,
                )
                .await;
                return Err(err.into());
            }
        };
        publish_failures(ctx.events.as_ref(), &object_ref, &report.failures, actions::DELETE)
            .await;

        return match report.outcome {
            TeardownOutcome::Complete => {
                remove_finalizer(&ctx.client, &binding, FINALIZER_TEAM_ROLE_BINDING).await?;
                clear_propagation_clusters(&namespace, &name);
                ctx.events
                    .publish(
                        &object_ref,
                        EventType::Normal,
                        reasons::CLEANUP_COMPLETE,
                        actions::DELETE,
                        Some("RBAC objects removed from all clusters".to_string()),
                    )
                    .await;
                Ok(ReconcileResult::Deleted)
            }
            TeardownOutcome::Pending => {
                updater.apply(&ctx.client).await?;
                Ok(ReconcileResult::DeletionPending)
            }
        };
    }

    ensure_finalizer(&ctx.client, &binding, FINALIZER_TEAM_ROLE_BINDING).await?;
    updater.set_observed_generation(binding.metadata.generation);

    let outcome = match propagate(
        ctx.inventory.as_ref(),
        ctx.clients.as_ref(),
        &binding,
        &mut updater,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("TeamRoleBinding {}/{}: {}", namespace, name, err);
            record_propagation_failure(err.reason());
            updater.set_fatal(&err);
            updater.apply(&ctx.client).await?;
            ctx.events
                .publish(
                    &object_ref,
                    EventType::Warning,
                    err.reason(),
                    actions::RECONCILE,
                    Some(err.to_string()),
                )
                .await;
            return Err(err.into());
        }
    };

    updater.apply(&ctx.client).await?;

    publish_outcome(ctx.events.as_ref(), &object_ref, &outcome, was_ready(&binding)).await;
    set_propagation_clusters(
        &namespace,
        &name,
        outcome.ready.len(),
        outcome.failures.len(),
    );

    if !outcome.failures.is_empty() {
        bail!(
            "TeamRoleBinding {}/{} failed on {} cluster(s)",
            namespace,
            name,
            outcome.failures.len()
        );
    }
    if outcome.empty {
        return Ok(ReconcileResult::Empty);
    }

    info!(
        "TeamRoleBinding {}/{} propagated to {} cluster(s)",
        namespace,
        name,
        outcome.ready.len()
    );
    Ok(ReconcileResult::Ready)
}

#[cfg(test)]
#[path = "teamrolebinding_tests.rs"]
mod teamrolebinding_tests;
