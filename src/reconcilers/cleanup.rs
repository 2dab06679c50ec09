// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Removal of a binding's remote objects.
//!
//! Remote labels are the only record of ownership: binding objects are discovered by
//! the `team-role-binding` label, and the shared `ClusterRole` is deleted only once
//! no binding object on that cluster carries its `team-role` label any more. The
//! reference check is query-then-act; a concurrent writer can at worst cause the role
//! to be recreated on its next reconciliation.

use super::desired::{shared_role_name, DesiredState};
use super::status::TeamRoleBindingStatusUpdater;
use super::targets::Resolution;
use crate::constants::CONDITION_TYPE_CLUSTER_READY;
use crate::crd::{Cluster, TeamRoleBinding};
use crate::errors::{PropagationError, RemoteError};
use crate::inventory::Inventory;
use crate::labels::{binding_selector, team_role_selector, FLEETRBAC_TEAM_ROLE_LABEL};
use crate::metrics::record_remote_operation;
use crate::remote::{ClusterClientFactory, DeleteOutcome, RbacKind, RbacObject, RemoteClient};
use kube::ResourceExt;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const BINDING_KINDS: [RbacKind; 2] = [RbacKind::ClusterRoleBinding, RbacKind::RoleBinding];

async fn delete_object(
    client: &dyn RemoteClient,
    cluster: &str,
    object: &RbacObject,
) -> Result<(), RemoteError> {
    let kind = object.kind();
    let name = object.name();
    let namespace = object.namespace();
    match client.delete(kind, namespace.as_deref(), &name).await? {
        DeleteOutcome::Deleted => {
            record_remote_operation(cluster, kind.as_str(), "deleted");
            info!(
                "Deleted {} {}{} on cluster {}",
                kind,
                namespace.map(|ns| format!("{ns}/")).unwrap_or_default(),
                name,
                cluster
            );
        }
        DeleteOutcome::AlreadyGone => {
            debug!(cluster, kind = kind.as_str(), name = %name, "Object already gone");
        }
    }
    Ok(())
}

async fn list_binding_objects(
    client: &dyn RemoteClient,
    label_selector: &str,
) -> Result<Vec<RbacObject>, RemoteError> {
    let mut objects = Vec::new();
    for kind in BINDING_KINDS {
        objects.extend(client.list(kind, label_selector).await?);
    }
    Ok(objects)
}

/// Delete the shared `ClusterRole` of `team_role` if no binding object references it.
///
/// Returns `true` if the role was deleted.
///
/// # Errors
///
/// Returns the remote error of a failed list or delete.
pub async fn delete_role_if_unreferenced(
    client: &dyn RemoteClient,
    cluster: &str,
    team_role: &str,
) -> Result<bool, RemoteError> {
    let references = list_binding_objects(client, &team_role_selector(team_role)).await?;
    if !references.is_empty() {
        debug!(
            "ClusterRole {} on cluster {} still referenced by {} binding object(s)",
            shared_role_name(team_role),
            cluster,
            references.len()
        );
        return Ok(false);
    }

    let name = shared_role_name(team_role);
    let outcome = client.delete(RbacKind::ClusterRole, None, &name).await?;
    if outcome == DeleteOutcome::Deleted {
        record_remote_operation(cluster, RbacKind::ClusterRole.as_str(), "deleted");
        info!("Deleted unreferenced ClusterRole {} on cluster {}", name, cluster);
    }
    Ok(outcome == DeleteOutcome::Deleted)
}

async fn delete_all(
    client: &dyn RemoteClient,
    cluster: &str,
    objects: &[RbacObject],
    extra_role: Option<&str>,
) -> Result<usize, RemoteError> {
    let mut roles: BTreeSet<String> = extra_role.map(ToString::to_string).into_iter().collect();
    for object in objects {
        delete_object(client, cluster, object).await?;
        if let Some(role) = object.label(FLEETRBAC_TEAM_ROLE_LABEL) {
            roles.insert(role.to_string());
        }
    }
    for role in &roles {
        delete_role_if_unreferenced(client, cluster, role).await?;
    }
    Ok(objects.len())
}

/// Delete every binding object of `binding_name` from a cluster, then every shared
/// role they referenced (and `team_role`, if given) that is no longer referenced.
///
/// Returns the number of binding objects found.
///
/// # Errors
///
/// Returns the first remote error; objects deleted before it stay deleted.
pub async fn remove_binding_objects(
    client: &dyn RemoteClient,
    cluster: &str,
    binding_name: &str,
    team_role: Option<&str>,
) -> Result<usize, RemoteError> {
    let objects = list_binding_objects(client, &binding_selector(binding_name)).await?;
    delete_all(client, cluster, &objects, team_role).await
}

fn is_stale(binding: &TeamRoleBinding, desired: &DesiredState, object: &RbacObject) -> bool {
    if object.label(FLEETRBAC_TEAM_ROLE_LABEL) != Some(desired.team_role.as_str()) {
        return true;
    }
    match object.kind() {
        RbacKind::ClusterRoleBinding => binding.spec.is_namespace_scoped(),
        RbacKind::RoleBinding => object
            .namespace()
            .is_none_or(|ns| !binding.spec.namespaces.contains(&ns)),
        RbacKind::ClusterRole => false,
    }
}

/// Delete the binding's objects on a still-targeted cluster that the current spec
/// no longer wants: objects of a previous scope, `RoleBinding`s in namespaces no
/// longer listed, and objects referencing a previous `TeamRole`.
///
/// Returns the number of objects deleted.
///
/// # Errors
///
/// Returns the first remote error.
pub async fn prune_retained_cluster(
    client: &dyn RemoteClient,
    cluster: &str,
    binding: &TeamRoleBinding,
    desired: &DesiredState,
) -> Result<usize, RemoteError> {
    let selector = binding_selector(&binding.name_any());
    let stale: Vec<RbacObject> = list_binding_objects(client, &selector)
        .await?
        .into_iter()
        .filter(|o| is_stale(binding, desired, o))
        .collect();
    if stale.is_empty() {
        return Ok(0);
    }

    debug!(
        "Pruning {} stale object(s) of TeamRoleBinding {} on cluster {}",
        stale.len(),
        binding.name_any(),
        cluster
    );
    delete_all(client, cluster, &stale, None).await
}

/// Remove all of a binding's objects from one cluster.
///
/// # Errors
///
/// [`PropagationError::ClusterConnection`] if no client can be built,
/// [`PropagationError::Cleanup`] if a remote call fails.
pub async fn cleanup_cluster(
    clients: &dyn ClusterClientFactory,
    cluster: &Cluster,
    binding: &TeamRoleBinding,
) -> Result<usize, PropagationError> {
    let name = cluster.name_any();
    let client = clients
        .client_for(cluster)
        .await
        .map_err(|e| PropagationError::ClusterConnection {
            cluster: name.clone(),
            reason: e.to_string(),
        })?;

    remove_binding_objects(
        client.as_ref(),
        &name,
        &binding.name_any(),
        Some(&binding.spec.team_role_ref),
    )
    .await
    .map_err(|source| PropagationError::Cleanup {
        cluster: name,
        source,
    })
}

/// The error recorded for a cluster whose `Ready` condition is not `True`.
#[must_use]
pub fn not_ready_error(cluster: &str) -> PropagationError {
    PropagationError::ClusterConnection {
        cluster: cluster.to_string(),
        reason: format!("cluster is not {CONDITION_TYPE_CLUSTER_READY}"),
    }
}

/// Result of cleaning up clusters the binding no longer targets.
#[derive(Debug, Default)]
pub struct GcReport {
    /// Clusters whose objects were removed and whose entry was dropped
    pub pruned: Vec<String>,
    /// Clusters kept in status because cleanup could not happen
    pub failures: Vec<PropagationError>,
}

/// Clean up clusters tracked in status that the binding no longer targets.
///
/// - cluster gone from the hub: entry dropped, nothing to delete
/// - cluster not ready: entry kept and marked failed, cleanup deferred
/// - cluster ready: objects removed, then the entry is dropped; on failure the entry
///   is kept and marked failed
///
/// Selected-but-not-ready clusters are skipped; the caller records them.
///
/// # Errors
///
/// Returns [`PropagationError::Hub`] if a hub lookup fails.
pub async fn gc_stale_clusters(
    inventory: &dyn Inventory,
    clients: &dyn ClusterClientFactory,
    binding: &TeamRoleBinding,
    resolution: &Resolution,
    updater: &mut TeamRoleBindingStatusUpdater,
) -> Result<GcReport, PropagationError> {
    let namespace = binding.namespace().unwrap_or_default();
    let selected_not_ready: BTreeSet<String> =
        resolution.not_ready.iter().map(|c| c.name_any()).collect();

    let mut report = GcReport::default();
    for name in updater.tracked_clusters() {
        if resolution.contains(&name) || selected_not_ready.contains(&name) {
            continue;
        }

        match inventory.get_cluster(&namespace, &name).await? {
            None => {
                info!(
                    "Cluster {} no longer exists, dropping it from TeamRoleBinding {}/{}",
                    name,
                    namespace,
                    binding.name_any()
                );
                updater.remove_cluster(&name);
            }
            Some(cluster) if !cluster.is_ready() => {
                debug!("Deferring cleanup of cluster {} until it is ready", name);
                let err = not_ready_error(&name);
                updater.set_cluster_failed(&name, &err);
                report.failures.push(err);
            }
            Some(cluster) => match cleanup_cluster(clients, &cluster, binding).await {
                Ok(removed) => {
                    info!(
                        "Removed {} object(s) of TeamRoleBinding {}/{} from cluster {}",
                        removed,
                        namespace,
                        binding.name_any(),
                        name
                    );
                    updater.remove_cluster(&name);
                    report.pruned.push(name);
                }
                Err(e) => {
                    warn!("{}", e);
                    updater.set_cluster_failed(&name, &e);
                    report.failures.push(e);
                }
            },
        }
    }
    Ok(report)
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod cleanup_tests;
