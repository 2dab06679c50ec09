// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for fleetrbac resources.
//!
//! This module defines constants for condition reasons following Kubernetes conventions.
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Hierarchy
//!
//! A `TeamRoleBinding` tracks one `RBACReady` condition per remote cluster in
//! `status.propagationStatus`, and two encompassing conditions in `status.conditions`:
//!
//! - `RBACReady` - pure reduction over the per-cluster entries
//! - `Ready` - overall readiness of the binding
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: RBACReady
//!       status: "False"
//!       reason: PropagationFailed
//!       message: "RBAC propagation failed on one or more clusters"
//!     - type: Ready
//!       status: "False"
//!       reason: PropagationFailed
//!       message: "RBAC propagation failed on one or more clusters"
//!   propagationStatus:
//!     - clusterName: cluster-a
//!       condition:
//!         type: RBACReady
//!         status: "True"
//!         reason: RBACReconciled
//!     - clusterName: cluster-b
//!       condition:
//!         type: RBACReady
//!         status: "False"
//!         reason: ClusterConnectionFailed
//!         message: "cluster cluster-b is not ready"
//! ```

// ============================================================================
// Per-Cluster Reasons
// ============================================================================

/// All RBAC objects are in their desired state on the cluster.
pub const REASON_RBAC_RECONCILED: &str = "RBACReconciled";

/// The cluster is not ready or a client for it could not be built.
pub const REASON_CLUSTER_CONNECTION_FAILED: &str = "ClusterConnectionFailed";

/// The shared `ClusterRole` could not be created or updated.
pub const REASON_ROLE_APPLY_FAILED: &str = "RoleApplyFailed";

/// A `ClusterRoleBinding` or `RoleBinding` could not be created, updated or removed.
pub const REASON_BINDING_APPLY_FAILED: &str = "BindingApplyFailed";

/// A target namespace was missing and has just been created; the binding follows
/// on the next reconciliation.
pub const REASON_NAMESPACE_CREATION_PENDING: &str = "NamespaceCreationPending";

/// Removing the binding's objects from a cluster failed.
pub const REASON_CLEANUP_FAILED: &str = "CleanupFailed";

// ============================================================================
// Aggregate Reasons
// ============================================================================

/// Every tracked cluster has the binding propagated.
pub const REASON_ALL_CLUSTERS_READY: &str = "AllClustersReady";

/// At least one tracked cluster is not propagated.
pub const REASON_PROPAGATION_FAILED: &str = "PropagationFailed";

/// The cluster selector matched no ready cluster.
pub const REASON_EMPTY_CLUSTER_LIST: &str = "EmptyClusterList";

/// The referenced `Team` does not exist.
pub const REASON_TEAM_NOT_FOUND: &str = "TeamNotFound";

/// The referenced `TeamRole` does not exist.
pub const REASON_TEAM_ROLE_NOT_FOUND: &str = "TeamRoleNotFound";

/// The cluster selector could not be turned into a label query.
pub const REASON_INVALID_CLUSTER_SELECTOR: &str = "InvalidClusterSelector";

/// The binding resolves to no subject at all.
pub const REASON_NO_SUBJECTS: &str = "NoSubjects";

/// Reading hub resources failed.
pub const REASON_HUB_UNAVAILABLE: &str = "HubUnavailable";

/// The binding is being deleted and some clusters still hold its objects.
pub const REASON_DELETION_PENDING: &str = "DeletionPending";

// ============================================================================
// Messages
// ============================================================================

/// Aggregate message when every cluster is ready
pub const MESSAGE_ALL_CLUSTERS_READY: &str = "RBAC propagated to all clusters";

/// Aggregate message when any cluster is not ready
pub const MESSAGE_PROPAGATION_FAILED: &str = "RBAC propagation failed on one or more clusters";

/// Aggregate message when no cluster is selected
pub const MESSAGE_EMPTY_CLUSTER_LIST: &str = "No ready cluster matches the cluster selector";

/// Per-cluster message on success
pub const MESSAGE_RBAC_RECONCILED: &str = "RBAC objects reconciled";

/// Map a per-cluster reason to a human-readable label for logs and events.
#[must_use]
pub fn reason_description(reason: &str) -> &'static str {
    match reason {
        REASON_RBAC_RECONCILED => "reconciled",
        REASON_CLUSTER_CONNECTION_FAILED => "cluster connection failed",
        REASON_ROLE_APPLY_FAILED => "role apply failed",
        REASON_BINDING_APPLY_FAILED => "binding apply failed",
        REASON_NAMESPACE_CREATION_PENDING => "waiting for namespace creation",
        REASON_CLEANUP_FAILED => "cleanup failed",
        REASON_EMPTY_CLUSTER_LIST => "no cluster selected",
        REASON_TEAM_NOT_FOUND => "team not found",
        REASON_TEAM_ROLE_NOT_FOUND => "team role not found",
        REASON_INVALID_CLUSTER_SELECTOR => "invalid cluster selector",
        REASON_NO_SUBJECTS => "no subjects",
        _ => "unknown",
    }
}

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
