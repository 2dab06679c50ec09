// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and fleetrbac-specific labels
//! to ensure consistency across all RBAC objects materialized on remote clusters.
//! The remote labels are the only record of which binding owns which object, so
//! cleanup discovers objects exclusively through them.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on every derived RBAC object
pub const MANAGED_BY_FLEETRBAC: &str = "fleetrbac";

/// Value for `app.kubernetes.io/part-of` on every derived RBAC object
pub const PART_OF_FLEETRBAC: &str = "fleetrbac";

// ============================================================================
// fleetrbac-Specific Labels
// ============================================================================

/// Prefix shared by every fleetrbac-owned label key
pub const FLEETRBAC_LABEL_PREFIX: &str = "fleetrbac.firestoned.io/";

/// Label carrying the source `TeamRole` name.
///
/// Set on the shared `ClusterRole` (derived-from-role) and on every binding
/// object (reference marker used to decide whether the shared role is still needed).
pub const FLEETRBAC_TEAM_ROLE_LABEL: &str = "fleetrbac.firestoned.io/team-role";

/// Label carrying the source `TeamRoleBinding` name on binding objects
pub const FLEETRBAC_TEAM_ROLE_BINDING_LABEL: &str = "fleetrbac.firestoned.io/team-role-binding";

/// Label naming the owner of a resource, consulted by the authorization webhook.
///
/// Copied from the hub `TeamRoleBinding` onto derived binding objects when present.
pub const FLEETRBAC_OWNED_BY_LABEL: &str = "fleetrbac.firestoned.io/owned-by";

/// Returns `true` for label keys fleetrbac writes on remote objects.
///
/// Such labels are removed from a remote object once its desired state no longer
/// carries them; any other label belongs to someone else and is left alone.
#[must_use]
pub fn is_operator_label(key: &str) -> bool {
    key.starts_with(FLEETRBAC_LABEL_PREFIX) || key == K8S_MANAGED_BY || key == K8S_PART_OF
}

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `TeamRoleBinding` resources
pub const FINALIZER_TEAM_ROLE_BINDING: &str = "fleetrbac.firestoned.io/teamrolebinding-finalizer";

/// Build the label selector string that discovers all binding objects of a binding.
#[must_use]
pub fn binding_selector(binding_name: &str) -> String {
    format!("{FLEETRBAC_TEAM_ROLE_BINDING_LABEL}={binding_name}")
}

/// Build the label selector string that discovers all objects referencing a team role.
#[must_use]
pub fn team_role_selector(team_role_name: &str) -> String {
    format!("{FLEETRBAC_TEAM_ROLE_LABEL}={team_role_name}")
}
