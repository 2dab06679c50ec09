// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the fleetrbac operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all fleetrbac CRDs
pub const API_GROUP: &str = "fleetrbac.firestoned.io";

/// API version for all fleetrbac CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "fleetrbac.firestoned.io/v1alpha1";

/// Kind name for `TeamRoleBinding` resource
pub const KIND_TEAM_ROLE_BINDING: &str = "TeamRoleBinding";

/// Kind name for `TeamRole` resource
pub const KIND_TEAM_ROLE: &str = "TeamRole";

/// Kind name for `Team` resource
pub const KIND_TEAM: &str = "Team";

/// Kind name for `Cluster` resource
pub const KIND_CLUSTER: &str = "Cluster";

// ============================================================================
// Remote RBAC Object Constants
// ============================================================================

/// Prefix for every RBAC object materialized on a remote cluster.
///
/// The shared `ClusterRole` is named `<prefix><teamRole>` and binding objects
/// are named `<prefix><teamRoleBinding>`.
pub const RBAC_PREFIX: &str = "fleetrbac:";

/// API group of Kubernetes RBAC objects
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Subject kind for individual users
pub const SUBJECT_KIND_USER: &str = "User";

/// Subject kind for identity-provider groups
pub const SUBJECT_KIND_GROUP: &str = "Group";

/// Kind name for remote `ClusterRole` objects
pub const KIND_CLUSTER_ROLE: &str = "ClusterRole";

/// Kind name for remote `ClusterRoleBinding` objects
pub const KIND_CLUSTER_ROLE_BINDING: &str = "ClusterRoleBinding";

/// Kind name for remote `RoleBinding` objects
pub const KIND_ROLE_BINDING: &str = "RoleBinding";

/// Key inside the cluster access secret holding the kubeconfig
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

// ============================================================================
// Condition Types
// ============================================================================

/// Condition type for the encompassing readiness of a resource
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Condition type for RBAC propagation (per cluster and aggregate)
pub const CONDITION_TYPE_RBAC_READY: &str = "RBACReady";

/// Condition type reporting a cluster's own readiness
pub const CONDITION_TYPE_CLUSTER_READY: &str = "Ready";

/// Condition status values
pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Requeue interval for a binding whose propagation is ready (5 minutes)
pub const REQUEUE_WHEN_READY_SECS: u64 = 300;

/// Requeue interval for a degraded binding or an empty target list (30 seconds)
pub const REQUEUE_WHEN_DEGRADED_SECS: u64 = 30;

/// Requeue interval after a reconcile error (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval while deletion is pending on some clusters (10 seconds)
pub const DELETION_REQUEUE_SECS: u64 = 10;

/// Default number of bindings reconciled concurrently
pub const DEFAULT_CONCURRENCY: u16 = 8;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address for the metrics HTTP server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Path of the Prometheus scrape endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path of the liveness endpoint
pub const HEALTHZ_PATH: &str = "/healthz";

/// Default controller name reported on Kubernetes Events
pub const DEFAULT_CONTROLLER_NAME: &str = "fleetrbac-controller";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "fleetrbac-controller";
