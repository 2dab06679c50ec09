// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for RBAC propagation.
//!
//! This module provides specialized error types for:
//! - Remote cluster API operations (create, update, delete, list of RBAC objects)
//! - Propagation of a `TeamRoleBinding` as a whole and per target cluster
//!
//! Every [`PropagationError`] maps onto a status condition reason so that the
//! failure recorded in `status` and the one emitted as an Event always agree.

use crate::status_reasons::{
    REASON_BINDING_APPLY_FAILED, REASON_CLEANUP_FAILED, REASON_CLUSTER_CONNECTION_FAILED,
    REASON_HUB_UNAVAILABLE, REASON_INVALID_CLUSTER_SELECTOR, REASON_NAMESPACE_CREATION_PENDING,
    REASON_NO_SUBJECTS, REASON_ROLE_APPLY_FAILED, REASON_TEAM_NOT_FOUND,
    REASON_TEAM_ROLE_NOT_FOUND,
};
use thiserror::Error;

/// Errors returned by a remote cluster's API.
///
/// These errors are independent of `kube::Error` so that any client
/// implementation can produce them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The namespace an object was written to does not exist.
    #[error("namespace '{namespace}' does not exist")]
    NamespaceNotFound {
        /// The missing namespace
        namespace: String,
    },

    /// The addressed object does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Object kind
        kind: String,
        /// Object name
        name: String,
    },

    /// The cluster could not be reached (network, TLS, timeouts).
    #[error("cluster unreachable: {reason}")]
    Unreachable {
        /// Underlying transport error
        reason: String,
    },

    /// The API server rejected the request.
    #[error("API request failed with HTTP {code}: {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Server-provided message
        message: String,
    },

    /// The cluster's access credentials could not be loaded.
    #[error("cannot build client: {reason}")]
    Credentials {
        /// Why the kubeconfig was rejected
        reason: String,
    },
}

impl RemoteError {
    /// Convert a `kube::Error` into a [`RemoteError`].
    ///
    /// HTTP 404 is reported as [`RemoteError::NotFound`] for the given object.
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => RemoteError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(ae) => RemoteError::Api {
                code: ae.code,
                message: ae.message.clone(),
            },
            other => RemoteError::Unreachable {
                reason: other.to_string(),
            },
        }
    }

    /// Returns `true` for [`RemoteError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Errors raised while propagating a `TeamRoleBinding`.
///
/// Whole-binding errors abort the reconciliation before any cluster is touched.
/// Per-cluster errors are recorded against that cluster's status entry and do not
/// prevent the remaining clusters from being processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropagationError {
    /// The cluster selector cannot be turned into a label query.
    #[error("invalid cluster selector: {reason}")]
    InvalidSelector {
        /// What is wrong with the selector
        reason: String,
    },

    /// The referenced `TeamRole` does not exist.
    #[error("TeamRole '{name}' not found in namespace {namespace}")]
    TeamRoleNotFound {
        /// Namespace of the binding
        namespace: String,
        /// Missing team role
        name: String,
    },

    /// The referenced `Team` does not exist.
    #[error("Team '{name}' not found in namespace {namespace}")]
    TeamNotFound {
        /// Namespace of the binding
        namespace: String,
        /// Missing team
        name: String,
    },

    /// Neither the team's identity-provider group nor any username is set.
    #[error("Team '{team}' has no identity-provider group and no usernames are listed")]
    NoSubjects {
        /// Team that resolved to nothing
        team: String,
    },

    /// Reading hub resources failed.
    #[error("hub API request failed: {reason}")]
    Hub {
        /// Underlying error
        reason: String,
    },

    /// The cluster is not ready or no client could be built for it.
    #[error("cannot connect to cluster {cluster}: {reason}")]
    ClusterConnection {
        /// Target cluster
        cluster: String,
        /// Why the connection failed
        reason: String,
    },

    /// Creating or updating the shared `ClusterRole` failed.
    #[error("failed to apply ClusterRole {name} on cluster {cluster}: {source}")]
    RoleApply {
        /// Target cluster
        cluster: String,
        /// Remote object name
        name: String,
        /// Remote API error
        source: RemoteError,
    },

    /// Creating, updating or pruning a binding object failed.
    #[error("failed to apply {kind} {name} on cluster {cluster}: {source}")]
    BindingApply {
        /// Target cluster
        cluster: String,
        /// `ClusterRoleBinding` or `RoleBinding`
        kind: String,
        /// Remote object name
        name: String,
        /// Remote API error
        source: RemoteError,
    },

    /// A missing namespace was created; the `RoleBinding` follows on the next reconciliation.
    #[error("namespace {namespace} was missing on cluster {cluster} and has been created")]
    NamespacePending {
        /// Target cluster
        cluster: String,
        /// Namespace just created
        namespace: String,
    },

    /// Removing the binding's objects from a cluster failed.
    #[error("failed to remove RBAC objects from cluster {cluster}: {source}")]
    Cleanup {
        /// Target cluster
        cluster: String,
        /// Remote API error
        source: RemoteError,
    },
}

impl PropagationError {
    /// Status condition reason for this error.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            PropagationError::InvalidSelector { .. } => REASON_INVALID_CLUSTER_SELECTOR,
            PropagationError::TeamRoleNotFound { .. } => REASON_TEAM_ROLE_NOT_FOUND,
            PropagationError::TeamNotFound { .. } => REASON_TEAM_NOT_FOUND,
            PropagationError::NoSubjects { .. } => REASON_NO_SUBJECTS,
            PropagationError::Hub { .. } => REASON_HUB_UNAVAILABLE,
            PropagationError::ClusterConnection { .. } => REASON_CLUSTER_CONNECTION_FAILED,
            PropagationError::RoleApply { .. } => REASON_ROLE_APPLY_FAILED,
            PropagationError::BindingApply { .. } => REASON_BINDING_APPLY_FAILED,
            PropagationError::NamespacePending { .. } => REASON_NAMESPACE_CREATION_PENDING,
            PropagationError::Cleanup { .. } => REASON_CLEANUP_FAILED,
        }
    }

    /// Cluster this error is scoped to, or `None` for whole-binding errors.
    #[must_use]
    pub fn cluster(&self) -> Option<&str> {
        match self {
            PropagationError::ClusterConnection { cluster, .. }
            | PropagationError::RoleApply { cluster, .. }
            | PropagationError::BindingApply { cluster, .. }
            | PropagationError::NamespacePending { cluster, .. }
            | PropagationError::Cleanup { cluster, .. } => Some(cluster),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for PropagationError {
    fn from(err: anyhow::Error) -> Self {
        PropagationError::Hub {
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
