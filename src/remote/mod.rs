// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access to remote clusters.
//!
//! The propagation engine never talks to a remote API server directly. It goes through
//! two narrow seams:
//!
//! - [`ClusterClientFactory`] - obtains a client for a registered `Cluster`
//! - [`RemoteClient`] - idempotent create-or-update, delete and list of the three RBAC
//!   object kinds the operator manages, plus namespace creation
//!
//! [`kube_client::KubeRemoteClient`] and [`factory::KubeconfigSecretClientFactory`] are
//! the production implementations. The desired-versus-existing merge lives in
//! [`mutate`] so that every implementation classifies changes identically.

pub mod factory;
pub mod kube_client;
pub mod mutate;

use crate::constants::{KIND_CLUSTER_ROLE, KIND_CLUSTER_ROLE_BINDING, KIND_ROLE_BINDING};
use crate::crd::Cluster;
use crate::errors::RemoteError;
use async_trait::async_trait;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The RBAC object kinds materialized on remote clusters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RbacKind {
    ClusterRole,
    ClusterRoleBinding,
    RoleBinding,
}

impl RbacKind {
    /// Kubernetes kind name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RbacKind::ClusterRole => KIND_CLUSTER_ROLE,
            RbacKind::ClusterRoleBinding => KIND_CLUSTER_ROLE_BINDING,
            RbacKind::RoleBinding => KIND_ROLE_BINDING,
        }
    }
}

impl fmt::Display for RbacKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One RBAC object, desired or observed on a remote cluster.
#[derive(Clone, Debug, PartialEq)]
pub enum RbacObject {
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    RoleBinding(RoleBinding),
}

impl RbacObject {
    #[must_use]
    pub fn kind(&self) -> RbacKind {
        match self {
            RbacObject::ClusterRole(_) => RbacKind::ClusterRole,
            RbacObject::ClusterRoleBinding(_) => RbacKind::ClusterRoleBinding,
            RbacObject::RoleBinding(_) => RbacKind::RoleBinding,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            RbacObject::ClusterRole(o) => o.name_any(),
            RbacObject::ClusterRoleBinding(o) => o.name_any(),
            RbacObject::RoleBinding(o) => o.name_any(),
        }
    }

    /// Namespace of the object; `None` for cluster-scoped kinds.
    #[must_use]
    pub fn namespace(&self) -> Option<String> {
        match self {
            RbacObject::RoleBinding(o) => o.namespace(),
            _ => None,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &BTreeMap<String, String> {
        match self {
            RbacObject::ClusterRole(o) => o.labels(),
            RbacObject::ClusterRoleBinding(o) => o.labels(),
            RbacObject::RoleBinding(o) => o.labels(),
        }
    }

    /// Value of a label, if set.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels().get(key).map(String::as_str)
    }
}

impl From<ClusterRole> for RbacObject {
    fn from(o: ClusterRole) -> Self {
        RbacObject::ClusterRole(o)
    }
}

impl From<ClusterRoleBinding> for RbacObject {
    fn from(o: ClusterRoleBinding) -> Self {
        RbacObject::ClusterRoleBinding(o)
    }
}

impl From<RoleBinding> for RbacObject {
    fn from(o: RoleBinding) -> Self {
        RbacObject::RoleBinding(o)
    }
}

/// Outcome of a create-or-update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    /// The object already matched the desired state.
    None,
    Created,
    Updated,
}

impl OperationResult {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationResult::None => "none",
            OperationResult::Created => "created",
            OperationResult::Updated => "updated",
        }
    }
}

/// Outcome of a delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyGone,
}

/// Client for one remote cluster.
///
/// Every call blocks the caller until it completes or fails; cancellation is left to
/// the caller's own deadline.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Create the object if absent, otherwise merge the desired mutable fields into it.
    async fn create_or_update(&self, desired: &RbacObject) -> Result<OperationResult, RemoteError>;

    /// Delete an object; a missing object is not an error.
    async fn delete(
        &self,
        kind: RbacKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DeleteOutcome, RemoteError>;

    /// List objects of a kind across all namespaces matching a label query.
    async fn list(&self, kind: RbacKind, label_selector: &str)
        -> Result<Vec<RbacObject>, RemoteError>;

    /// Create a namespace if it does not exist.
    async fn ensure_namespace(&self, name: &str) -> Result<OperationResult, RemoteError>;
}

/// Hands out clients for registered clusters.
#[async_trait]
pub trait ClusterClientFactory: Send + Sync {
    /// Build (or reuse) a client for the cluster.
    async fn client_for(&self, cluster: &Cluster) -> Result<Arc<dyn RemoteClient>, RemoteError>;
}
