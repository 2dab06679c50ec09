// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Apply a binding's desired objects to one remote cluster.
//!
//! The shared `ClusterRole` goes first; if it cannot be written the bindings are not
//! attempted. Every binding object is then attempted even if an earlier one failed,
//! and the first failure is reported for the cluster.
//!
//! A `RoleBinding` targeting a missing namespace creates that namespace when the
//! binding allows it, and still reports the cluster as pending so the object is
//! written on the next pass.

use super::desired::DesiredState;
use crate::errors::{PropagationError, RemoteError};
use crate::metrics::record_remote_operation;
use crate::remote::{OperationResult, RbacObject, RemoteClient};
use tracing::{debug, warn};

/// Write `desired` to `cluster`.
///
/// # Errors
///
/// Returns the first per-cluster failure:
/// [`PropagationError::RoleApply`], [`PropagationError::BindingApply`] or
/// [`PropagationError::NamespacePending`].
pub async fn apply_to_cluster(
    client: &dyn RemoteClient,
    cluster: &str,
    desired: &DesiredState,
    create_namespaces: bool,
) -> Result<(), PropagationError> {
    apply_object(client, cluster, &desired.role)
        .await
        .map_err(|source| PropagationError::RoleApply {
            cluster: cluster.to_string(),
            name: desired.role.name(),
            source,
        })?;

    let mut first_failure = None;
    for object in &desired.bindings {
        let result = match apply_object(client, cluster, object).await {
            Ok(()) => Ok(()),
            Err(RemoteError::NamespaceNotFound { namespace }) if create_namespaces => {
                create_namespace(client, cluster, &namespace).await
            }
            Err(source) => Err(PropagationError::BindingApply {
                cluster: cluster.to_string(),
                kind: object.kind().to_string(),
                name: object.name(),
                source,
            }),
        };

        if let Err(err) = result {
            warn!("{}", err);
            first_failure.get_or_insert(err);
        }
    }

    first_failure.map_or(Ok(()), Err)
}

async fn apply_object(
    client: &dyn RemoteClient,
    cluster: &str,
    object: &RbacObject,
) -> Result<(), RemoteError> {
    let kind = object.kind().as_str();
    match client.create_or_update(object).await {
        Ok(result) => {
            record_remote_operation(cluster, kind, result.as_str());
            if result != OperationResult::None {
                debug!(
                    cluster,
                    kind,
                    name = %object.name(),
                    result = result.as_str(),
                    "Applied RBAC object"
                );
            }
            Ok(())
        }
        Err(e) => {
            record_remote_operation(cluster, kind, "error");
            Err(e)
        }
    }
}

async fn create_namespace(
    client: &dyn RemoteClient,
    cluster: &str,
    namespace: &str,
) -> Result<(), PropagationError> {
    match client.ensure_namespace(namespace).await {
        Ok(_) => Err(PropagationError::NamespacePending {
            cluster: cluster.to_string(),
            namespace: namespace.to_string(),
        }),
        Err(source) => Err(PropagationError::BindingApply {
            cluster: cluster.to_string(),
            kind: "Namespace".to_string(),
            name: namespace.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
#[path = "applier_tests.rs"]
mod applier_tests;
