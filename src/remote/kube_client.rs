// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`RemoteClient`] backed by a `kube::Client` connected to a remote API server.

use super::mutate::{mutate, Mutation};
use super::{DeleteOutcome, OperationResult, RbacKind, RbacObject, RemoteClient};
use crate::constants::FIELD_MANAGER;
use crate::errors::RemoteError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

/// Typed RBAC object that round-trips through [`RbacObject`].
trait Typed:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Into<RbacObject>
    + Send
    + Sync
    + 'static
{
    fn from_object(obj: RbacObject) -> Option<Self>;
}

impl Typed for ClusterRole {
    fn from_object(obj: RbacObject) -> Option<Self> {
        match obj {
            RbacObject::ClusterRole(o) => Some(o),
            _ => None,
        }
    }
}

impl Typed for ClusterRoleBinding {
    fn from_object(obj: RbacObject) -> Option<Self> {
        match obj {
            RbacObject::ClusterRoleBinding(o) => Some(o),
            _ => None,
        }
    }
}

impl Typed for RoleBinding {
    fn from_object(obj: RbacObject) -> Option<Self> {
        match obj {
            RbacObject::RoleBinding(o) => Some(o),
            _ => None,
        }
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Remote cluster client using the Kubernetes API.
#[derive(Clone)]
pub struct KubeRemoteClient {
    client: Client,
    cluster: String,
}

impl KubeRemoteClient {
    /// Wrap a client connected to the named cluster.
    #[must_use]
    pub fn new(client: Client, cluster: impl Into<String>) -> Self {
        Self {
            client,
            cluster: cluster.into(),
        }
    }

    async fn upsert<K: Typed>(
        &self,
        api: Api<K>,
        desired: &K,
        kind: RbacKind,
    ) -> Result<OperationResult, RemoteError> {
        let name = desired.name_any();
        let namespace = desired.namespace();

        let existing = api
            .get_opt(&name)
            .await
            .map_err(|e| RemoteError::from_kube(e, kind.as_str(), &name))?;

        let Some(existing) = existing else {
            self.create(&api, desired, kind).await?;
            info!(
                "Created {} {} on cluster {}",
                kind,
                qualified(namespace.as_deref(), &name),
                self.cluster
            );
            return Ok(OperationResult::Created);
        };

        let resource_version = existing.resource_version();
        match mutate(&existing.into(), &desired.clone().into()) {
            Mutation::Unchanged => {
                debug!(
                    "{} {} on cluster {} is up to date",
                    kind,
                    qualified(namespace.as_deref(), &name),
                    self.cluster
                );
                Ok(OperationResult::None)
            }
            Mutation::Update(merged) => {
                let mut merged = K::from_object(merged).ok_or_else(|| RemoteError::Api {
                    code: 500,
                    message: format!("merged object is not a {kind}"),
                })?;
                merged.meta_mut().resource_version = resource_version;
                api.replace(&name, &post_params(), &merged)
                    .await
                    .map_err(|e| RemoteError::from_kube(e, kind.as_str(), &name))?;
                info!(
                    "Updated {} {} on cluster {}",
                    kind,
                    qualified(namespace.as_deref(), &name),
                    self.cluster
                );
                Ok(OperationResult::Updated)
            }
            Mutation::Recreate => {
                match api.delete(&name, &DeleteParams::default()).await {
                    Ok(_) => {}
                    Err(kube::Error::Api(ae)) if ae.code == 404 => {}
                    Err(e) => return Err(RemoteError::from_kube(e, kind.as_str(), &name)),
                }
                self.create(&api, desired, kind).await?;
                info!(
                    "Recreated {} {} on cluster {} after roleRef change",
                    kind,
                    qualified(namespace.as_deref(), &name),
                    self.cluster
                );
                Ok(OperationResult::Updated)
            }
        }
    }

    async fn create<K: Typed>(
        &self,
        api: &Api<K>,
        desired: &K,
        kind: RbacKind,
    ) -> Result<(), RemoteError> {
        let name = desired.name_any();
        let mut fresh = desired.clone();
        fresh.meta_mut().resource_version = None;

        match api.create(&post_params(), &fresh).await {
            Ok(_) => Ok(()),
            // Creating into a missing namespace is the only 404 a create can return.
            Err(kube::Error::Api(ae)) if ae.code == 404 && kind == RbacKind::RoleBinding => {
                Err(RemoteError::NamespaceNotFound {
                    namespace: desired.namespace().unwrap_or_default(),
                })
            }
            Err(e) => Err(RemoteError::from_kube(e, kind.as_str(), &name)),
        }
    }

    async fn delete_typed<K: Typed>(
        &self,
        api: Api<K>,
        kind: RbacKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DeleteOutcome, RemoteError> {
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(
                    "Deleted {} {} on cluster {}",
                    kind,
                    qualified(namespace, name),
                    self.cluster
                );
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                let err = RemoteError::from_kube(e, kind.as_str(), name);
                if !err.is_not_found() {
                    return Err(err);
                }
                debug!(
                    "{} {} on cluster {} already deleted",
                    kind,
                    qualified(namespace, name),
                    self.cluster
                );
                Ok(DeleteOutcome::AlreadyGone)
            }
        }
    }

    async fn list_typed<K: Typed>(
        &self,
        kind: RbacKind,
        label_selector: &str,
    ) -> Result<Vec<RbacObject>, RemoteError> {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| RemoteError::from_kube(e, kind.as_str(), label_selector))?;
        Ok(list.items.into_iter().map(Into::into).collect())
    }
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    }
}

#[async_trait]
impl RemoteClient for KubeRemoteClient {
    async fn create_or_update(&self, desired: &RbacObject) -> Result<OperationResult, RemoteError> {
        match desired {
            RbacObject::ClusterRole(o) => {
                self.upsert(Api::all(self.client.clone()), o, RbacKind::ClusterRole)
                    .await
            }
            RbacObject::ClusterRoleBinding(o) => {
                self.upsert(Api::all(self.client.clone()), o, RbacKind::ClusterRoleBinding)
                    .await
            }
            RbacObject::RoleBinding(o) => {
                let namespace = o.namespace().unwrap_or_default();
                self.upsert(
                    Api::namespaced(self.client.clone(), &namespace),
                    o,
                    RbacKind::RoleBinding,
                )
                .await
            }
        }
    }

    async fn delete(
        &self,
        kind: RbacKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DeleteOutcome, RemoteError> {
        match kind {
            RbacKind::ClusterRole => {
                let api: Api<ClusterRole> = Api::all(self.client.clone());
                self.delete_typed(api, kind, None, name).await
            }
            RbacKind::ClusterRoleBinding => {
                let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
                self.delete_typed(api, kind, None, name).await
            }
            RbacKind::RoleBinding => {
                let namespace = namespace.unwrap_or_default();
                let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
                self.delete_typed(api, kind, Some(namespace), name).await
            }
        }
    }

    async fn list(
        &self,
        kind: RbacKind,
        label_selector: &str,
    ) -> Result<Vec<RbacObject>, RemoteError> {
        match kind {
            RbacKind::ClusterRole => self.list_typed::<ClusterRole>(kind, label_selector).await,
            RbacKind::ClusterRoleBinding => {
                self.list_typed::<ClusterRoleBinding>(kind, label_selector)
                    .await
            }
            RbacKind::RoleBinding => self.list_typed::<RoleBinding>(kind, label_selector).await,
        }
    }

    async fn ensure_namespace(&self, name: &str) -> Result<OperationResult, RemoteError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        match api.create(&post_params(), &namespace).await {
            Ok(_) => {
                info!("Created namespace {} on cluster {}", name, self.cluster);
                Ok(OperationResult::Created)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(OperationResult::None),
            Err(e) => Err(RemoteError::from_kube(e, "Namespace", name)),
        }
    }
}
