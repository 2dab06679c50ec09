// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Builds remote clients from kubeconfig Secrets on the hub.
//!
//! Each `Cluster` names a Secret in its own namespace (defaulting to the cluster's
//! name) whose `kubeconfig` key holds a kubeconfig for the remote API server.
//! Clients are cached per cluster and rebuilt when the Secret's `resourceVersion`
//! changes, so rotated credentials are picked up without a restart. A cluster whose
//! Secret can no longer be read loses its cached client.

use super::kube_client::KubeRemoteClient;
use super::{ClusterClientFactory, RemoteClient};
use crate::constants::KUBECONFIG_SECRET_KEY;
use crate::crd::Cluster;
use crate::errors::RemoteError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, ResourceExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

type ClusterKey = (String, String);

struct CachedClient {
    secret_version: Option<String>,
    client: Arc<dyn RemoteClient>,
}

/// Remote clients keyed by `(namespace, cluster)`, tagged with the Secret version
/// they were built from.
#[derive(Default)]
pub(crate) struct ClientCache {
    entries: HashMap<ClusterKey, CachedClient>,
}

impl ClientCache {
    /// Cached client for `key`, if it was built from `secret_version`.
    pub(crate) fn get(
        &self,
        key: &ClusterKey,
        secret_version: Option<&str>,
    ) -> Option<Arc<dyn RemoteClient>> {
        self.entries
            .get(key)
            .filter(|cached| cached.secret_version.as_deref() == secret_version)
            .map(|cached| cached.client.clone())
    }

    pub(crate) fn insert(
        &mut self,
        key: ClusterKey,
        secret_version: Option<String>,
        client: Arc<dyn RemoteClient>,
    ) {
        self.entries.insert(
            key,
            CachedClient {
                secret_version,
                client,
            },
        );
    }

    /// Drop the client for `key`. Returns whether one was cached.
    pub(crate) fn evict(&mut self, key: &ClusterKey) -> bool {
        self.entries.remove(key).is_some()
    }
}

/// [`ClusterClientFactory`] reading kubeconfigs from hub Secrets.
pub struct KubeconfigSecretClientFactory {
    hub: Client,
    cache: RwLock<ClientCache>,
}

impl KubeconfigSecretClientFactory {
    #[must_use]
    pub fn new(hub: Client) -> Self {
        Self {
            hub,
            cache: RwLock::new(ClientCache::default()),
        }
    }

    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Secret, RemoteError> {
        let api: Api<Secret> = Api::namespaced(self.hub.clone(), namespace);
        match api.get_opt(name).await {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) => Err(RemoteError::Credentials {
                reason: format!("kubeconfig Secret {namespace}/{name} not found"),
            }),
            Err(e) => Err(RemoteError::Credentials {
                reason: format!("cannot read kubeconfig Secret {namespace}/{name}: {e}"),
            }),
        }
    }
}

/// Name of the Secret holding a cluster's kubeconfig.
#[must_use]
pub fn kubeconfig_secret_name(cluster: &Cluster) -> String {
    cluster
        .spec
        .kubeconfig_secret_ref
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| cluster.name_any())
}

/// Extract and parse the kubeconfig stored in a Secret.
///
/// # Errors
///
/// Returns [`RemoteError::Credentials`] when the key is missing or the content is not
/// a valid kubeconfig.
pub fn parse_kubeconfig_secret(secret: &Secret) -> Result<Kubeconfig, RemoteError> {
    let raw = secret
        .data
        .as_ref()
        .and_then(|d| d.get(KUBECONFIG_SECRET_KEY))
        .ok_or_else(|| RemoteError::Credentials {
            reason: format!(
                "Secret {} has no '{KUBECONFIG_SECRET_KEY}' key",
                secret.name_any()
            ),
        })?;

    let text = std::str::from_utf8(&raw.0).map_err(|e| RemoteError::Credentials {
        reason: format!("invalid kubeconfig UTF-8: {e}"),
    })?;

    Kubeconfig::from_yaml(text).map_err(|e| RemoteError::Credentials {
        reason: format!("invalid kubeconfig: {e}"),
    })
}

async fn build_client(kubeconfig: Kubeconfig) -> Result<Client, RemoteError> {
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| RemoteError::Credentials {
            reason: format!("failed to load kubeconfig: {e}"),
        })?;

    Client::try_from(config).map_err(|e| RemoteError::Credentials {
        reason: format!("failed to create client: {e}"),
    })
}

#[async_trait]
impl ClusterClientFactory for KubeconfigSecretClientFactory {
    async fn client_for(&self, cluster: &Cluster) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        let namespace = cluster.namespace().unwrap_or_default();
        let cluster_name = cluster.name_any();
        let secret_name = kubeconfig_secret_name(cluster);
        let key = (namespace.clone(), cluster_name.clone());

        let secret = match self.read_secret(&namespace, &secret_name).await {
            Ok(secret) => secret,
            Err(e) => {
                if self.cache.write().await.evict(&key) {
                    debug!(
                        "Evicted cached client for cluster {}/{}",
                        namespace, cluster_name
                    );
                }
                return Err(e);
            }
        };
        let secret_version = secret.resource_version();

        if let Some(client) = self.cache.read().await.get(&key, secret_version.as_deref()) {
            debug!("Reusing client for cluster {}/{}", namespace, cluster_name);
            return Ok(client);
        }

        let kubeconfig = parse_kubeconfig_secret(&secret)?;
        let client: Arc<dyn RemoteClient> = Arc::new(KubeRemoteClient::new(
            build_client(kubeconfig).await?,
            cluster_name.clone(),
        ));

        info!(
            "Built client for cluster {}/{} from Secret {}",
            namespace, cluster_name, secret_name
        );
        self.cache
            .write()
            .await
            .insert(key, secret_version, client.clone());
        Ok(client)
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod factory_tests;
