// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Read access to hub resources a `TeamRoleBinding` depends on.
//!
//! The propagation engine only reads `TeamRole`, `Team` and `Cluster` objects in the
//! binding's own namespace. [`KubeInventory`] serves them from the hub API server.

use crate::crd::{Cluster, LabelSelector, Team, TeamRole};
use crate::selector::to_label_query;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};

/// Lookups of hub resources, always scoped to one namespace.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Fetch a `TeamRole`, `None` if it does not exist.
    async fn get_team_role(&self, namespace: &str, name: &str) -> Result<Option<TeamRole>>;

    /// Fetch a `Team`, `None` if it does not exist.
    async fn get_team(&self, namespace: &str, name: &str) -> Result<Option<Team>>;

    /// Fetch a `Cluster`, `None` if it does not exist.
    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<Cluster>>;

    /// List `Cluster`s matching a label selector. An empty selector lists all of them.
    async fn list_clusters(&self, namespace: &str, selector: &LabelSelector)
        -> Result<Vec<Cluster>>;
}

/// [`Inventory`] backed by the hub API server.
#[derive(Clone)]
pub struct KubeInventory {
    client: Client,
}

impl KubeInventory {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Inventory for KubeInventory {
    async fn get_team_role(&self, namespace: &str, name: &str) -> Result<Option<TeamRole>> {
        let api: Api<TeamRole> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .with_context(|| format!("failed to get TeamRole {namespace}/{name}"))
    }

    async fn get_team(&self, namespace: &str, name: &str) -> Result<Option<Team>> {
        let api: Api<Team> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .with_context(|| format!("failed to get Team {namespace}/{name}"))
    }

    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<Cluster>> {
        let api: Api<Cluster> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await
            .with_context(|| format!("failed to get Cluster {namespace}/{name}"))
    }

    async fn list_clusters(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Cluster>> {
        let label_query = to_label_query(selector)?;
        let api: Api<Cluster> = Api::namespaced(self.client.clone(), namespace);
        let params = if label_query.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(&label_query)
        };
        let list = api
            .list(&params)
            .await
            .with_context(|| {
                format!("failed to list Clusters in {namespace} matching '{label_query}'")
            })?;
        Ok(list.items)
    }
}
