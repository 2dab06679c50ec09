// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Target resolution: which registered clusters a `TeamRoleBinding` propagates to.
//!
//! The selector is re-evaluated on every reconciliation:
//!
//! - `clusterName` set: that one cluster, or nothing if it does not exist
//! - otherwise a non-empty `labelSelector`: every matching cluster in the binding's namespace
//! - otherwise: nothing
//!
//! An empty result is a normal state, not an error. Clusters that match but are not
//! ready are split off so the caller can record them as failed without touching them.

use crate::crd::{Cluster, TeamRoleBinding};
use crate::errors::PropagationError;
use crate::inventory::Inventory;
use crate::selector::to_label_query;
use kube::ResourceExt;
use tracing::debug;

/// Clusters selected by a binding, split by readiness and sorted by name.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Ready clusters to propagate to
    pub targets: Vec<Cluster>,
    /// Selected clusters that are not ready
    pub not_ready: Vec<Cluster>,
}

impl Resolution {
    /// Names of the ready targets.
    #[must_use]
    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|c| c.name_any()).collect()
    }

    /// Whether a cluster is among the ready targets.
    #[must_use]
    pub fn contains(&self, cluster: &str) -> bool {
        self.targets.iter().any(|c| c.name_any() == cluster)
    }
}

/// Validate the binding's selector without resolving it.
///
/// # Errors
///
/// Returns [`PropagationError::InvalidSelector`] for a malformed label selector. A set
/// `clusterName` makes the label selector irrelevant, so it is not checked.
pub fn validate_selector(binding: &TeamRoleBinding) -> Result<(), PropagationError> {
    let selector = &binding.spec.cluster_selector;
    if selector.cluster_name.as_deref().is_some_and(|n| !n.is_empty()) {
        return Ok(());
    }
    if let Some(labels) = &selector.label_selector {
        to_label_query(labels)?;
    }
    Ok(())
}

/// Resolve the clusters a binding currently targets.
///
/// # Errors
///
/// Returns [`PropagationError::InvalidSelector`] for a malformed selector and
/// [`PropagationError::Hub`] if the hub cannot be queried.
pub async fn resolve_targets(
    inventory: &dyn Inventory,
    binding: &TeamRoleBinding,
) -> Result<Resolution, PropagationError> {
    let namespace = binding.namespace().unwrap_or_default();
    let selector = &binding.spec.cluster_selector;

    let selected: Vec<Cluster> =
        if let Some(name) = selector.cluster_name.as_deref().filter(|n| !n.is_empty()) {
            inventory
                .get_cluster(&namespace, name)
                .await?
                .into_iter()
                .collect()
        } else if let Some(labels) = selector.label_selector.as_ref().filter(|s| !s.is_empty()) {
            to_label_query(labels)?;
            inventory.list_clusters(&namespace, labels).await?
        } else {
            Vec::new()
        };

    let (mut targets, mut not_ready): (Vec<_>, Vec<_>) =
        selected.into_iter().partition(Cluster::is_ready);
    targets.sort_by_key(|c| c.name_any());
    not_ready.sort_by_key(|c| c.name_any());

    debug!(
        "TeamRoleBinding {}/{} selects {} ready and {} not-ready cluster(s)",
        namespace,
        binding.name_any(),
        targets.len(),
        not_ready.len()
    );

    Ok(Resolution { targets, not_ready })
}

#[cfg(test)]
#[path = "targets_tests.rs"]
mod targets_tests;
