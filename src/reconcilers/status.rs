// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the `TeamRoleBinding` status tracker.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready", "RBACReady")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! `lastTransitionTime` only moves when `status` flips. External consumers poll it to
//! detect transitions, so rewriting a message must never touch it.

use crate::constants::{
    CONDITION_TYPE_RBAC_READY, CONDITION_TYPE_READY, STATUS_FALSE, STATUS_TRUE,
};
use crate::crd::{Condition, PropagationStatus, TeamRoleBinding, TeamRoleBindingStatus};
use crate::errors::PropagationError;
use crate::status_reasons::{
    MESSAGE_ALL_CLUSTERS_READY, MESSAGE_EMPTY_CLUSTER_LIST, MESSAGE_PROPAGATION_FAILED,
    MESSAGE_RBAC_RECONCILED, REASON_ALL_CLUSTERS_READY, REASON_DELETION_PENDING,
    REASON_EMPTY_CLUSTER_LIST, REASON_PROPAGATION_FAILED, REASON_RBAC_RECONCILED,
};
use anyhow::Result;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Create a new condition stamped with the current time.
///
/// # Example
///
/// ```rust
/// # use fleetrbac::reconcilers::status::create_condition;
/// let condition =
///     create_condition("RBACReady", "True", "RBACReconciled", "RBAC objects reconciled");
/// assert_eq!(condition.r#type, "RBACReady");
/// assert!(condition.last_transition_time.is_some());
/// ```
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Overwrite a condition in place, keeping `lastTransitionTime` if `status` is unchanged.
fn overwrite_condition(existing: &mut Condition, status: &str, reason: &str, message: &str) {
    if existing.status != status || existing.last_transition_time.is_none() {
        existing.last_transition_time = Some(Utc::now().to_rfc3339());
    }
    existing.status = status.to_string();
    existing.reason = Some(reason.to_string());
    existing.message = Some(message.to_string());
}

/// Update or add a condition in a conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is preserved if the status hasn't changed.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        overwrite_condition(existing, status, reason, message);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

fn condition_semantically_equal(a: &Condition, b: &Condition) -> bool {
    a.r#type == b.r#type && a.status == b.status && a.reason == b.reason && a.message == b.message
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|n| {
            find_condition(current, &n.r#type).is_some_and(|c| condition_semantically_equal(c, n))
        })
}

/// Compare two propagation lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn propagation_equal(current: &[PropagationStatus], new: &[PropagationStatus]) -> bool {
    current.len() == new.len()
        && current.iter().zip(new).all(|(c, n)| {
            c.cluster_name == n.cluster_name
                && condition_semantically_equal(&c.condition, &n.condition)
        })
}

/// Centralized status updater for `TeamRoleBinding` resources.
///
/// Collects per-cluster entries and aggregate conditions during a reconciliation and
/// applies them in a single merge patch, skipped when nothing changed semantically.
/// Entries are kept sorted by cluster name with at most one entry per cluster.
pub struct TeamRoleBindingStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<TeamRoleBindingStatus>,
    new_status: TeamRoleBindingStatus,
}

impl TeamRoleBindingStatusUpdater {
    /// Start from the binding's current status.
    #[must_use]
    pub fn new(binding: &TeamRoleBinding) -> Self {
        let current_status = binding.status.clone();
        let mut new_status = current_status.clone().unwrap_or_default();
        new_status
            .propagation_status
            .sort_by(|a, b| a.cluster_name.cmp(&b.cluster_name));
        new_status
            .propagation_status
            .dedup_by(|a, b| a.cluster_name == b.cluster_name);

        Self {
            namespace: binding.namespace().unwrap_or_default(),
            name: binding.name_any(),
            current_status,
            new_status,
        }
    }

    /// Set a cluster's `RBACReady` condition, creating its entry if needed.
    pub fn set_cluster_condition(
        &mut self,
        cluster: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        let entries = &mut self.new_status.propagation_status;
        match entries.binary_search_by(|e| e.cluster_name.as_str().cmp(cluster)) {
            Ok(idx) => overwrite_condition(&mut entries[idx].condition, status, reason, message),
            Err(idx) => entries.insert(
                idx,
                PropagationStatus {
                    cluster_name: cluster.to_string(),
                    condition: create_condition(CONDITION_TYPE_RBAC_READY, status, reason, message),
                },
            ),
        }
    }

    /// Record a successful propagation to a cluster.
    pub fn set_cluster_ready(&mut self, cluster: &str) {
        self.set_cluster_condition(
            cluster,
            STATUS_TRUE,
            REASON_RBAC_RECONCILED,
            MESSAGE_RBAC_RECONCILED,
        );
    }

    /// Record a per-cluster failure against the cluster the error names.
    pub fn set_cluster_failed(&mut self, cluster: &str, err: &PropagationError) {
        self.set_cluster_condition(cluster, STATUS_FALSE, err.reason(), &err.to_string());
    }

    /// Drop a cluster's entry. Returns `true` if there was one.
    pub fn remove_cluster(&mut self, cluster: &str) -> bool {
        let before = self.new_status.propagation_status.len();
        self.new_status
            .propagation_status
            .retain(|e| e.cluster_name != cluster);
        before != self.new_status.propagation_status.len()
    }

    /// Clusters with an entry, in name order.
    #[must_use]
    pub fn tracked_clusters(&self) -> Vec<String> {
        self.new_status
            .propagation_status
            .iter()
            .map(|e| e.cluster_name.clone())
            .collect()
    }

    fn set_aggregate(&mut self, status: &str, reason: &str, message: &str) {
        for condition_type in [CONDITION_TYPE_RBAC_READY, CONDITION_TYPE_READY] {
            update_condition_in_memory(
                &mut self.new_status.conditions,
                condition_type,
                status,
                reason,
                message,
            );
        }
    }

    /// Reduce the per-cluster entries to the aggregate conditions.
    ///
    /// Returns `true` when every entry is `True`.
    pub fn aggregate(&mut self) -> bool {
        let ready = self
            .new_status
            .propagation_status
            .iter()
            .all(|e| e.condition.status == STATUS_TRUE);

        if ready {
            self.set_aggregate(STATUS_TRUE, REASON_ALL_CLUSTERS_READY, MESSAGE_ALL_CLUSTERS_READY);
        } else {
            self.set_aggregate(STATUS_FALSE, REASON_PROPAGATION_FAILED, MESSAGE_PROPAGATION_FAILED);
        }
        ready
    }

    /// The selector resolved to no cluster; a terminal, non-error state.
    pub fn set_empty_target_list(&mut self) {
        self.set_aggregate(STATUS_FALSE, REASON_EMPTY_CLUSTER_LIST, MESSAGE_EMPTY_CLUSTER_LIST);
    }

    /// A whole-binding error stopped the reconciliation before any cluster was touched.
    pub fn set_fatal(&mut self, err: &PropagationError) {
        self.set_aggregate(STATUS_FALSE, err.reason(), &err.to_string());
    }

    /// Deletion is waiting for clusters that still hold objects.
    pub fn set_deletion_pending(&mut self) {
        let remaining = self.tracked_clusters().join(", ");
        update_condition_in_memory(
            &mut self.new_status.conditions,
            CONDITION_TYPE_READY,
            STATUS_FALSE,
            REASON_DELETION_PENDING,
            &format!("Waiting to remove RBAC objects from: {remaining}"),
        );
    }

    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.observed_generation = generation;
    }

    /// Whether the status differs semantically from the one read at the start.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.observed_generation != self.new_status.observed_generation
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
                    || !propagation_equal(
                        &current.propagation_status,
                        &self.new_status.propagation_status,
                    )
            }
        }
    }

    /// The status as it will be written.
    #[must_use]
    pub fn status(&self) -> &TeamRoleBindingStatus {
        &self.new_status
    }

    /// Apply the collected status changes (single API call, skipped when unchanged).
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    pub async fn apply(&self, client: &Client) -> Result<()> {
        if !self.has_changes() {
            debug!(
                "TeamRoleBinding {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(());
        }

        let api: Api<TeamRoleBinding> = Api::namespaced(client.clone(), &self.namespace);
        let patch = json!({ "status": self.new_status });

        api.patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(
            "Updated TeamRoleBinding {}/{} status: {} condition(s), {} cluster(s)",
            self.namespace,
            self.name,
            self.new_status.conditions.len(),
            self.new_status.propagation_status.len()
        );

        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
