// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for fleet RBAC management.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by fleetrbac
//! to propagate authorization objects declaratively across a fleet of clusters.
//!
//! # Resource Types
//!
//! - [`TeamRoleBinding`] - Grants a [`TeamRole`] to a [`Team`] on selected clusters.
//!   This is the only resource reconciled by the operator.
//! - [`TeamRole`] - A named set of RBAC rules, optionally aggregated
//! - [`Team`] - A group of people, mapped to one identity-provider group
//! - [`Cluster`] - A registered remote cluster with readiness and labels
//!
//! # Example: Granting a role on all production clusters
//!
//! ```rust,no_run
//! use fleetrbac::crd::{ClusterSelector, LabelSelector, TeamRoleBindingSpec};
//! use std::collections::BTreeMap;
//!
//! let spec = TeamRoleBindingSpec {
//!     team_role_ref: "viewer".to_string(),
//!     team_ref: "platform".to_string(),
//!     cluster_selector: ClusterSelector {
//!         cluster_name: None,
//!         label_selector: Some(LabelSelector {
//!             match_labels: Some(BTreeMap::from([(
//!                 "env".to_string(),
//!                 "production".to_string(),
//!             )])),
//!             match_expressions: None,
//!         }),
//!     },
//!     namespaces: vec![],
//!     create_namespaces: false,
//!     usernames: vec![],
//! };
//! ```

use crate::constants::{CONDITION_TYPE_CLUSTER_READY, STATUS_TRUE};
use k8s_openapi::api::rbac::v1::{AggregationRule, PolicyRule};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

impl LabelSelector {
    /// Returns `true` if the selector carries no requirement at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.match_labels.as_ref().is_none_or(BTreeMap::is_empty)
            && self.match_expressions.as_ref().is_none_or(Vec::is_empty)
    }
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// Condition represents an observation of a resource's current state.
///
/// Conditions are used in status subresources to communicate the state of
/// a resource to users and controllers.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, RBACReady.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

// ============================================================================
// TeamRoleBinding
// ============================================================================

/// Selects the remote clusters a `TeamRoleBinding` propagates to.
///
/// `clusterName` takes precedence: when it is set, `labelSelector` is ignored.
/// When neither is set the binding targets no cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSelector {
    /// Name of a single `Cluster` in the binding's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,

    /// Label query over `Cluster` resources in the binding's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

/// `TeamRoleBinding` grants the rules of a `TeamRole` to the members of a `Team`
/// on every selected remote cluster.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "fleetrbac.firestoned.io",
    version = "v1alpha1",
    kind = "TeamRoleBinding",
    namespaced,
    shortname = "trb",
    doc = "TeamRoleBinding grants a TeamRole to a Team on a dynamic set of remote clusters. With no namespaces it produces one ClusterRoleBinding per cluster, otherwise one RoleBinding per listed namespace per cluster.",
    printcolumn = r#"{"name":"Team Role","type":"string","jsonPath":".spec.teamRoleRef"}"#,
    printcolumn = r#"{"name":"Team","type":"string","jsonPath":".spec.teamRef"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "TeamRoleBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct TeamRoleBindingSpec {
    /// Name of the `TeamRole` in the same namespace whose rules are granted.
    pub team_role_ref: String,

    /// Name of the `Team` in the same namespace whose identity-provider group is granted.
    pub team_ref: String,

    /// Clusters this binding propagates to.
    #[serde(default)]
    pub cluster_selector: ClusterSelector,

    /// Namespaces on the remote clusters to grant the role in.
    ///
    /// Empty means cluster-wide: one `ClusterRoleBinding` per cluster.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Create listed namespaces on the remote cluster when they do not exist.
    #[serde(default)]
    pub create_namespaces: bool,

    /// Additional usernames granted the role alongside the team's group.
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl TeamRoleBindingSpec {
    /// Returns `true` when this binding produces per-namespace `RoleBinding`s.
    #[must_use]
    pub fn is_namespace_scoped(&self) -> bool {
        !self.namespaces.is_empty()
    }
}

/// Propagation state of a `TeamRoleBinding` on one remote cluster.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropagationStatus {
    /// Name of the remote `Cluster`.
    pub cluster_name: String,

    /// `RBACReady` condition for this cluster.
    pub condition: Condition,
}

/// `TeamRoleBinding` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoleBindingStatus {
    /// Aggregate `RBACReady` and `Ready` conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// One entry per cluster the binding is propagated to, ordered by cluster name.
    #[serde(default)]
    pub propagation_status: Vec<PropagationStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl TeamRoleBinding {
    /// Names of all clusters currently tracked in status.
    #[must_use]
    pub fn tracked_clusters(&self) -> Vec<String> {
        self.status
            .as_ref()
            .map(|s| {
                s.propagation_status
                    .iter()
                    .map(|p| p.cluster_name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// TeamRole
// ============================================================================

/// `TeamRole` is the hub-side template of the shared `ClusterRole`.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, JsonSchema)]
#[kube(
    group = "fleetrbac.firestoned.io",
    version = "v1alpha1",
    kind = "TeamRole",
    namespaced,
    shortname = "tr",
    doc = "TeamRole defines a set of RBAC rules materialized as a shared ClusterRole on every cluster a TeamRoleBinding targets."
)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoleSpec {
    /// Policy rules copied verbatim into the remote `ClusterRole`.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,

    /// Aggregation rule copied verbatim; evaluated by the remote cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_rule: Option<AggregationRule>,
}

// ============================================================================
// Team
// ============================================================================

/// `Team` maps a group of people to an identity-provider group.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "fleetrbac.firestoned.io",
    version = "v1alpha1",
    kind = "Team",
    namespaced,
    doc = "Team is a group of people identified on remote clusters by one identity-provider group.",
    printcolumn = r#"{"name":"IdP Group","type":"string","jsonPath":".spec.mappedIdpGroup"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TeamSpec {
    /// Free-form description of the team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Identity-provider group used as the RBAC `Group` subject.
    #[serde(default)]
    pub mapped_idp_group: String,
}

// ============================================================================
// Cluster
// ============================================================================

/// `Cluster` is a remote cluster registered with the fleet.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "fleetrbac.firestoned.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    doc = "Cluster is a remote Kubernetes cluster reachable through a kubeconfig stored in a Secret in the same namespace.",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#
)]
#[kube(status = "ClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Secret holding the kubeconfig under the `kubeconfig` key.
    ///
    /// Defaults to a Secret named like the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_secret_ref: Option<String>,
}

/// `Cluster` status, maintained by the onboarding controller.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Cluster {
    /// A cluster is ready when its `Ready` condition is `True`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.conditions
                .iter()
                .any(|c| c.r#type == CONDITION_TYPE_CLUSTER_READY && c.status == STATUS_TRUE)
        })
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
