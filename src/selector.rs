// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label selector utilities and the dependency index for `TeamRoleBinding` watches.
//!
//! This module provides functions to:
//! - validate a [`LabelSelector`] and render it as a Kubernetes label query
//! - match a selector against a label set in memory
//! - find the `TeamRoleBinding`s that depend on a changed `TeamRole`, `Team` or `Cluster`
//!
//! # Architecture
//!
//! The controller keeps an in-memory reflector store of all `TeamRoleBinding`s.
//! When a dependency changes, the watch mapper synchronously filters this cache to find
//! every binding that references it. The index is recomputed on every event rather than
//! maintained incrementally, so it can never drift from the cache.

use crate::crd::{Cluster, LabelSelector, Team, TeamRole, TeamRoleBinding};
use crate::errors::PropagationError;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;

const OP_IN: &str = "In";
const OP_NOT_IN: &str = "NotIn";
const OP_EXISTS: &str = "Exists";
const OP_DOES_NOT_EXIST: &str = "DoesNotExist";

/// Render a label selector as a Kubernetes label query string.
///
/// # Errors
///
/// Returns [`PropagationError::InvalidSelector`] if an expression uses an unknown
/// operator, has an empty key, or has values inconsistent with its operator.
///
/// # Example
///
/// ```rust
/// use fleetrbac::crd::LabelSelector;
/// use fleetrbac::selector::to_label_query;
/// use std::collections::BTreeMap;
///
/// let selector = LabelSelector {
///     match_labels: Some(BTreeMap::from([("env".to_string(), "prod".to_string())])),
///     match_expressions: None,
/// };
/// assert_eq!(to_label_query(&selector).unwrap(), "env=prod");
/// ```
pub fn to_label_query(selector: &LabelSelector) -> Result<String, PropagationError> {
    let mut parts = Vec::new();

    if let Some(labels) = &selector.match_labels {
        for (key, value) in labels {
            if key.is_empty() {
                return Err(invalid("matchLabels contains an empty key"));
            }
            parts.push(format!("{key}={value}"));
        }
    }

    for expr in selector.match_expressions.iter().flatten() {
        if expr.key.is_empty() {
            return Err(invalid("matchExpressions contains an empty key"));
        }
        let values = expr.values.clone().unwrap_or_default();

        let part = match expr.operator.as_str() {
            OP_IN | OP_NOT_IN => {
                if values.is_empty() {
                    return Err(invalid(&format!(
                        "operator {} on key {} requires at least one value",
                        expr.operator, expr.key
                    )));
                }
                let op = if expr.operator == OP_IN { "in" } else { "notin" };
                format!("{} {op} ({})", expr.key, values.join(","))
            }
            OP_EXISTS | OP_DOES_NOT_EXIST => {
                if !values.is_empty() {
                    return Err(invalid(&format!(
                        "operator {} on key {} does not take values",
                        expr.operator, expr.key
                    )));
                }
                if expr.operator == OP_EXISTS {
                    expr.key.clone()
                } else {
                    format!("!{}", expr.key)
                }
            }
            other => {
                return Err(invalid(&format!(
                    "unknown operator {other} on key {}",
                    expr.key
                )))
            }
        };
        parts.push(part);
    }

    Ok(parts.join(","))
}

fn invalid(reason: &str) -> PropagationError {
    PropagationError::InvalidSelector {
        reason: reason.to_string(),
    }
}

/// Check whether a label set satisfies a selector.
///
/// Unknown operators never match. An empty selector matches everything.
#[must_use]
pub fn matches_selector(selector: &LabelSelector, labels: &BTreeMap<String, String>) -> bool {
    let labels_match = selector
        .match_labels
        .iter()
        .flatten()
        .all(|(k, v)| labels.get(k) == Some(v));

    let expressions_match = selector.match_expressions.iter().flatten().all(|expr| {
        let values = expr.values.as_deref().unwrap_or_default();
        match expr.operator.as_str() {
            OP_IN => labels.get(&expr.key).is_some_and(|v| values.contains(v)),
            OP_NOT_IN => labels.get(&expr.key).is_none_or(|v| !values.contains(v)),
            OP_EXISTS => labels.contains_key(&expr.key),
            OP_DOES_NOT_EXIST => !labels.contains_key(&expr.key),
            _ => false,
        }
    });

    labels_match && expressions_match
}

/// Whether a binding's cluster selector currently selects the given cluster.
#[must_use]
pub fn binding_selects_cluster(binding: &TeamRoleBinding, cluster: &Cluster) -> bool {
    let selector = &binding.spec.cluster_selector;
    if let Some(name) = selector.cluster_name.as_deref().filter(|n| !n.is_empty()) {
        return name == cluster.name_any();
    }
    selector
        .label_selector
        .as_ref()
        .filter(|s| !s.is_empty())
        .is_some_and(|s| matches_selector(s, cluster.labels()))
}

fn same_namespace(binding: &TeamRoleBinding, namespace: Option<String>) -> bool {
    binding.namespace() == namespace
}

/// Bindings in the team role's namespace that reference it.
#[must_use]
pub fn bindings_for_team_role(
    bindings: &[Arc<TeamRoleBinding>],
    team_role: &TeamRole,
) -> Vec<ObjectRef<TeamRoleBinding>> {
    let name = team_role.name_any();
    bindings
        .iter()
        .filter(|b| same_namespace(b, team_role.namespace()) && b.spec.team_role_ref == name)
        .map(|b| ObjectRef::from_obj(&**b))
        .collect()
}

/// Bindings in the team's namespace that reference it.
#[must_use]
pub fn bindings_for_team(
    bindings: &[Arc<TeamRoleBinding>],
    team: &Team,
) -> Vec<ObjectRef<TeamRoleBinding>> {
    let name = team.name_any();
    bindings
        .iter()
        .filter(|b| same_namespace(b, team.namespace()) && b.spec.team_ref == name)
        .map(|b| ObjectRef::from_obj(&**b))
        .collect()
}

/// Bindings in the cluster's namespace that select it now, or still track it in status.
///
/// Including tracked clusters makes a label change that drops a cluster from the
/// selection trigger the cleanup of that cluster.
#[must_use]
pub fn bindings_for_cluster(
    bindings: &[Arc<TeamRoleBinding>],
    cluster: &Cluster,
) -> Vec<ObjectRef<TeamRoleBinding>> {
    let name = cluster.name_any();
    bindings
        .iter()
        .filter(|b| same_namespace(b, cluster.namespace()))
        .filter(|b| binding_selects_cluster(b, cluster) || b.tracked_clusters().contains(&name))
        .map(|b| ObjectRef::from_obj(&**b))
        .collect()
}

/// Watch mapper for `TeamRole` changes backed by the binding reflector store.
pub fn team_role_mapper(
    store: Store<TeamRoleBinding>,
) -> impl Fn(TeamRole) -> Vec<ObjectRef<TeamRoleBinding>> + Send + Sync + Clone + 'static {
    move |team_role| bindings_for_team_role(&store.state(), &team_role)
}

/// Watch mapper for `Team` changes backed by the binding reflector store.
pub fn team_mapper(
    store: Store<TeamRoleBinding>,
) -> impl Fn(Team) -> Vec<ObjectRef<TeamRoleBinding>> + Send + Sync + Clone + 'static {
    move |team| bindings_for_team(&store.state(), &team)
}

/// Watch mapper for `Cluster` changes backed by the binding reflector store.
pub fn cluster_mapper(
    store: Store<TeamRoleBinding>,
) -> impl Fn(Cluster) -> Vec<ObjectRef<TeamRoleBinding>> + Send + Sync + Clone + 'static {
    move |cluster| bindings_for_cluster(&store.state(), &cluster)
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod selector_tests;
