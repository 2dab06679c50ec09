// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Merge a desired RBAC object into the one observed on a remote cluster.
//!
//! Only the fields the operator owns are touched:
//!
//! - `ClusterRole`: labels, rules and aggregation rule
//! - `ClusterRoleBinding` / `RoleBinding`: labels and subjects
//!
//! Operator labels (`fleetrbac.firestoned.io/*`, `app.kubernetes.io/managed-by` and
//! `part-of`) that the desired object no longer carries are removed. Everything else on
//! the observed object (annotations, owner references, labels set by other tools,
//! `resourceVersion`) is preserved. A binding whose `roleRef` differs
//! cannot be patched because the field is immutable, so it must be recreated.

use super::RbacObject;
use crate::labels::is_operator_label;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// What has to happen to bring an observed object to the desired state.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Observed already matches.
    Unchanged,
    /// Write back this merged object.
    Update(RbacObject),
    /// The immutable `roleRef` changed; delete and create the desired object.
    Recreate,
}

/// Compute the mutation turning `existing` into `desired`.
///
/// Objects of different kinds are treated as a recreate.
#[must_use]
pub fn mutate(existing: &RbacObject, desired: &RbacObject) -> Mutation {
    match (existing, desired) {
        (RbacObject::ClusterRole(observed), RbacObject::ClusterRole(want)) => {
            let mut merged = observed.clone();
            let mut changed = merge_labels(&mut merged.metadata, &want.metadata);

            if merged.aggregation_rule != want.aggregation_rule {
                merged.aggregation_rule.clone_from(&want.aggregation_rule);
                changed = true;
            }
            // Full overwrite from the source TeamRole, aggregated or not
            changed |= merge_list(&mut merged.rules, &want.rules);

            finish(changed, RbacObject::ClusterRole(merged))
        }
        (RbacObject::ClusterRoleBinding(observed), RbacObject::ClusterRoleBinding(want)) => {
            if observed.role_ref != want.role_ref {
                return Mutation::Recreate;
            }
            let mut merged = observed.clone();
            let mut changed = merge_labels(&mut merged.metadata, &want.metadata);
            changed |= merge_list(&mut merged.subjects, &want.subjects);
            finish(changed, RbacObject::ClusterRoleBinding(merged))
        }
        (RbacObject::RoleBinding(observed), RbacObject::RoleBinding(want)) => {
            if observed.role_ref != want.role_ref {
                return Mutation::Recreate;
            }
            let mut merged = observed.clone();
            let mut changed = merge_labels(&mut merged.metadata, &want.metadata);
            changed |= merge_list(&mut merged.subjects, &want.subjects);
            finish(changed, RbacObject::RoleBinding(merged))
        }
        _ => Mutation::Recreate,
    }
}

fn finish(changed: bool, merged: RbacObject) -> Mutation {
    if changed {
        Mutation::Update(merged)
    } else {
        Mutation::Unchanged
    }
}

/// Replace `observed` with `desired` unless they differ only in absent versus empty,
/// which the API server does not distinguish.
fn merge_list<T>(observed: &mut Option<Vec<T>>, desired: &Option<Vec<T>>) -> bool
where
    T: Clone + PartialEq,
{
    let have = observed.as_deref().unwrap_or_default();
    let want = desired.as_deref().unwrap_or_default();
    if have == want {
        return false;
    }
    observed.clone_from(desired);
    true
}

/// Overlay desired labels onto observed ones.
///
/// Operator labels missing from `desired` are dropped; labels owned by others are kept.
fn merge_labels(observed: &mut ObjectMeta, desired: &ObjectMeta) -> bool {
    let empty = BTreeMap::new();
    let desired = desired.labels.as_ref().unwrap_or(&empty);
    let labels = observed.labels.get_or_insert_with(BTreeMap::new);

    let before = labels.len();
    labels.retain(|key, _| !is_operator_label(key) || desired.contains_key(key));
    let mut changed = labels.len() != before;

    for (key, value) in desired {
        if labels.get(key) != Some(value) {
            labels.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
#[path = "mutate_tests.rs"]
mod mutate_tests;
