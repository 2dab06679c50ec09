// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired remote RBAC objects for a `TeamRoleBinding`.
//!
//! Per target cluster a binding materializes:
//!
//! - one shared `ClusterRole` named `fleetrbac:<teamRole>`, reused by every binding of
//!   the same `TeamRole`
//! - either one `ClusterRoleBinding` named `fleetrbac:<binding>` (no namespaces listed)
//!   or one `RoleBinding` of that name in every listed namespace
//!
//! Every object carries the `team-role` reference label. Binding objects additionally
//! carry the `team-role-binding` label used to find them again during cleanup.

use crate::constants::{
    KIND_CLUSTER_ROLE, RBAC_API_GROUP, RBAC_PREFIX, SUBJECT_KIND_GROUP, SUBJECT_KIND_USER,
};
use crate::crd::{Team, TeamRole, TeamRoleBinding};
use crate::errors::PropagationError;
use crate::labels::{
    FLEETRBAC_OWNED_BY_LABEL, FLEETRBAC_TEAM_ROLE_BINDING_LABEL, FLEETRBAC_TEAM_ROLE_LABEL,
    K8S_MANAGED_BY, K8S_PART_OF, MANAGED_BY_FLEETRBAC, PART_OF_FLEETRBAC,
};
use crate::remote::RbacObject;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Name of the shared `ClusterRole` derived from a `TeamRole`.
#[must_use]
pub fn shared_role_name(team_role: &str) -> String {
    format!("{RBAC_PREFIX}{team_role}")
}

/// Name of the binding object(s) derived from a `TeamRoleBinding`.
#[must_use]
pub fn binding_object_name(binding: &str) -> String {
    format!("{RBAC_PREFIX}{binding}")
}

/// The objects one binding wants on every target cluster.
#[derive(Clone, Debug, PartialEq)]
pub struct DesiredState {
    /// Name of the source `TeamRole`
    pub team_role: String,
    /// Shared `ClusterRole`
    pub role: RbacObject,
    /// One `ClusterRoleBinding`, or one `RoleBinding` per namespace
    pub bindings: Vec<RbacObject>,
}

fn role_labels(team_role: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (K8S_MANAGED_BY.to_string(), MANAGED_BY_FLEETRBAC.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_FLEETRBAC.to_string()),
        (FLEETRBAC_TEAM_ROLE_LABEL.to_string(), team_role.to_string()),
    ])
}

fn binding_labels(binding: &TeamRoleBinding) -> BTreeMap<String, String> {
    let mut labels = role_labels(&binding.spec.team_role_ref);
    labels.insert(
        FLEETRBAC_TEAM_ROLE_BINDING_LABEL.to_string(),
        binding.name_any(),
    );
    if let Some(owner) = binding.labels().get(FLEETRBAC_OWNED_BY_LABEL) {
        labels.insert(FLEETRBAC_OWNED_BY_LABEL.to_string(), owner.clone());
    }
    labels
}

/// Build the shared `ClusterRole`, copying rules and aggregation rule verbatim.
#[must_use]
pub fn build_shared_role(team_role: &TeamRole) -> ClusterRole {
    let name = team_role.name_any();
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(shared_role_name(&name)),
            labels: Some(role_labels(&name)),
            ..Default::default()
        },
        rules: Some(team_role.spec.rules.clone()),
        aggregation_rule: team_role.spec.aggregation_rule.clone(),
    }
}

/// One `User` subject per username, then exactly one `Group` subject for the team.
///
/// An empty group name is passed through unchanged; see [`validate_subjects`].
#[must_use]
pub fn build_subjects(team: &Team, usernames: &[String]) -> Vec<Subject> {
    usernames
        .iter()
        .map(|user| Subject {
            kind: SUBJECT_KIND_USER.to_string(),
            name: user.clone(),
            api_group: Some(RBAC_API_GROUP.to_string()),
            namespace: None,
        })
        .chain(std::iter::once(Subject {
            kind: SUBJECT_KIND_GROUP.to_string(),
            name: team.spec.mapped_idp_group.clone(),
            api_group: Some(RBAC_API_GROUP.to_string()),
            namespace: None,
        }))
        .collect()
}

/// Reject a binding that would grant the role to nobody.
///
/// # Errors
///
/// Returns [`PropagationError::NoSubjects`] when the team has no identity-provider
/// group and the binding lists no usernames.
pub fn validate_subjects(binding: &TeamRoleBinding, team: &Team) -> Result<(), PropagationError> {
    let has_group = !team.spec.mapped_idp_group.trim().is_empty();
    let has_user = binding.spec.usernames.iter().any(|u| !u.trim().is_empty());
    if has_group || has_user {
        Ok(())
    } else {
        Err(PropagationError::NoSubjects {
            team: team.name_any(),
        })
    }
}

/// Build every object the binding wants on a target cluster.
#[must_use]
pub fn build_desired(binding: &TeamRoleBinding, team_role: &TeamRole, team: &Team) -> DesiredState {
    let name = binding_object_name(&binding.name_any());
    let labels = binding_labels(binding);
    let subjects = build_subjects(team, &binding.spec.usernames);
    let role_ref = RoleRef {
        api_group: RBAC_API_GROUP.to_string(),
        kind: KIND_CLUSTER_ROLE.to_string(),
        name: shared_role_name(&team_role.name_any()),
    };

    let bindings = if binding.spec.is_namespace_scoped() {
        binding
            .spec
            .namespaces
            .iter()
            .map(|namespace| {
                RbacObject::RoleBinding(RoleBinding {
                    metadata: ObjectMeta {
                        name: Some(name.clone()),
                        namespace: Some(namespace.clone()),
                        labels: Some(labels.clone()),
                        ..Default::default()
                    },
                    role_ref: role_ref.clone(),
                    subjects: Some(subjects.clone()),
                })
            })
            .collect()
    } else {
        vec![RbacObject::ClusterRoleBinding(ClusterRoleBinding {
            metadata: ObjectMeta {
                name: Some(name),
                labels: Some(labels),
                ..Default::default()
            },
            role_ref,
            subjects: Some(subjects),
        })]
    };

    DesiredState {
        team_role: team_role.name_any(),
        role: RbacObject::ClusterRole(build_shared_role(team_role)),
        bindings,
    }
}

#[cfg(test)]
#[path = "desired_tests.rs"]
mod desired_tests;
