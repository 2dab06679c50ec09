// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd.rs`

#[cfg(test)]
mod tests {
    use crate::constants::{
        API_GROUP, API_GROUP_VERSION, API_VERSION, KIND_CLUSTER, KIND_TEAM, KIND_TEAM_ROLE,
        KIND_TEAM_ROLE_BINDING,
    };
    use crate::crd::{Cluster, LabelSelector, Team, TeamRole, TeamRoleBinding};
    use crate::testing::{binding, cluster, tracked};
    use kube::core::CustomResourceExt;
    use kube::Resource;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_crd_names() {
        assert_eq!(TeamRoleBinding::kind(&()), KIND_TEAM_ROLE_BINDING);
        assert_eq!(TeamRoleBinding::group(&()), API_GROUP);
        assert_eq!(TeamRoleBinding::version(&()), API_VERSION);
        assert_eq!(TeamRoleBinding::api_version(&()), API_GROUP_VERSION);
        assert_eq!(TeamRole::kind(&()), KIND_TEAM_ROLE);
        assert_eq!(TeamRole::plural(&()), "teamroles");
        assert_eq!(Team::kind(&()), KIND_TEAM);
        assert_eq!(Cluster::kind(&()), KIND_CLUSTER);
    }

    #[test]
    fn test_crds_are_namespaced() {
        for crd in [
            TeamRoleBinding::crd(),
            TeamRole::crd(),
            Team::crd(),
            Cluster::crd(),
        ] {
            assert_eq!(crd.spec.scope, "Namespaced");
        }
    }

    #[test]
    fn test_binding_deserializes_camel_case_with_defaults() {
        let trb: TeamRoleBinding = serde_json::from_value(json!({
            "apiVersion": "fleetrbac.firestoned.io/v1alpha1",
            "kind": "TeamRoleBinding",
            "metadata": { "name": "devs", "namespace": "org" },
            "spec": {
                "teamRoleRef": "viewer",
                "teamRef": "platform",
                "clusterSelector": { "labelSelector": { "matchLabels": { "env": "prod" } } }
            }
        }))
        .unwrap();

        assert_eq!(trb.spec.team_role_ref, "viewer");
        assert!(trb.spec.namespaces.is_empty());
        assert!(!trb.spec.create_namespaces);
        assert!(trb.spec.usernames.is_empty());
        assert!(!trb.spec.is_namespace_scoped());
        assert!(trb.spec.cluster_selector.cluster_name.is_none());
    }

    #[test]
    fn test_namespace_scope() {
        assert!(binding("devs", "viewer", "platform", &[], &["ns1"])
            .spec
            .is_namespace_scoped());
    }

    #[test]
    fn test_tracked_clusters() {
        let mut trb = binding("devs", "viewer", "platform", &[], &[]);
        assert!(trb.tracked_clusters().is_empty());

        trb.status = Some(tracked(&["a", "b"]));
        assert_eq!(trb.tracked_clusters(), vec!["a", "b"]);
    }

    #[test]
    fn test_cluster_readiness() {
        assert!(cluster("a", &[], true).is_ready());
        assert!(!cluster("a", &[], false).is_ready());

        let mut unknown = cluster("a", &[], true);
        unknown.status = None;
        assert!(!unknown.is_ready());
    }

    #[test]
    fn test_label_selector_is_empty() {
        assert!(LabelSelector::default().is_empty());
        assert!(LabelSelector {
            match_labels: Some(BTreeMap::new()),
            match_expressions: Some(vec![]),
        }
        .is_empty());
        assert!(!LabelSelector {
            match_labels: Some(BTreeMap::from([("env".to_string(), "prod".to_string())])),
            match_expressions: None,
        }
        .is_empty());
    }
}
