// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `desired.rs`

#[cfg(test)]
mod tests {
    use crate::errors::PropagationError;
    use crate::reconcilers::desired::{
        build_desired, build_shared_role, build_subjects, shared_role_name, validate_subjects,
    };
    use crate::remote::{RbacKind, RbacObject};
    use crate::testing::{binding, team, team_role};
    use k8s_openapi::api::rbac::v1::AggregationRule;

    #[test]
    fn test_names_use_prefix() {
        assert_eq!(shared_role_name("viewer"), "fleetrbac:viewer");
    }

    #[test]
    fn test_shared_role_copies_rules_and_labels() {
        let mut source = team_role("viewer");
        source.spec.aggregation_rule = Some(AggregationRule {
            cluster_role_selectors: Some(vec![]),
        });

        let role = build_shared_role(&source);

        assert_eq!(role.metadata.name.as_deref(), Some("fleetrbac:viewer"));
        assert_eq!(role.rules.as_ref(), Some(&source.spec.rules));
        assert_eq!(role.aggregation_rule, source.spec.aggregation_rule);
        let labels = role.metadata.labels.unwrap();
        assert_eq!(
            labels.get("fleetrbac.firestoned.io/team-role").map(String::as_str),
            Some("viewer")
        );
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("fleetrbac")
        );
    }

    #[test]
    fn test_subjects_users_then_one_group() {
        let subjects = build_subjects(
            &team("platform", "idp-platform"),
            &["alice".to_string(), "bob".to_string()],
        );

        let kinds: Vec<_> = subjects.iter().map(|s| (s.kind.as_str(), s.name.as_str())).collect();
        assert_eq!(
            kinds,
            vec![("User", "alice"), ("User", "bob"), ("Group", "idp-platform")]
        );
    }

    #[test]
    fn test_subjects_keep_empty_group() {
        let subjects = build_subjects(&team("platform", ""), &["alice".to_string()]);

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[1].kind, "Group");
        assert_eq!(subjects[1].name, "");
    }

    #[test]
    fn test_validate_subjects() {
        let trb = binding("devs", "viewer", "platform", &[], &[]);
        assert!(validate_subjects(&trb, &team("platform", "idp")).is_ok());

        let err = validate_subjects(&trb, &team("platform", "")).unwrap_err();
        assert!(matches!(err, PropagationError::NoSubjects { .. }));

        let mut with_user = trb.clone();
        with_user.spec.usernames = vec!["alice".to_string()];
        assert!(validate_subjects(&with_user, &team("platform", "")).is_ok());
    }

    #[test]
    fn test_cluster_scoped_binding() {
        let trb = binding("devs", "viewer", "platform", &[("env", "prod")], &[]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        assert_eq!(desired.bindings.len(), 1);
        let RbacObject::ClusterRoleBinding(crb) = &desired.bindings[0] else {
            panic!("expected a ClusterRoleBinding");
        };
        assert_eq!(crb.metadata.name.as_deref(), Some("fleetrbac:devs"));
        assert!(crb.metadata.namespace.is_none());
        assert_eq!(crb.role_ref.kind, "ClusterRole");
        assert_eq!(crb.role_ref.name, "fleetrbac:viewer");
        assert_eq!(
            desired.bindings[0].label("fleetrbac.firestoned.io/team-role-binding"),
            Some("devs")
        );
    }

    #[test]
    fn test_namespace_scoped_bindings() {
        let trb = binding("devs", "viewer", "platform", &[], &["ns1", "ns2"]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        let placed: Vec<_> = desired
            .bindings
            .iter()
            .map(|b| (b.kind(), b.namespace(), b.name()))
            .collect();
        assert_eq!(
            placed,
            vec![
                (
                    RbacKind::RoleBinding,
                    Some("ns1".to_string()),
                    "fleetrbac:devs".to_string()
                ),
                (
                    RbacKind::RoleBinding,
                    Some("ns2".to_string()),
                    "fleetrbac:devs".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_owned_by_label_is_copied() {
        let mut trb = binding("devs", "viewer", "platform", &[], &[]);
        trb.metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(
                "fleetrbac.firestoned.io/owned-by".to_string(),
                "team-platform".to_string(),
            );

        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        assert_eq!(
            desired.bindings[0].label("fleetrbac.firestoned.io/owned-by"),
            Some("team-platform")
        );
        assert_eq!(desired.role.label("fleetrbac.firestoned.io/owned-by"), None);
    }
}
