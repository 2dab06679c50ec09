// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `applier.rs`

#[cfg(test)]
mod tests {
    use crate::errors::PropagationError;
    use crate::reconcilers::applier::apply_to_cluster;
    use crate::reconcilers::desired::build_desired;
    use crate::remote::{RbacKind, RemoteClient};
    use crate::testing::{binding, team, team_role, FakeRemoteCluster};

    #[tokio::test]
    async fn test_applies_role_and_bindings() {
        let remote = FakeRemoteCluster::default();
        let trb = binding("devs", "viewer", "platform", &[], &["ns1", "ns2"]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        apply_to_cluster(&remote, "a", &desired, false).await.unwrap();

        assert_eq!(
            remote.names(RbacKind::ClusterRole),
            vec![(None, "fleetrbac:viewer".to_string())]
        );
        assert_eq!(remote.names(RbacKind::RoleBinding).len(), 2);
        assert_eq!(remote.writes(), 3);

        remote.reset_writes();
        apply_to_cluster(&remote, "a", &desired, false).await.unwrap();
        assert_eq!(remote.writes(), 0);
    }

    #[tokio::test]
    async fn test_role_failure_skips_bindings() {
        let remote = FakeRemoteCluster::default();
        remote.fail_kind(RbacKind::ClusterRole);
        let trb = binding("devs", "viewer", "platform", &[], &[]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        let err = apply_to_cluster(&remote, "a", &desired, false)
            .await
            .unwrap_err();

        assert!(matches!(err, PropagationError::RoleApply { .. }));
        assert!(remote.names(RbacKind::ClusterRoleBinding).is_empty());
    }

    #[tokio::test]
    async fn test_missing_namespace_without_creation() {
        let remote = FakeRemoteCluster::default();
        remote.remove_namespace("ns1");
        let trb = binding("devs", "viewer", "platform", &[], &["ns1", "ns2"]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        let err = apply_to_cluster(&remote, "a", &desired, false)
            .await
            .unwrap_err();

        assert!(matches!(err, PropagationError::BindingApply { .. }));
        assert_eq!(
            remote.names(RbacKind::RoleBinding),
            vec![(Some("ns2".to_string()), "fleetrbac:devs".to_string())]
        );
        assert!(!remote.has_namespace("ns1"));
    }

    #[tokio::test]
    async fn test_missing_namespace_is_created_then_pending() {
        let remote = FakeRemoteCluster::default();
        remote.remove_namespace("ns1");
        let trb = binding("devs", "viewer", "platform", &[], &["ns1"]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        let err = apply_to_cluster(&remote, "a", &desired, true)
            .await
            .unwrap_err();
        assert!(matches!(err, PropagationError::NamespacePending { .. }));
        assert!(remote.has_namespace("ns1"));

        apply_to_cluster(&remote, "a", &desired, true).await.unwrap();
        assert!(remote
            .get(RbacKind::RoleBinding, Some("ns1"), "fleetrbac:devs")
            .is_some());
    }

    #[tokio::test]
    async fn test_unreachable_cluster() {
        let remote = FakeRemoteCluster::default();
        remote.set_unreachable(true);
        let trb = binding("devs", "viewer", "platform", &[], &[]);
        let desired = build_desired(&trb, &team_role("viewer"), &team("platform", "idp"));

        let err = apply_to_cluster(&remote as &dyn RemoteClient, "a", &desired, false)
            .await
            .unwrap_err();

        assert_eq!(err.cluster(), Some("a"));
    }
}
