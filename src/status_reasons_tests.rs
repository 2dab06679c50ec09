// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status_reasons` module

#[cfg(test)]
mod tests {
    use crate::status_reasons::*;

    #[test]
    fn test_per_cluster_reason_constants() {
        assert_eq!(REASON_RBAC_RECONCILED, "RBACReconciled");
        assert_eq!(REASON_CLUSTER_CONNECTION_FAILED, "ClusterConnectionFailed");
        assert_eq!(REASON_ROLE_APPLY_FAILED, "RoleApplyFailed");
        assert_eq!(REASON_BINDING_APPLY_FAILED, "BindingApplyFailed");
        assert_eq!(REASON_NAMESPACE_CREATION_PENDING, "NamespaceCreationPending");
    }

    #[test]
    fn test_aggregate_reason_constants() {
        assert_eq!(REASON_ALL_CLUSTERS_READY, "AllClustersReady");
        assert_eq!(REASON_PROPAGATION_FAILED, "PropagationFailed");
        assert_eq!(REASON_EMPTY_CLUSTER_LIST, "EmptyClusterList");
        assert_eq!(REASON_TEAM_NOT_FOUND, "TeamNotFound");
        assert_eq!(REASON_TEAM_ROLE_NOT_FOUND, "TeamRoleNotFound");
    }

    #[test]
    fn test_reasons_are_pascal_case_without_spaces() {
        let reasons = [
            REASON_RBAC_RECONCILED,
            REASON_CLUSTER_CONNECTION_FAILED,
            REASON_ROLE_APPLY_FAILED,
            REASON_BINDING_APPLY_FAILED,
            REASON_NAMESPACE_CREATION_PENDING,
            REASON_CLEANUP_FAILED,
            REASON_ALL_CLUSTERS_READY,
            REASON_PROPAGATION_FAILED,
            REASON_EMPTY_CLUSTER_LIST,
            REASON_TEAM_NOT_FOUND,
            REASON_TEAM_ROLE_NOT_FOUND,
            REASON_INVALID_CLUSTER_SELECTOR,
            REASON_NO_SUBJECTS,
            REASON_HUB_UNAVAILABLE,
            REASON_DELETION_PENDING,
        ];

        for reason in reasons {
            assert!(!reason.contains(' '), "{reason} contains a space");
            assert!(
                reason.chars().next().is_some_and(char::is_uppercase),
                "{reason} must start with an uppercase letter"
            );
        }
    }

    #[test]
    fn test_reason_description_known_and_unknown() {
        assert_eq!(
            reason_description(REASON_CLUSTER_CONNECTION_FAILED),
            "cluster connection failed"
        );
        assert_eq!(reason_description(REASON_EMPTY_CLUSTER_LIST), "no cluster selected");
        assert_eq!(reason_description("SomethingElse"), "unknown");
    }

    #[test]
    fn test_aggregate_messages_are_generic() {
        // Aggregate messages never name a specific cluster
        assert!(!MESSAGE_ALL_CLUSTERS_READY.contains("cluster-"));
        assert!(!MESSAGE_PROPAGATION_FAILED.contains("cluster-"));
    }
}
