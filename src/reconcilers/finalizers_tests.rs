// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::labels::FINALIZER_TEAM_ROLE_BINDING;
    use crate::reconcilers::finalizers::{
        finalizers_with, finalizers_without, has_finalizer, is_being_deleted,
    };
    use crate::testing::binding;

    const OTHER_FINALIZER: &str = "example.com/keep";

    #[test]
    fn test_finalizer_added_once() {
        let mut trb = binding("devs", "viewer", "platform", &[], &[]);
        trb.metadata.finalizers = Some(vec![OTHER_FINALIZER.to_string()]);

        let added = finalizers_with(&trb, FINALIZER_TEAM_ROLE_BINDING).unwrap();
        assert_eq!(
            added,
            vec![OTHER_FINALIZER.to_string(), FINALIZER_TEAM_ROLE_BINDING.to_string()]
        );

        trb.metadata.finalizers = Some(added);
        assert!(has_finalizer(&trb, FINALIZER_TEAM_ROLE_BINDING));
        assert!(finalizers_with(&trb, FINALIZER_TEAM_ROLE_BINDING).is_none());
    }

    #[test]
    fn test_finalizer_removal_keeps_others() {
        let mut trb = binding("devs", "viewer", "platform", &[], &[]);
        trb.metadata.finalizers = Some(vec![
            FINALIZER_TEAM_ROLE_BINDING.to_string(),
            OTHER_FINALIZER.to_string(),
        ]);

        let remaining = finalizers_without(&trb, FINALIZER_TEAM_ROLE_BINDING).unwrap();
        assert_eq!(remaining, vec![OTHER_FINALIZER.to_string()]);

        trb.metadata.finalizers = Some(remaining);
        assert!(finalizers_without(&trb, FINALIZER_TEAM_ROLE_BINDING).is_none());
    }

    #[test]
    fn test_is_being_deleted() {
        let mut trb = binding("devs", "viewer", "platform", &[], &[]);
        assert!(!is_being_deleted(&trb));

        trb.metadata.deletion_timestamp =
            serde_json::from_value(serde_json::json!("2025-01-01T00:00:00Z")).unwrap();
        assert!(is_being_deleted(&trb));
    }
}
