// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes Event recording for the `TeamRoleBinding` controller.
//!
//! Events are published on the hub `TeamRoleBinding` so that `kubectl describe` shows
//! which clusters were reconciled and which failed. Publishing is fire-and-forget:
//! a failed event is logged as a warning and never fails the reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Publishes Kubernetes Events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event on the given object.
    ///
    /// # Arguments
    ///
    /// * `resource_ref` - The object this event is about
    /// * `type_` - Normal or Warning
    /// * `reason` - Machine-readable reason, shared with status condition reasons
    /// * `action` - What the controller was doing
    /// * `note` - Optional human-readable message
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Production publisher wrapping `kube::runtime::events::Recorder`.
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// The controller name is reported as the Event's `reportingComponent`.
    #[must_use]
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, action, error = %e, "Failed to publish Kubernetes event");
        }
    }
}

/// Event reasons not covered by status condition reasons.
pub mod reasons {
    /// All tracked clusters were cleaned up and the finalizer removed
    pub const CLEANUP_COMPLETE: &str = "CleanupComplete";
    /// Objects were removed from a cluster the binding no longer targets
    pub const CLUSTER_PRUNED: &str = "ClusterPruned";
}

/// Event actions.
pub mod actions {
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
    /// Writing RBAC objects to a remote cluster
    pub const PROPAGATE: &str = "Propagate";
    /// Removing RBAC objects from a remote cluster
    pub const CLEANUP: &str = "Cleanup";
    /// Tearing down a deleted binding
    pub const DELETE: &str = "Delete";
}
