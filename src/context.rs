// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `TeamRoleBinding` controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - the hub Kubernetes client, used for status and finalizer patches
//! - the [`Inventory`] of hub resources a binding depends on
//! - the [`ClusterClientFactory`] handing out remote cluster clients
//! - the [`EventPublisher`] for Kubernetes Events
//! - the operator configuration
//!
//! Every collaborator sits behind a trait object so the propagation engine can be
//! exercised against in-memory fakes.

use crate::config::OperatorConfig;
use crate::events::{EventPublisher, KubeEventPublisher};
use crate::inventory::{Inventory, KubeInventory};
use crate::remote::factory::KubeconfigSecretClientFactory;
use crate::remote::ClusterClientFactory;
use kube::Client;
use std::sync::Arc;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Hub Kubernetes client
    pub client: Client,

    /// Hub lookups of `TeamRole`, `Team` and `Cluster`
    pub inventory: Arc<dyn Inventory>,

    /// Remote cluster clients
    pub clients: Arc<dyn ClusterClientFactory>,

    /// Kubernetes Event publisher
    pub events: Arc<dyn EventPublisher>,

    /// Operator settings
    pub config: OperatorConfig,
}

impl Context {
    /// Wire the production collaborators around a hub client.
    #[must_use]
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self {
            inventory: Arc::new(KubeInventory::new(client.clone())),
            clients: Arc::new(KubeconfigSecretClientFactory::new(client.clone())),
            events: Arc::new(KubeEventPublisher::new(client.clone(), &config.controller_name)),
            client,
            config,
        }
    }
}
