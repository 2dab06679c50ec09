// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # fleetrbac - Multi-cluster RBAC propagation for Kubernetes
//!
//! fleetrbac is a Kubernetes operator that grants team roles across a fleet of
//! clusters. A hub cluster holds the declarative intent as Custom Resources; the
//! operator converges every selected remote cluster towards it.
//!
//! ## Overview
//!
//! A [`crd::TeamRoleBinding`] says "members of this [`crd::Team`] get this
//! [`crd::TeamRole`] on every [`crd::Cluster`] matching this selector". For each
//! selected cluster the operator:
//!
//! - materializes the team role as one shared `ClusterRole`
//! - binds it with a `ClusterRoleBinding`, or a `RoleBinding` per listed namespace
//! - records an independent per-cluster status entry
//!
//! Clusters that stop matching, namespaces removed from the list and deleted
//! bindings are cleaned up, tolerating clusters that are unreachable or gone.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - propagation engine and the `TeamRoleBinding` reconciler
//! - [`remote`] - remote cluster access
//! - [`inventory`] - hub lookups
//! - [`selector`] - label selector evaluation and watch mappers
//! - [`context`] - shared controller context
//!
//! ## Example
//!
//! ```rust,no_run
//! use fleetrbac::crd::{ClusterSelector, TeamRoleBindingSpec};
//!
//! let spec = TeamRoleBindingSpec {
//!     team_role_ref: "viewer".to_string(),
//!     team_ref: "platform".to_string(),
//!     cluster_selector: ClusterSelector {
//!         cluster_name: Some("prod-eu-1".to_string()),
//!         label_selector: None,
//!     },
//!     namespaces: vec!["payments".to_string()],
//!     create_namespaces: true,
//!     usernames: vec![],
//! };
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod events;
pub mod inventory;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod remote;
pub mod selector;
pub mod status_reasons;

#[cfg(test)]
pub mod testing;
