// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for `TeamRoleBinding` resources.
//!
//! # Reconciliation Architecture
//!
//! fleetrbac follows the standard Kubernetes controller pattern, with the twist that
//! the objects it converges live on other clusters:
//!
//! 1. **Watch** - `TeamRoleBinding` changes, plus changes to the `TeamRole`, `Team`
//!    and `Cluster` objects a binding depends on
//! 2. **Resolve** - evaluate the cluster selector against the registered clusters
//! 3. **Clean up** - remove objects from clusters and namespaces no longer targeted
//! 4. **Apply** - create or update the shared `ClusterRole` and the binding objects
//! 5. **Status** - one `RBACReady` entry per cluster, reduced to `Ready`
//!
//! # Modules
//!
//! - [`targets`] - target resolution
//! - [`desired`] - desired remote objects
//! - [`applier`] - per-cluster apply
//! - [`cleanup`] - stale object and stale cluster removal
//! - [`status`] - in-memory status collection and the single status patch
//! - [`finalizers`] - finalizer helpers
//! - [`teamrolebinding`] - the orchestrator
//!
//! # Example: Using the Reconciler
//!
//! ```rust,no_run
//! use fleetrbac::config::OperatorConfig;
//! use fleetrbac::context::Context;
//! use fleetrbac::crd::TeamRoleBinding;
//! use fleetrbac::reconcilers::reconcile_teamrolebinding;
//! use std::sync::Arc;
//!
//! async fn reconcile(client: kube::Client, binding: TeamRoleBinding) -> anyhow::Result<()> {
//!     let ctx = Arc::new(Context::new(client, OperatorConfig::default()));
//!     reconcile_teamrolebinding(ctx, binding).await?;
//!     Ok(())
//! }
//! ```

pub mod applier;
pub mod cleanup;
pub mod desired;
pub mod finalizers;
pub mod status;
pub mod targets;
pub mod teamrolebinding;

pub use teamrolebinding::{reconcile_teamrolebinding, ReconcileResult};
