// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator command-line and environment configuration.

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_CONTROLLER_NAME, DEFAULT_METRICS_ADDR,
    DELETION_REQUEUE_SECS, ERROR_REQUEUE_DURATION_SECS, REQUEUE_WHEN_DEGRADED_SECS,
    REQUEUE_WHEN_READY_SECS,
};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime settings of the fleetrbac controller.
///
/// Every flag can also be set through its `FLEETRBAC_*` environment variable.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "fleetrbac", version, about, long_about = None)]
pub struct OperatorConfig {
    /// Address the metrics and health server listens on
    #[arg(long, env = "FLEETRBAC_METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,

    /// Maximum number of TeamRoleBindings reconciled in parallel
    #[arg(long, env = "FLEETRBAC_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: u16,

    /// Restrict the controller to one hub namespace (all namespaces when unset)
    #[arg(long, env = "FLEETRBAC_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Requeue interval in seconds once every cluster is ready
    #[arg(long, env = "FLEETRBAC_REQUEUE_READY_SECS", default_value_t = REQUEUE_WHEN_READY_SECS)]
    pub requeue_ready_secs: u64,

    /// Requeue interval in seconds while some cluster is failing
    #[arg(
        long,
        env = "FLEETRBAC_REQUEUE_DEGRADED_SECS",
        default_value_t = REQUEUE_WHEN_DEGRADED_SECS
    )]
    pub requeue_degraded_secs: u64,

    /// Requeue interval in seconds after a reconciliation error
    #[arg(
        long,
        env = "FLEETRBAC_REQUEUE_ERROR_SECS",
        default_value_t = ERROR_REQUEUE_DURATION_SECS
    )]
    pub requeue_error_secs: u64,

    /// Requeue interval in seconds while deletion waits for unreachable clusters
    #[arg(long, env = "FLEETRBAC_REQUEUE_DELETION_SECS", default_value_t = DELETION_REQUEUE_SECS)]
    pub requeue_deletion_secs: u64,

    /// Name reported as the Events' reporting component
    #[arg(long, env = "FLEETRBAC_CONTROLLER_NAME", default_value = DEFAULT_CONTROLLER_NAME)]
    pub controller_name: String,
}

impl OperatorConfig {
    #[must_use]
    pub fn requeue_ready(&self) -> Duration {
        Duration::from_secs(self.requeue_ready_secs)
    }

    #[must_use]
    pub fn requeue_degraded(&self) -> Duration {
        Duration::from_secs(self.requeue_degraded_secs)
    }

    #[must_use]
    pub fn requeue_error(&self) -> Duration {
        Duration::from_secs(self.requeue_error_secs)
    }

    #[must_use]
    pub fn requeue_deletion(&self) -> Duration {
        Duration::from_secs(self.requeue_deletion_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            concurrency: DEFAULT_CONCURRENCY,
            watch_namespace: None,
            requeue_ready_secs: REQUEUE_WHEN_READY_SECS,
            requeue_degraded_secs: REQUEUE_WHEN_DEGRADED_SECS,
            requeue_error_secs: ERROR_REQUEUE_DURATION_SECS,
            requeue_deletion_secs: DELETION_REQUEUE_SECS,
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
