// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Test fixtures and in-memory fakes for the propagation engine.
//!
//! [`FakeInventory`] stands in for the hub, [`FakeFleet`] hands out one
//! [`FakeRemoteCluster`] per cluster name. The fake remote reuses
//! [`crate::remote::mutate::mutate`] so it classifies writes exactly like the
//! Kubernetes client does, and counts every write so idempotence can be asserted.

use crate::constants::{
    CONDITION_TYPE_CLUSTER_READY, CONDITION_TYPE_RBAC_READY, STATUS_FALSE, STATUS_TRUE,
};
use crate::crd::{
    Cluster, ClusterSelector, ClusterSpec, ClusterStatus, Condition, LabelSelector,
    PropagationStatus, Team, TeamRole, TeamRoleBinding, TeamRoleBindingSpec, TeamRoleBindingStatus,
    TeamRoleSpec, TeamSpec,
};
use crate::errors::RemoteError;
use crate::events::EventPublisher;
use crate::inventory::Inventory;
use crate::reconcilers::status::TeamRoleBindingStatusUpdater;
use crate::remote::mutate::{mutate, Mutation};
use crate::remote::{
    ClusterClientFactory, DeleteOutcome, OperationResult, RbacKind, RbacObject, RemoteClient,
};
use crate::selector::matches_selector;
use anyhow::{bail, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::api::rbac::v1::PolicyRule;
use kube::runtime::events::EventType;
use kube::ResourceExt;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Hub namespace used by every fixture.
pub const HUB_NAMESPACE: &str = "org";

fn label_map(labels: &[(&str, &str)]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// A `TeamRoleBinding` selecting clusters by labels (or nothing when `selector` is empty).
pub fn binding(
    name: &str,
    team_role: &str,
    team: &str,
    selector: &[(&str, &str)],
    namespaces: &[&str],
) -> TeamRoleBinding {
    let label_selector = if selector.is_empty() {
        None
    } else {
        Some(LabelSelector {
            match_labels: Some(label_map(selector)),
            match_expressions: None,
        })
    };

    let mut trb = TeamRoleBinding::new(
        name,
        TeamRoleBindingSpec {
            team_role_ref: team_role.to_string(),
            team_ref: team.to_string(),
            cluster_selector: ClusterSelector {
                cluster_name: None,
                label_selector,
            },
            namespaces: namespaces.iter().map(ToString::to_string).collect(),
            create_namespaces: false,
            usernames: vec![],
        },
    );
    trb.metadata.namespace = Some(HUB_NAMESPACE.to_string());
    trb.metadata.generation = Some(1);
    trb
}

/// A registered `Cluster` with a `Ready` condition.
pub fn cluster(name: &str, labels: &[(&str, &str)], ready: bool) -> Cluster {
    let mut c = Cluster::new(
        name,
        ClusterSpec {
            kubeconfig_secret_ref: None,
        },
    );
    c.metadata.namespace = Some(HUB_NAMESPACE.to_string());
    c.metadata.labels = Some(label_map(labels));
    c.status = Some(ClusterStatus {
        conditions: vec![Condition {
            r#type: CONDITION_TYPE_CLUSTER_READY.to_string(),
            status: (if ready { STATUS_TRUE } else { STATUS_FALSE }).to_string(),
            reason: None,
            message: None,
            last_transition_time: None,
        }],
    });
    c
}

pub fn team(name: &str, idp_group: &str) -> Team {
    let mut t = Team::new(
        name,
        TeamSpec {
            description: None,
            mapped_idp_group: idp_group.to_string(),
        },
    );
    t.metadata.namespace = Some(HUB_NAMESPACE.to_string());
    t
}

/// A `TeamRole` granting read access to pods.
pub fn team_role(name: &str) -> TeamRole {
    let mut r = TeamRole::new(
        name,
        TeamRoleSpec {
            rules: vec![PolicyRule {
                api_groups: Some(vec![String::new()]),
                resources: Some(vec!["pods".to_string()]),
                verbs: vec!["get".to_string(), "list".to_string()],
                ..Default::default()
            }],
            aggregation_rule: None,
        },
    );
    r.metadata.namespace = Some(HUB_NAMESPACE.to_string());
    r
}

/// The `RBACReady` condition an updater currently holds for a cluster.
pub fn cluster_condition<'a>(
    updater: &'a TeamRoleBindingStatusUpdater,
    cluster: &str,
) -> Option<&'a Condition> {
    updater
        .status()
        .propagation_status
        .iter()
        .find(|e| e.cluster_name == cluster)
        .map(|e| &e.condition)
}

/// A status tracking the given clusters as ready.
pub fn tracked(clusters: &[&str]) -> TeamRoleBindingStatus {
    TeamRoleBindingStatus {
        conditions: vec![],
        propagation_status: clusters
            .iter()
            .map(|c| PropagationStatus {
                cluster_name: (*c).to_string(),
                condition: Condition {
                    r#type: CONDITION_TYPE_RBAC_READY.to_string(),
                    status: STATUS_TRUE.to_string(),
                    reason: None,
                    message: None,
                    last_transition_time: Some("2025-01-01T00:00:00Z".to_string()),
                },
            })
            .collect(),
        observed_generation: Some(1),
    }
}

// ============================================================================
// Hub
// ============================================================================

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory hub.
#[derive(Default)]
pub struct FakeInventory {
    team_roles: Mutex<BTreeMap<Key, TeamRole>>,
    teams: Mutex<BTreeMap<Key, Team>>,
    clusters: Mutex<BTreeMap<Key, Cluster>>,
    unavailable: AtomicBool,
}

impl FakeInventory {
    pub fn add_team_role(&self, role: TeamRole) {
        let k = key(&role.namespace().unwrap_or_default(), &role.name_any());
        self.team_roles.lock().unwrap().insert(k, role);
    }

    pub fn add_team(&self, team: Team) {
        let k = key(&team.namespace().unwrap_or_default(), &team.name_any());
        self.teams.lock().unwrap().insert(k, team);
    }

    pub fn remove_team(&self, name: &str) {
        self.teams.lock().unwrap().remove(&key(HUB_NAMESPACE, name));
    }

    pub fn add_cluster(&self, cluster: Cluster) {
        let k = key(&cluster.namespace().unwrap_or_default(), &cluster.name_any());
        self.clusters.lock().unwrap().insert(k, cluster);
    }

    pub fn remove_cluster(&self, name: &str) {
        self.clusters.lock().unwrap().remove(&key(HUB_NAMESPACE, name));
    }

    /// Flip a cluster's readiness, keeping its labels.
    pub fn set_ready(&self, name: &str, ready: bool) {
        let mut clusters = self.clusters.lock().unwrap();
        if let Some(c) = clusters.get_mut(&key(HUB_NAMESPACE, name)) {
            let labels = c.labels().clone();
            let pairs: Vec<(&str, &str)> =
                labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            *c = cluster(name, &pairs, ready);
        }
    }

    /// Make every lookup fail like an unreachable API server.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl Inventory for FakeInventory {
    async fn get_team_role(&self, namespace: &str, name: &str) -> Result<Option<TeamRole>> {
        self.check()?;
        Ok(self.team_roles.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn get_team(&self, namespace: &str, name: &str) -> Result<Option<Team>> {
        self.check()?;
        Ok(self.teams.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<Cluster>> {
        self.check()?;
        Ok(self.clusters.lock().unwrap().get(&key(namespace, name)).cloned())
    }

    async fn list_clusters(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<Cluster>> {
        self.check()?;
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), c)| ns == namespace && matches_selector(selector, c.labels()))
            .map(|(_, c)| c.clone())
            .collect())
    }
}

// ============================================================================
// Remote clusters
// ============================================================================

type ObjectKey = (RbacKind, Option<String>, String);

fn object_key(object: &RbacObject) -> ObjectKey {
    (object.kind(), object.namespace(), object.name())
}

/// In-memory remote cluster.
#[derive(Default)]
pub struct FakeRemoteCluster {
    objects: Mutex<BTreeMap<ObjectKey, RbacObject>>,
    missing_namespaces: Mutex<BTreeSet<String>>,
    failing_kinds: Mutex<HashSet<RbacKind>>,
    unreachable: AtomicBool,
    writes: AtomicUsize,
}

impl FakeRemoteCluster {
    /// Number of mutating calls that changed something.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_writes(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Reject every write of this kind with HTTP 403.
    pub fn fail_kind(&self, kind: RbacKind) {
        self.failing_kinds.lock().unwrap().insert(kind);
    }

    pub fn remove_namespace(&self, namespace: &str) {
        self.missing_namespaces
            .lock()
            .unwrap()
            .insert(namespace.to_string());
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        !self.missing_namespaces.lock().unwrap().contains(namespace)
    }

    /// Place an object directly, bypassing write accounting.
    pub fn insert(&self, object: RbacObject) {
        self.objects
            .lock()
            .unwrap()
            .insert(object_key(&object), object);
    }

    pub fn get(&self, kind: RbacKind, namespace: Option<&str>, name: &str) -> Option<RbacObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(kind, namespace.map(ToString::to_string), name.to_string()))
            .cloned()
    }

    /// `(namespace, name)` of every object of a kind.
    pub fn names(&self, kind: RbacKind) -> Vec<(Option<String>, String)> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, ns, name)| (ns.clone(), name.clone()))
            .collect()
    }

    fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unreachable {
                reason: "dial tcp: i/o timeout".to_string(),
            });
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn matches_query(object: &RbacObject, query: &str) -> bool {
    query
        .split(',')
        .filter(|part| !part.is_empty())
        .all(|part| match part.split_once('=') {
            Some((k, v)) => object.label(k) == Some(v),
            None => object.labels().contains_key(part),
        })
}

#[async_trait]
impl RemoteClient for FakeRemoteCluster {
    async fn create_or_update(&self, desired: &RbacObject) -> Result<OperationResult, RemoteError> {
        self.check_reachable()?;
        if self.failing_kinds.lock().unwrap().contains(&desired.kind()) {
            return Err(RemoteError::Api {
                code: 403,
                message: "forbidden".to_string(),
            });
        }
        if let Some(ns) = desired.namespace() {
            if !self.has_namespace(&ns) {
                return Err(RemoteError::NamespaceNotFound { namespace: ns });
            }
        }

        let k = object_key(desired);
        let mut objects = self.objects.lock().unwrap();
        let result = match objects.get(&k) {
            None => {
                objects.insert(k, desired.clone());
                OperationResult::Created
            }
            Some(existing) => match mutate(existing, desired) {
                Mutation::Unchanged => OperationResult::None,
                Mutation::Update(merged) => {
                    objects.insert(k, merged);
                    OperationResult::Updated
                }
                Mutation::Recreate => {
                    objects.insert(k, desired.clone());
                    OperationResult::Updated
                }
            },
        };
        drop(objects);

        if result != OperationResult::None {
            self.record_write();
        }
        Ok(result)
    }

    async fn delete(
        &self,
        kind: RbacKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<DeleteOutcome, RemoteError> {
        self.check_reachable()?;
        let removed = self
            .objects
            .lock()
            .unwrap()
            .remove(&(kind, namespace.map(ToString::to_string), name.to_string()));
        if removed.is_some() {
            self.record_write();
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::AlreadyGone)
        }
    }

    async fn list(
        &self,
        kind: RbacKind,
        label_selector: &str,
    ) -> Result<Vec<RbacObject>, RemoteError> {
        self.check_reachable()?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.kind() == kind && matches_query(o, label_selector))
            .cloned()
            .collect())
    }

    async fn ensure_namespace(&self, name: &str) -> Result<OperationResult, RemoteError> {
        self.check_reachable()?;
        if self.missing_namespaces.lock().unwrap().remove(name) {
            self.record_write();
            Ok(OperationResult::Created)
        } else {
            Ok(OperationResult::None)
        }
    }
}

/// Hands out a [`FakeRemoteCluster`] per cluster name, created on first use.
#[derive(Default)]
pub struct FakeFleet {
    remotes: Mutex<BTreeMap<String, Arc<FakeRemoteCluster>>>,
    broken_credentials: Mutex<BTreeSet<String>>,
}

impl FakeFleet {
    pub fn remote(&self, cluster: &str) -> Arc<FakeRemoteCluster> {
        self.remotes
            .lock()
            .unwrap()
            .entry(cluster.to_string())
            .or_default()
            .clone()
    }

    /// Make `client_for` fail for a cluster.
    pub fn break_credentials(&self, cluster: &str) {
        self.broken_credentials
            .lock()
            .unwrap()
            .insert(cluster.to_string());
    }

    /// Total writes across every remote.
    pub fn writes(&self) -> usize {
        self.remotes.lock().unwrap().values().map(|r| r.writes()).sum()
    }

    pub fn reset_writes(&self) {
        for remote in self.remotes.lock().unwrap().values() {
            remote.reset_writes();
        }
    }
}

#[async_trait]
impl ClusterClientFactory for FakeFleet {
    async fn client_for(&self, cluster: &Cluster) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        let name = cluster.name_any();
        if self.broken_credentials.lock().unwrap().contains(&name) {
            return Err(RemoteError::Credentials {
                reason: format!("secret {name} has no kubeconfig"),
            });
        }
        let client: Arc<dyn RemoteClient> = self.remote(&name);
        Ok(client)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Records `(type, reason)` of every published event.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingEventPublisher {
    pub fn reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, reason)| reason.clone())
            .collect()
    }

    pub fn warnings(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == "Warning")
            .count()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((format!("{type_:?}"), reason.to_string()));
    }
}
