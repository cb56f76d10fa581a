//! PerconaXtraDBBackup reconciler
//!
//! Turns a backup request into a backup job:
//! - Cluster lookup
//! - Storage resolution and backup node selection
//! - Volume provisioning
//! - Job submission
//! - Status updates

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{debug, info};

use crate::adapters::{
    build_job, job_name, owner_reference, resolve_storage, with_owner, StorageTarget,
};
use crate::config::ReconcileSettings;
use crate::crd::PerconaXtraDBCluster;
use crate::error::{Error, Result};
use crate::retry::Sleeper;
use crate::store::{BackupStore, CreateOutcome};

use super::status::sync_status;
use super::volume::ensure_volume;

/// Find a cluster by exact name in a namespace
///
/// The error lists every cluster name seen, to help spot typos.
pub async fn find_cluster(
    store: &dyn BackupStore,
    namespace: &str,
    name: &str,
) -> Result<PerconaXtraDBCluster> {
    let clusters = store.list_clusters(namespace).await?;

    let mut available = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let cluster_name = cluster.name_any();
        if cluster_name == name {
            return Ok(cluster);
        }
        available.push(cluster_name);
    }

    Err(Error::ClusterNotFound {
        name: name.to_string(),
        available,
    })
}

fn is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// StatefulSet ordinal of a pod name (`<cluster>-pxc-<n>`)
fn ordinal(pod_name: &str) -> Option<u32> {
    pod_name.rsplit('-').next()?.parse().ok()
}

/// DNS name of the pod to take the backup from
///
/// Picks the ready pod with the highest ordinal, keeping the backup load away
/// from the first pod, which usually takes the writes.
pub fn backup_node(pods: &[Pod], cluster_name: &str) -> Option<String> {
    pods.iter()
        .filter(|pod| is_ready(pod))
        .map(|pod| pod.name_any())
        .max_by_key(|name| (ordinal(name), name.clone()))
        .map(|name| format!("{}.{}-pxc", name, cluster_name))
}

/// Select the cluster pod the backup job streams from
pub async fn select_node(
    store: &dyn BackupStore,
    namespace: &str,
    cluster_name: &str,
) -> Result<String> {
    let pods = store.list_cluster_pods(namespace, cluster_name).await?;
    let node = backup_node(&pods, cluster_name)
        .ok_or_else(|| Error::NoBackupNode(cluster_name.to_string()))?;

    debug!(namespace = %namespace, cluster = %cluster_name, node = %node, "Selected backup node");
    Ok(node)
}

/// Create the backup job; an existing job of the same name is kept as is
pub async fn submit_job(
    store: &dyn BackupStore,
    namespace: &str,
    job: &Job,
) -> Result<CreateOutcome> {
    let outcome = store.create_job(namespace, job).await?;
    match outcome {
        CreateOutcome::Created => info!(
            namespace = %namespace,
            name = job.metadata.name.as_deref().unwrap_or_default(),
            "Created a new backup job"
        ),
        CreateOutcome::AlreadyExists => debug!(
            namespace = %namespace,
            name = job.metadata.name.as_deref().unwrap_or_default(),
            "Backup job already exists"
        ),
    }
    Ok(outcome)
}

/// Reconcile a single PerconaXtraDBBackup
///
/// Steps run strictly in order and stop at the first error. Returns
/// [`Action::await_change`] when the backup no longer exists, otherwise a
/// requeue after `settings.requeue_after`.
pub async fn reconcile(
    store: &dyn BackupStore,
    sleeper: &dyn Sleeper,
    settings: &ReconcileSettings,
    namespace: &str,
    name: &str,
) -> Result<Action> {
    let Some(backup) = store.get_backup(namespace, name).await? else {
        debug!(namespace = %namespace, name = %name, "Backup no longer exists");
        return Ok(Action::await_change());
    };

    let cluster = find_cluster(store, namespace, &backup.spec.target_cluster).await?;
    let backup_spec = cluster
        .backup_spec()
        .ok_or_else(|| Error::BackupNotConfigured(cluster.name_any()))?;

    let storage = resolve_storage(
        backup_spec,
        &backup.spec.storage_profile,
        &backup.spec.target_cluster,
        backup.metadata.creation_timestamp.as_ref().map(|t| t.0),
        &settings.volume_name,
    )?;

    let node = select_node(store, namespace, &backup.spec.target_cluster).await?;

    if let StorageTarget::Volume { name: volume, claim } = &storage.target {
        ensure_volume(store, sleeper, &settings.volume_poll, &backup, volume, claim).await?;
    }

    let owner = owner_reference(&backup)?;
    let job = with_owner(build_job(&backup, backup_spec, &storage, &node)?, &owner);
    submit_job(store, namespace, &job).await?;

    sync_status(store, &backup, &job_name(name), &storage).await?;

    Ok(Action::requeue(settings.requeue_after))
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    fn pod(name: &str, ready: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_backup_node_prefers_highest_ordinal() {
        let pods = vec![
            pod("cluster1-pxc-0", "True"),
            pod("cluster1-pxc-10", "True"),
            pod("cluster1-pxc-2", "True"),
        ];

        assert_eq!(
            backup_node(&pods, "cluster1").as_deref(),
            Some("cluster1-pxc-10.cluster1-pxc")
        );
    }

    #[test]
    fn test_backup_node_skips_unready_pods() {
        let pods = vec![
            pod("cluster1-pxc-0", "True"),
            pod("cluster1-pxc-1", "True"),
            pod("cluster1-pxc-2", "False"),
            Pod {
                metadata: ObjectMeta {
                    name: Some("cluster1-pxc-3".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            },
        ];

        assert_eq!(
            backup_node(&pods, "cluster1").as_deref(),
            Some("cluster1-pxc-1.cluster1-pxc")
        );
    }

    #[test]
    fn test_backup_node_none_ready() {
        assert_eq!(backup_node(&[], "cluster1"), None);
        assert_eq!(backup_node(&[pod("cluster1-pxc-0", "False")], "cluster1"), None);
    }
}
