//! Backup Job and PVC construction
//!
//! Builds the objects the reconciler submits for a PerconaXtraDBBackup. Both are
//! owned by the backup so deleting it garbage-collects them.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, SecretKeySelector, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use super::storage_config::{ResolvedStorage, StorageTarget};
use crate::crd::{ObjectStorageSpec, PerconaXtraDBBackup, PxcBackupSpec};
use crate::error::{Error, Result};

/// Mount path of the backup PVC inside the job container
pub const BACKUP_MOUNT_PATH: &str = "/backup";

const CONTAINER_NAME: &str = "xtrabackup";
const STORAGE_VOLUME_NAME: &str = "xtrabackup";
const BACKUP_COMMAND: [&str; 2] = ["bash", "/usr/bin/backup.sh"];

const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
const LABEL_CLUSTER: &str = "pxc.percona.com/cluster";
const LABEL_BACKUP: &str = "pxc.percona.com/backup";
const MANAGER: &str = "xtradb-backup-operator";

/// Name of the job running a backup
pub fn job_name(backup_name: &str) -> String {
    format!("xb-{}", backup_name)
}

/// Controller owner reference pointing at the backup
///
/// Fails when the backup has not been persisted yet (no UID).
pub fn owner_reference(backup: &PerconaXtraDBBackup) -> Result<OwnerReference> {
    backup.controller_owner_ref(&()).ok_or_else(|| {
        Error::OwnerReference(format!("backup {:?} has no uid", backup.name_any()))
    })
}

/// Return `obj` with `owner` added to its owner references
///
/// An owner with the same UID is only recorded once.
pub fn with_owner<K: Resource>(mut obj: K, owner: &OwnerReference) -> K {
    let refs = obj.meta_mut().owner_references.get_or_insert_with(Vec::new);
    if !refs.iter().any(|r| r.uid == owner.uid) {
        refs.push(owner.clone());
    }
    obj
}

fn labels(cluster_name: &str, backup_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_MANAGED_BY.to_string(), MANAGER.to_string()),
        (LABEL_CLUSTER.to_string(), cluster_name.to_string()),
        (LABEL_BACKUP.to_string(), backup_name.to_string()),
    ])
}

/// PVC backing a filesystem storage, created from the profile's claim template
pub fn build_volume(
    backup: &PerconaXtraDBBackup,
    name: &str,
    claim: &PersistentVolumeClaimSpec,
) -> Result<PersistentVolumeClaim> {
    let namespace = backup
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

    Ok(PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace),
            labels: Some(labels(&backup.spec.target_cluster, &backup.name_any())),
            ..Default::default()
        },
        spec: Some(claim.clone()),
        ..Default::default()
    })
}

/// Job running xtrabackup against `node`, wired to the resolved storage
///
/// `node` is the DNS name of the cluster pod the backup is streamed from.
pub fn build_job(
    backup: &PerconaXtraDBBackup,
    backup_spec: &PxcBackupSpec,
    storage: &ResolvedStorage,
    node: &str,
) -> Result<Job> {
    let namespace = backup
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let backup_name = backup.name_any();
    let cluster_name = &backup.spec.target_cluster;
    let labels = labels(cluster_name, &backup_name);

    let mut env = vec![env_value("NODE_NAME", node)];
    let mut volume_mounts = Vec::new();
    let mut volumes = Vec::new();

    match &storage.target {
        StorageTarget::Volume { name, .. } => {
            env.push(env_value("BACKUP_DIR", BACKUP_MOUNT_PATH));
            volume_mounts.push(VolumeMount {
                name: STORAGE_VOLUME_NAME.to_string(),
                mount_path: BACKUP_MOUNT_PATH.to_string(),
                ..Default::default()
            });
            volumes.push(Volume {
                name: STORAGE_VOLUME_NAME.to_string(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: name.clone(),
                    read_only: Some(false),
                }),
                ..Default::default()
            });
        }
        StorageTarget::ObjectStorage(s3) => {
            env.extend(object_storage_env(s3, &storage.destination));
        }
    }

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(backup_spec.image.clone()),
        command: Some(BACKUP_COMMAND.iter().map(|s| s.to_string()).collect()),
        env: Some(env),
        volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
        ..Default::default()
    };

    Ok(Job {
        metadata: ObjectMeta {
            name: Some(job_name(&backup_name)),
            namespace: Some(namespace),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: (!volumes.is_empty()).then_some(volumes),
                    restart_policy: Some("Never".to_string()),
                    image_pull_secrets: (!backup_spec.image_pull_secrets.is_empty())
                        .then(|| backup_spec.image_pull_secrets.clone()),
                    service_account_name: backup_spec.service_account_name.clone(),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn object_storage_env(s3: &ObjectStorageSpec, destination: &str) -> Vec<EnvVar> {
    let mut env = vec![
        env_value("S3_BUCKET_URL", destination),
        env_secret("AWS_ACCESS_KEY_ID", &s3.credentials_secret),
        env_secret("AWS_SECRET_ACCESS_KEY", &s3.credentials_secret),
    ];
    if let Some(region) = &s3.region {
        env.push(env_value("AWS_DEFAULT_REGION", region.as_str()));
    }
    if let Some(endpoint) = &s3.endpoint_url {
        env.push(env_value("AWS_ENDPOINT_URL", endpoint.as_str()));
    }
    env
}

fn env_value(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Env var read from the key of the same name in `secret`
fn env_secret(name: &str, secret: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
