//! Read-only view of the PerconaXtraDBCluster resource
//!
//! Only the fields the backup controller consumes are modelled; everything
//! else in the cluster spec is ignored on deserialization.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{LocalObjectReference, PersistentVolumeClaimSpec};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wire value of `type` for filesystem (PVC) storages
pub const STORAGE_TYPE_FILESYSTEM: &str = "filesystem";

/// Wire value of `type` for S3-compatible storages
pub const STORAGE_TYPE_S3: &str = "s3";

/// Label naming the cluster a database pod belongs to
pub const LABEL_POD_INSTANCE: &str = "app.kubernetes.io/instance";

/// Label naming the role of a cluster pod
pub const LABEL_POD_COMPONENT: &str = "app.kubernetes.io/component";

/// Component label value of database pods
pub const POD_COMPONENT_PXC: &str = "pxc";

/// PerconaXtraDBCluster spec, limited to the backup section
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "pxc.percona.com",
    version = "v1",
    kind = "PerconaXtraDBCluster",
    plural = "perconaxtradbclusters",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct PerconaXtraDBClusterSpec {
    /// Backup configuration; absent when the cluster has no backup support
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PxcBackupSpec>,
}

/// `spec.backup` of a PerconaXtraDBCluster
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PxcBackupSpec {
    /// Image running xtrabackup inside the backup job
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Storage profiles keyed by name
    #[serde(default)]
    pub storages: BTreeMap<String, BackupStorageSpec>,
}

/// Storage profile as written in the cluster resource
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStorageSpec {
    /// Storage type (filesystem, s3)
    #[serde(rename = "type")]
    pub storage_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<ObjectStorageSpec>,
}

/// Volume source for filesystem storages
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaimSpec>,
}

/// S3-compatible object storage settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageSpec {
    /// Bucket name, with or without the `s3://` scheme
    pub bucket: String,

    /// Secret holding AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY
    pub credentials_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Custom endpoint (for MinIO, Ceph, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

/// A storage profile with exactly one backing kind
#[derive(Clone, Debug, PartialEq)]
pub enum StorageProfile {
    /// Backup is written to a PVC created from this claim template
    Filesystem(PersistentVolumeClaimSpec),
    /// Backup is streamed to object storage
    ObjectStorage(ObjectStorageSpec),
}

impl BackupStorageSpec {
    /// Convert the wire representation into a [`StorageProfile`]
    ///
    /// The `type` field selects the variant; its matching sub-section must be present.
    pub fn to_profile(&self, name: &str) -> Result<StorageProfile> {
        let unknown = |reason: String| Error::UnknownStorageKind {
            name: name.to_string(),
            reason,
        };

        match self.storage_type.as_str() {
            STORAGE_TYPE_FILESYSTEM => self
                .volume
                .as_ref()
                .and_then(|v| v.persistent_volume_claim.clone())
                .map(StorageProfile::Filesystem)
                .ok_or_else(|| unknown("filesystem storage without volume.persistentVolumeClaim".into())),
            STORAGE_TYPE_S3 => self
                .s3
                .clone()
                .map(StorageProfile::ObjectStorage)
                .ok_or_else(|| unknown("s3 storage without s3 configuration".into())),
            other => Err(unknown(format!(
                "type {:?} must be one of: {}, {}",
                other, STORAGE_TYPE_FILESYSTEM, STORAGE_TYPE_S3
            ))),
        }
    }
}

impl PerconaXtraDBCluster {
    /// Backup section of the cluster spec
    pub fn backup_spec(&self) -> Option<&PxcBackupSpec> {
        self.spec.backup.as_ref()
    }
}

/// Label selector matching the database pods of a cluster
pub fn pod_selector(cluster_name: &str) -> String {
    format!(
        "{}={},{}={}",
        LABEL_POD_INSTANCE, cluster_name, LABEL_POD_COMPONENT, POD_COMPONENT_PXC
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(value: serde_json::Value) -> BackupStorageSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_filesystem_profile() {
        let spec = storage(serde_json::json!({
            "type": "filesystem",
            "volume": {
                "persistentVolumeClaim": {
                    "accessModes": ["ReadWriteOnce"],
                    "resources": {"requests": {"storage": "6Gi"}}
                }
            }
        }));

        let profile = spec.to_profile("fs-pvc").unwrap();
        let StorageProfile::Filesystem(claim) = profile else {
            panic!("expected filesystem profile, got {:?}", profile);
        };
        assert_eq!(claim.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
    }

    #[test]
    fn test_s3_profile() {
        let spec = storage(serde_json::json!({
            "type": "s3",
            "s3": {
                "bucket": "mybucket",
                "credentialsSecret": "aws-creds",
                "region": "us-west-2"
            }
        }));

        assert_eq!(
            spec.to_profile("s3-us-west").unwrap(),
            StorageProfile::ObjectStorage(ObjectStorageSpec {
                bucket: "mybucket".to_string(),
                credentials_secret: "aws-creds".to_string(),
                region: Some("us-west-2".to_string()),
                endpoint_url: None,
            })
        );
    }

    #[test]
    fn test_pod_selector() {
        assert_eq!(
            pod_selector("cluster1"),
            "app.kubernetes.io/instance=cluster1,app.kubernetes.io/component=pxc"
        );
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let spec = storage(serde_json::json!({"type": "azure"}));

        let err = spec.to_profile("blob").unwrap_err();
        assert!(matches!(err, Error::UnknownStorageKind { ref name, .. } if name == "blob"));
        assert!(err.to_string().contains("azure"));
    }

    #[test]
    fn test_type_without_section_is_rejected() {
        let spec = storage(serde_json::json!({"type": "filesystem"}));
        assert!(matches!(
            spec.to_profile("fs"),
            Err(Error::UnknownStorageKind { .. })
        ));

        let spec = storage(serde_json::json!({"type": "s3"}));
        assert!(matches!(
            spec.to_profile("s3"),
            Err(Error::UnknownStorageKind { .. })
        ));
    }

    #[test]
    fn test_cluster_view_ignores_unrelated_fields() {
        let cluster: PerconaXtraDBCluster = serde_json::from_value(serde_json::json!({
            "apiVersion": "pxc.percona.com/v1",
            "kind": "PerconaXtraDBCluster",
            "metadata": {"name": "cluster1", "namespace": "pxc"},
            "spec": {
                "pxc": {"size": 3, "image": "percona/percona-xtradb-cluster:8.0"},
                "backup": {
                    "image": "percona/percona-xtradb-cluster-operator:backup",
                    "storages": {
                        "fs-pvc": {"type": "filesystem", "volume": {"persistentVolumeClaim": {}}}
                    }
                }
            }
        }))
        .unwrap();

        let backup = cluster.backup_spec().unwrap();
        assert_eq!(backup.image, "percona/percona-xtradb-cluster-operator:backup");
        assert!(backup.storages.contains_key("fs-pvc"));
    }
}
