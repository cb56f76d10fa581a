//! Storage resolution
//!
//! Picks the storage profile a backup asks for out of the cluster's backup spec
//! and computes where the backup will be written.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::PersistentVolumeClaimSpec;

use crate::crd::{ObjectStorageSpec, PxcBackupSpec, StorageProfile};
use crate::error::{Error, Result};

/// Scheme prefix of object storage destinations
pub const S3_SCHEME: &str = "s3://";

/// Timestamp layout used in object storage destinations (year-day-month)
const DESTINATION_TIME_FORMAT: &str = "%Y-%d-%m-%H:%M:%S";

/// Storage a backup job writes to, with its destination identifier
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStorage {
    /// Name of the storage profile in the cluster spec
    pub profile_name: String,
    /// `pvc/<name>` or `s3://<bucket>/<object>`
    pub destination: String,
    pub target: StorageTarget,
}

/// Backing of a resolved storage
#[derive(Clone, Debug, PartialEq)]
pub enum StorageTarget {
    /// PVC that must be provisioned and bound before the job runs
    Volume {
        name: String,
        claim: PersistentVolumeClaimSpec,
    },
    /// Object storage bucket the job streams into
    ObjectStorage(ObjectStorageSpec),
}

impl ResolvedStorage {
    /// Object storage settings to echo into the backup status
    pub fn object_storage(&self) -> Option<&ObjectStorageSpec> {
        match &self.target {
            StorageTarget::ObjectStorage(s3) => Some(s3),
            StorageTarget::Volume { .. } => None,
        }
    }
}

/// Resolve the named storage profile of a cluster
///
/// `created` is the backup's creation time. Only object storage streams are
/// named after it, so it is required for those alone.
pub fn resolve_storage(
    backup_spec: &PxcBackupSpec,
    profile_name: &str,
    cluster_name: &str,
    created: Option<DateTime<Utc>>,
    volume_name: &str,
) -> Result<ResolvedStorage> {
    let profile = backup_spec
        .storages
        .get(profile_name)
        .ok_or_else(|| Error::UnknownStorageProfile(profile_name.to_string()))?
        .to_profile(profile_name)?;

    let (destination, target) = match profile {
        StorageProfile::Filesystem(claim) => (
            volume_destination(volume_name),
            StorageTarget::Volume {
                name: volume_name.to_string(),
                claim,
            },
        ),
        StorageProfile::ObjectStorage(s3) => {
            let created = created.ok_or(Error::MissingObjectKey(".metadata.creationTimestamp"))?;
            (
                object_storage_destination(&s3.bucket, cluster_name, created),
                StorageTarget::ObjectStorage(s3),
            )
        }
    };

    Ok(ResolvedStorage {
        profile_name: profile_name.to_string(),
        destination,
        target,
    })
}

/// Destination of a filesystem backup
pub fn volume_destination(volume_name: &str) -> String {
    format!("pvc/{}", volume_name)
}

/// Destination of an object storage backup
///
/// The `s3://` scheme appears exactly once, whether or not the bucket carries it.
pub fn object_storage_destination(
    bucket: &str,
    cluster_name: &str,
    created: DateTime<Utc>,
) -> String {
    let destination = format!(
        "{}/{}-{}-xtrabackup.stream",
        bucket,
        cluster_name,
        created.format(DESTINATION_TIME_FORMAT)
    );

    if bucket.starts_with(S3_SCHEME) {
        destination
    } else {
        format!("{}{}", S3_SCHEME, destination)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;
    use crate::crd::{BackupStorageSpec, VolumeSpec};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 7, 15, 4, 5).unwrap()
    }

    fn s3(bucket: &str) -> ObjectStorageSpec {
        ObjectStorageSpec {
            bucket: bucket.to_string(),
            credentials_secret: "aws-creds".to_string(),
            region: Some("us-east-1".to_string()),
            endpoint_url: None,
        }
    }

    fn backup_spec() -> PxcBackupSpec {
        let mut storages = BTreeMap::new();
        storages.insert(
            "fs-pvc".to_string(),
            BackupStorageSpec {
                storage_type: "filesystem".to_string(),
                volume: Some(VolumeSpec {
                    persistent_volume_claim: Some(PersistentVolumeClaimSpec::default()),
                }),
                s3: None,
            },
        );
        storages.insert(
            "s3-us-east".to_string(),
            BackupStorageSpec {
                storage_type: "s3".to_string(),
                volume: None,
                s3: Some(s3("mybucket")),
            },
        );
        PxcBackupSpec {
            image: "backup:latest".to_string(),
            storages,
            ..Default::default()
        }
    }

    #[test]
    fn test_object_storage_destination_format() {
        assert_eq!(
            object_storage_destination("mybucket", "some-name", created()),
            "s3://mybucket/some-name-2024-07-03-15:04:05-xtrabackup.stream"
        );
    }

    #[test]
    fn test_object_storage_destination_keeps_single_scheme() {
        let destination = object_storage_destination("s3://mybucket", "some-name", created());
        assert_eq!(
            destination,
            "s3://mybucket/some-name-2024-07-03-15:04:05-xtrabackup.stream"
        );
        assert_eq!(destination.matches(S3_SCHEME).count(), 1);
    }

    #[test]
    fn test_resolve_filesystem() {
        let resolved =
            resolve_storage(&backup_spec(), "fs-pvc", "cluster1", Some(created()), "backup-pvc").unwrap();

        assert_eq!(resolved.destination, "pvc/backup-pvc");
        assert_eq!(resolved.profile_name, "fs-pvc");
        assert!(resolved.object_storage().is_none());
        assert!(matches!(resolved.target, StorageTarget::Volume { ref name, .. } if name == "backup-pvc"));
    }

    #[test]
    fn test_resolve_object_storage() {
        let resolved =
            resolve_storage(&backup_spec(), "s3-us-east", "cluster1", Some(created()), "backup-pvc")
                .unwrap();

        assert_eq!(
            resolved.destination,
            "s3://mybucket/cluster1-2024-07-03-15:04:05-xtrabackup.stream"
        );
        assert_eq!(resolved.object_storage(), Some(&s3("mybucket")));
    }

    #[test]
    fn test_resolve_unknown_profile() {
        let err = resolve_storage(&backup_spec(), "gcs", "cluster1", Some(created()), "backup-pvc")
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStorageProfile(ref name) if name == "gcs"));
    }

    #[test]
    fn test_creation_time_only_needed_for_object_storage() {
        let resolved =
            resolve_storage(&backup_spec(), "fs-pvc", "cluster1", None, "backup-pvc").unwrap();
        assert_eq!(resolved.destination, "pvc/backup-pvc");

        let err = resolve_storage(&backup_spec(), "s3-us-east", "cluster1", None, "backup-pvc")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingObjectKey(".metadata.creationTimestamp")
        ));
    }
}
