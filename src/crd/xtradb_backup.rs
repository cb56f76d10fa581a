//! PerconaXtraDBBackup Custom Resource Definition

use std::fmt;

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ObjectStorageSpec;

/// On-demand backup request for a PerconaXtraDBCluster
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "pxc.percona.com",
    version = "v1",
    kind = "PerconaXtraDBBackup",
    plural = "perconaxtradbbackups",
    singular = "perconaxtradbbackup",
    shortname = "pxc-backup",
    namespaced,
    status = "PerconaXtraDBBackupStatus",
    printcolumn = r#"{"name": "Cluster", "type": "string", "jsonPath": ".spec.targetCluster"}"#,
    printcolumn = r#"{"name": "Storage", "type": "string", "jsonPath": ".spec.storageProfile"}"#,
    printcolumn = r#"{"name": "Destination", "type": "string", "jsonPath": ".status.destination"}"#,
    printcolumn = r#"{"name": "Status", "type": "string", "jsonPath": ".status.state"}"#,
    printcolumn = r#"{"name": "Completed", "type": "date", "jsonPath": ".status.completedAt"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PerconaXtraDBBackupSpec {
    /// Name of the PerconaXtraDBCluster to back up
    #[serde(alias = "pxcCluster")]
    pub target_cluster: String,

    /// Key into the cluster's `spec.backup.storages`
    #[serde(alias = "storageName")]
    pub storage_profile: String,
}

/// Backup lifecycle state, mirrored from the backup job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum BackupState {
    #[default]
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl BackupState {
    /// Whether the state can no longer change
    pub fn is_terminal(self) -> bool {
        matches!(self, BackupState::Succeeded | BackupState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupState::Starting => "Starting",
            BackupState::Running => "Running",
            BackupState::Succeeded => "Succeeded",
            BackupState::Failed => "Failed",
        }
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PerconaXtraDBBackup status
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerconaXtraDBBackupStatus {
    /// Current state (Starting, Running, Succeeded, Failed)
    #[serde(default)]
    pub state: BackupState,

    /// Where the backup is written (`pvc/<name>` or `s3://...`)
    #[serde(default)]
    pub destination: String,

    /// Storage profile the backup was taken with
    #[serde(default)]
    pub storage_profile: String,

    /// Object storage settings, set only for object storage profiles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_storage: Option<ObjectStorageSpec>,

    /// Completion time of a succeeded backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
