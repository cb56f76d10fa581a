//! Error types for the XtraDB Backup Operator

use thiserror::Error;

use crate::reconcilers::volume::VolumePhase;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Target cluster does not exist in the backup's namespace
    #[error("wrong cluster name: {name:?}. Clusters available: {available:?}")]
    ClusterNotFound { name: String, available: Vec<String> },

    /// Cluster exists but declares no backup section
    #[error("a backup image should be set in the PXC config of cluster {0:?}")]
    BackupNotConfigured(String),

    /// Storage profile name is absent from the cluster's backup storages
    #[error("storage profile {0:?} doesn't exist")]
    UnknownStorageProfile(String),

    /// Storage profile type is not one of the supported kinds
    #[error("storage profile {name:?} has unsupported kind: {reason}")]
    UnknownStorageKind { name: String, reason: String },

    /// No ready cluster pod to take the backup from
    #[error("select backup node: no ready pods in cluster {0:?}")]
    NoBackupNode(String),

    /// Volume never reached the Bound phase
    #[error("pvc not ready, status: {0}")]
    VolumeNotReady(VolumePhase),

    /// Volume status could not be read
    #[error("get pvc status: {0}")]
    VolumeStatusUnavailable(#[source] Box<Error>),

    /// Owner reference could not be built from the backup
    #[error("set owner reference: {0}")]
    OwnerReference(String),

    /// Object is missing a required metadata field
    #[error("object is missing {0}")]
    MissingObjectKey(&'static str),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short label used for the reconcile error metric
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::Kube(_) => "kube",
            Error::ClusterNotFound { .. } => "cluster_not_found",
            Error::BackupNotConfigured(_) => "backup_not_configured",
            Error::UnknownStorageProfile(_) => "unknown_storage_profile",
            Error::UnknownStorageKind { .. } => "unknown_storage_kind",
            Error::NoBackupNode(_) => "no_backup_node",
            Error::VolumeNotReady(_) => "volume_not_ready",
            Error::VolumeStatusUnavailable(_) => "volume_status_unavailable",
            Error::OwnerReference(_) => "owner_reference",
            Error::MissingObjectKey(_) => "missing_object_key",
            Error::Serialization(_) => "serialization",
        }
    }
}
