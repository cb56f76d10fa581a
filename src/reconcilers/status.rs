//! Backup status derived from the backup job
//!
//! The status is a projection of the job's run counters and is only written
//! back when it differs from what is stored.

use k8s_openapi::api::batch::v1::Job;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::adapters::ResolvedStorage;
use crate::crd::{BackupState, PerconaXtraDBBackup, PerconaXtraDBBackupStatus};
use crate::error::{Error, Result};
use crate::metrics;
use crate::store::BackupStore;

/// What [`sync_status`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusSync {
    /// Job is gone; status left untouched
    JobMissing,
    /// Stored status already matches the job
    Unchanged,
    /// Status written with the given state
    Written(BackupState),
}

/// Status reflecting the job's current run counters
pub fn derive_status(job: &Job, storage: &ResolvedStorage) -> PerconaXtraDBBackupStatus {
    let mut status = PerconaXtraDBBackupStatus {
        state: BackupState::Starting,
        destination: storage.destination.clone(),
        storage_profile: storage.profile_name.clone(),
        object_storage: storage.object_storage().cloned(),
        completed_at: None,
    };

    let Some(job_status) = job.status.as_ref() else {
        return status;
    };

    if job_status.active == Some(1) {
        status.state = BackupState::Running;
    } else if job_status.succeeded == Some(1) {
        status.state = BackupState::Succeeded;
        status.completed_at = job_status.completion_time.as_ref().map(|t| t.0);
    } else if job_status.failed == Some(1) {
        status.state = BackupState::Failed;
    }

    status
}

/// Status to persist, or `None` when nothing should be written
///
/// Nothing is written when `candidate` equals `previous`, or when `previous`
/// is already terminal.
pub fn write_if_changed(
    previous: Option<&PerconaXtraDBBackupStatus>,
    candidate: PerconaXtraDBBackupStatus,
) -> Option<PerconaXtraDBBackupStatus> {
    match previous {
        Some(previous) if *previous == candidate => None,
        Some(previous) if previous.state.is_terminal() => None,
        _ => Some(candidate),
    }
}

/// Mirror the state of the backup job into the backup status
pub async fn sync_status(
    store: &dyn BackupStore,
    backup: &PerconaXtraDBBackup,
    job_name: &str,
    storage: &ResolvedStorage,
) -> Result<StatusSync> {
    let namespace = backup
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

    let Some(job) = store.get_job(&namespace, job_name).await? else {
        debug!(namespace = %namespace, job = %job_name, "Backup job not found, skipping status update");
        return Ok(StatusSync::JobMissing);
    };

    let candidate = derive_status(&job, storage);
    let previous = backup.status.as_ref();
    if let Some(previous) = previous {
        if previous.state.is_terminal() && previous.state != candidate.state {
            warn!(
                namespace = %namespace,
                name = %backup.name_any(),
                stored = %previous.state,
                observed = %candidate.state,
                "Backup already finished, keeping terminal state"
            );
        }
    }

    let Some(status) = write_if_changed(previous, candidate) else {
        return Ok(StatusSync::Unchanged);
    };

    let state = status.state;
    let mut updated = backup.clone();
    updated.status = Some(status);
    store.replace_backup_status(&updated).await?;

    info!(
        namespace = %namespace,
        name = %backup.name_any(),
        state = %state,
        "Updated backup status"
    );
    metrics::BACKUP_STATES
        .with_label_values(&[state.as_str(), namespace.as_str()])
        .inc();

    Ok(StatusSync::Written(state))
}
