//! Backup volume provisioning
//!
//! Filesystem storages write into a PVC that has to be Bound before the backup
//! job can be submitted. The PVC is created if missing and its phase polled with
//! a linear backoff.

use std::fmt;
use std::time::Instant;

use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::adapters::{build_volume, owner_reference, with_owner};
use crate::crd::PerconaXtraDBBackup;
use crate::error::{Error, Result};
use crate::metrics;
use crate::retry::{poll_until, Poll, RetryPolicy, Sleeper};
use crate::store::{BackupStore, CreateOutcome};

/// Phase of a PersistentVolumeClaim
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumePhase {
    /// No phase reported, or the PVC could not be found
    Undefined,
    Pending,
    Bound,
    Lost,
}

impl VolumePhase {
    /// Phase reported in the PVC status
    pub fn of(pvc: &PersistentVolumeClaim) -> Self {
        match pvc.status.as_ref().and_then(|s| s.phase.as_deref()) {
            Some("Pending") => VolumePhase::Pending,
            Some("Bound") => VolumePhase::Bound,
            Some("Lost") => VolumePhase::Lost,
            _ => VolumePhase::Undefined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VolumePhase::Undefined => "Undefined",
            VolumePhase::Pending => "Pending",
            VolumePhase::Bound => "Bound",
            VolumePhase::Lost => "Lost",
        }
    }
}

impl fmt::Display for VolumePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Make sure the backup PVC exists and is Bound
///
/// The PVC is owned by `backup`. A PVC that already exists, or that appears
/// between the lookup and the create, is reused. Fails with
/// [`Error::VolumeNotReady`] if the PVC is not Bound after the last poll.
pub async fn ensure_volume(
    store: &dyn BackupStore,
    sleeper: &dyn Sleeper,
    policy: &RetryPolicy,
    backup: &PerconaXtraDBBackup,
    name: &str,
    claim: &PersistentVolumeClaimSpec,
) -> Result<()> {
    let owner = owner_reference(backup)?;
    let pvc = with_owner(build_volume(backup, name, claim)?, &owner);
    let namespace = backup
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let namespace = namespace.as_str();

    if store.get_volume(namespace, name).await?.is_none() {
        info!(namespace = %namespace, name = %name, "Creating a new volume for backup");
        if store.create_volume(namespace, &pvc).await? == CreateOutcome::AlreadyExists {
            debug!(namespace = %namespace, name = %name, "Backup volume created concurrently");
        }
    }

    let started = Instant::now();
    let outcome = poll_until(policy, sleeper, "wait_volume_bound", move |_| async move {
        match store.get_volume(namespace, name).await {
            Ok(Some(pvc)) => match VolumePhase::of(&pvc) {
                VolumePhase::Bound => Ok(Poll::Ready(())),
                phase => Ok(Poll::Pending(phase)),
            },
            Ok(None) => Ok(Poll::Pending(VolumePhase::Undefined)),
            Err(e) => Err(Error::VolumeStatusUnavailable(Box::new(e))),
        }
    })
    .await?;
    metrics::VOLUME_WAIT_DURATION.observe(started.elapsed().as_secs_f64());

    match outcome {
        Poll::Ready(()) => Ok(()),
        Poll::Pending(phase) => {
            warn!(namespace = %namespace, name = %name, phase = %phase, "Backup volume not bound");
            Err(Error::VolumeNotReady(phase))
        }
    }
}
