//! Reconcilers for PerconaXtraDBBackup
//!
//! This module contains the business logic for reconciling backup requests.
//! Reconcilers are responsible for:
//! - Resolving the target cluster and storage
//! - Provisioning storage and submitting the backup job
//! - Updating resource status

pub mod backup;
pub mod status;
pub mod volume;
