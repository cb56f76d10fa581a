//! Kubernetes controllers for PerconaXtraDBBackup
//!
//! This module contains the controller that watches backup requests and their
//! jobs and triggers reconciliation.

mod backup_controller;

pub use backup_controller::run as run_backup_controller;

use std::sync::Arc;

use kube::Client;

use crate::config::OperatorConfig;
use crate::retry::{Sleeper, TokioSleeper};
use crate::store::{BackupStore, KubeStore};

/// Shared context for the controller
pub struct Context {
    /// Object access used by the reconciler
    pub store: Arc<dyn BackupStore>,
    /// Delay source for volume polling
    pub sleeper: Arc<dyn Sleeper>,
    pub config: OperatorConfig,
}

impl Context {
    /// Create a context talking to the API server through `client`
    pub fn new(client: Client, config: OperatorConfig) -> Self {
        Self::with_store(Arc::new(KubeStore::new(client)), config)
    }

    /// Create a context on top of an arbitrary store
    pub fn with_store(store: Arc<dyn BackupStore>, config: OperatorConfig) -> Self {
        Self {
            store,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }
}
