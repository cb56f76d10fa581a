//! Percona XtraDB Backup Kubernetes Operator
//!
//! This operator turns PerconaXtraDBBackup requests into backup jobs for
//! PerconaXtraDBCluster resources and mirrors the job state into the request.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;
pub mod retry;
pub mod store;

pub use error::{Error, Result};
