//! Adapters turning backup and cluster specs into Kubernetes objects

mod backup_job;
mod storage_config;

pub use backup_job::*;
pub use storage_config::*;
