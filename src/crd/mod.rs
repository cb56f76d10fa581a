//! Custom Resource Definitions for the XtraDB Backup Operator

mod xtradb_backup;
mod xtradb_cluster;

pub use xtradb_backup::*;
pub use xtradb_cluster::*;

use kube::CustomResourceExt;

/// Generate the CRD YAML manifests owned by this operator
///
/// `PerconaXtraDBCluster` is managed by the cluster operator and is only read here.
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![serde_yaml::to_string(&PerconaXtraDBBackup::crd())?])
}
