//! CRD YAML Generator
//!
//! This binary generates the Kubernetes CRD manifest for the PerconaXtraDBBackup
//! resource managed by the xtradb-backup-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/backup.yaml

use xtradb_backup_operator::crd::generate_crds;

fn main() -> anyhow::Result<()> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
