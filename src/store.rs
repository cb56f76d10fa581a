//! State-store access used by the reconciler
//!
//! All reads and writes against the API server go through [`BackupStore`], so the
//! reconciliation logic can run against an in-memory implementation in tests.

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};

use crate::crd::{pod_selector, PerconaXtraDBBackup, PerconaXtraDBCluster};
use crate::error::{Error, Result};

/// Outcome of an idempotent create
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Object access needed to reconcile a PerconaXtraDBBackup
#[async_trait]
pub trait BackupStore: Send + Sync {
    /// Get a backup by name, `None` if it does not exist
    async fn get_backup(&self, namespace: &str, name: &str)
        -> Result<Option<PerconaXtraDBBackup>>;

    /// List all clusters in a namespace
    async fn list_clusters(&self, namespace: &str) -> Result<Vec<PerconaXtraDBCluster>>;

    /// List the database pods of a cluster
    async fn list_cluster_pods(&self, namespace: &str, cluster: &str) -> Result<Vec<Pod>>;

    /// Get a PVC by name, `None` if it does not exist
    async fn get_volume(&self, namespace: &str, name: &str)
        -> Result<Option<PersistentVolumeClaim>>;

    /// Create a PVC; an existing PVC with the same name is not an error
    async fn create_volume(&self, namespace: &str, pvc: &PersistentVolumeClaim)
        -> Result<CreateOutcome>;

    /// Get a job by name, `None` if it does not exist
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>>;

    /// Create a job; an existing job with the same name is not an error
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<CreateOutcome>;

    /// Replace the status of a backup
    ///
    /// The backup's `resourceVersion` is sent along, so a stale object is rejected
    /// with a conflict.
    async fn replace_backup_status(&self, backup: &PerconaXtraDBBackup) -> Result<()>;
}

/// [`BackupStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Map a create response, treating 409 Conflict as an existing object
fn create_outcome<K>(result: std::result::Result<K, kube::Error>) -> Result<CreateOutcome> {
    match result {
        Ok(_) => Ok(CreateOutcome::Created),
        Err(kube::Error::Api(api_err)) if api_err.code == 409 => Ok(CreateOutcome::AlreadyExists),
        Err(e) => Err(Error::Kube(e)),
    }
}

#[async_trait]
impl BackupStore for KubeStore {
    async fn get_backup(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PerconaXtraDBBackup>> {
        Ok(self.api::<PerconaXtraDBBackup>(namespace).get_opt(name).await?)
    }

    async fn list_clusters(&self, namespace: &str) -> Result<Vec<PerconaXtraDBCluster>> {
        let list = self
            .api::<PerconaXtraDBCluster>(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn list_cluster_pods(&self, namespace: &str, cluster: &str) -> Result<Vec<Pod>> {
        let params = ListParams::default().labels(&pod_selector(cluster));
        let list = self.api::<Pod>(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn get_volume(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PersistentVolumeClaim>> {
        Ok(self.api::<PersistentVolumeClaim>(namespace).get_opt(name).await?)
    }

    async fn create_volume(
        &self,
        namespace: &str,
        pvc: &PersistentVolumeClaim,
    ) -> Result<CreateOutcome> {
        create_outcome(
            self.api::<PersistentVolumeClaim>(namespace)
                .create(&PostParams::default(), pvc)
                .await,
        )
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>> {
        Ok(self.api::<Job>(namespace).get_opt(name).await?)
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<CreateOutcome> {
        create_outcome(self.api::<Job>(namespace).create(&PostParams::default(), job).await)
    }

    async fn replace_backup_status(&self, backup: &PerconaXtraDBBackup) -> Result<()> {
        let namespace = backup
            .namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        let name = backup.name_any();
        let data = serde_json::to_vec(backup)?;

        self.api::<PerconaXtraDBBackup>(&namespace)
            .replace_status(&name, &PostParams::default(), data)
            .await?;
        Ok(())
    }
}
