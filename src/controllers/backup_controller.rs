//! PerconaXtraDBBackup controller
//!
//! Watches PerconaXtraDBBackup resources and the jobs they own, and triggers
//! reconciliation.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument};

use crate::controllers::Context;
use crate::crd::PerconaXtraDBBackup;
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::backup as backup_reconciler;

const KIND: &str = "PerconaXtraDBBackup";

/// Run the PerconaXtraDBBackup controller
pub async fn run(client: Client, context: Arc<Context>) {
    let api: Api<PerconaXtraDBBackup> = Api::all(client.clone());
    let jobs: Api<Job> = Api::all(client);

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("PerconaXtraDBBackup CRD not installed: {}", e);
        return;
    }

    info!("Starting PerconaXtraDBBackup controller");

    Controller::new(api, WatcherConfig::default())
        .owns(jobs, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled PerconaXtraDBBackup"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                }
            }
        })
        .await;
}

/// Main reconciliation function
#[instrument(skip(ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<PerconaXtraDBBackup>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let namespace = obj
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

    backup_reconciler::reconcile(
        ctx.store.as_ref(),
        ctx.sleeper.as_ref(),
        &ctx.config.reconcile,
        &namespace,
        &obj.name_any(),
    )
    .await
}

/// Error policy for the controller
///
/// Failed reconciliations are retried on the same fixed delay as successful ones.
fn error_policy(obj: Arc<PerconaXtraDBBackup>, error: &Error, ctx: Arc<Context>) -> Action {
    error!(
        name = %obj.name_any(),
        namespace = obj.namespace().as_deref().unwrap_or("default"),
        error = %error,
        "Reconciliation failed, scheduling retry"
    );
    metrics::RECONCILIATION_ERRORS
        .with_label_values(&[KIND, error.metric_label()])
        .inc();

    Action::requeue(ctx.config.reconcile.requeue_after)
}
