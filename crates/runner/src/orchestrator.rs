use std::collections::HashSet;
use std::sync::Arc;

use autosnap_core::{
    classify, managed_snapshot_name, needs_backup_today, Catalog, Decision, InstanceHistory,
    RetentionPolicy,
};
use autosnap_gateway::{GatewayError, SnapshotGateway};
use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::report::{Action, Failure, InstanceReport, RunReport};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Reference time for the whole run; its offset defines calendar days.
    pub now: DateTime<FixedOffset>,
    pub policy: RetentionPolicy,
    pub concurrency: usize,
    pub dry_run: bool,
}

/// Drives one run: list once, then create and prune per instance.
pub struct Orchestrator {
    gateway: Arc<dyn SnapshotGateway>,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn SnapshotGateway>, options: RunOptions) -> Self {
        Self { gateway, options }
    }

    /// A listing failure aborts the run before any instance is touched. Create and delete
    /// failures are recorded per instance and never stop the others.
    pub async fn run(&self, instances: &[String]) -> Result<RunReport, GatewayError> {
        let mut seen = HashSet::new();
        let instances: Vec<String> = instances
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();

        let raw = self.gateway.list_snapshots().await?;
        let catalog = Catalog::build(raw, instances.as_slice());
        info!(
            instances = instances.len(),
            managed = catalog.managed_snapshot_count(),
            "catalog built"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles = Vec::with_capacity(instances.len());
        for instance in instances {
            let history = catalog.history(&instance);
            let gateway = Arc::clone(&self.gateway);
            let semaphore = Arc::clone(&semaphore);
            let options = self.options;
            let task_instance = instance.clone();
            let handle = tokio::spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                process_instance(gateway.as_ref(), task_instance, history, options).await
            });
            handles.push((instance, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (instance, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(%instance, error = %e, "instance task aborted");
                    let mut report = InstanceReport::new(instance);
                    report.failures.push(Failure {
                        action: Action::Task,
                        snapshot: String::new(),
                        message: format!("task aborted: {e}"),
                    });
                    reports.push(report);
                }
            }
        }

        Ok(RunReport {
            dry_run: self.options.dry_run,
            instances: reports,
        })
    }
}

/// Create today's snapshot if needed, then prune. The prune decisions use the history as
/// listed, without the snapshot just requested.
pub async fn process_instance(
    gateway: &dyn SnapshotGateway,
    instance: String,
    history: InstanceHistory,
    options: RunOptions,
) -> InstanceReport {
    let RunOptions {
        now,
        policy,
        dry_run,
        ..
    } = options;
    let mut report = InstanceReport::new(instance.clone());

    if history.is_empty() {
        info!(%instance, "no managed snapshots yet");
    }
    info!(%instance, snapshots = history.len(), "checking for today's backup");
    if needs_backup_today(&history, now) {
        let name = managed_snapshot_name(&instance, now.with_timezone(&Utc));
        if dry_run {
            info!(%instance, snapshot = %name, "dry run: would create snapshot");
            report.created = Some(name);
        } else {
            info!(%instance, snapshot = %name, "creating snapshot");
            match gateway.create_snapshot(&instance, &name).await {
                Ok(()) => {
                    info!(%instance, snapshot = %name, "snapshot creation accepted");
                    report.created = Some(name);
                }
                Err(e) => {
                    error!(%instance, snapshot = %name, error = %e, "error creating snapshot");
                    report.failures.push(Failure {
                        action: Action::Create,
                        snapshot: name,
                        message: e.to_string(),
                    });
                }
            }
        }
    } else {
        info!(%instance, "backup for today already exists");
    }

    let verdicts = classify(history.snapshots(), now, &policy);
    let keep = verdicts.iter().filter(|v| v.decision.is_retain()).count();
    info!(
        %instance,
        keep,
        delete = verdicts.len() - keep,
        "pruning backups"
    );
    for verdict in verdicts {
        let snapshot = verdict.snapshot;
        let created_at = snapshot.created_at.with_timezone(&now.timezone());
        match verdict.decision {
            Decision::Retain(tier) => {
                info!(
                    %instance,
                    snapshot = %snapshot.name,
                    %created_at,
                    age_days = verdict.age_days,
                    ?tier,
                    "retaining backup"
                );
                report.retained += 1;
            }
            Decision::Delete if dry_run => {
                info!(
                    %instance,
                    snapshot = %snapshot.name,
                    %created_at,
                    age_days = verdict.age_days,
                    "dry run: would delete backup"
                );
                report.deleted.push(snapshot.name.clone());
            }
            Decision::Delete => {
                info!(
                    %instance,
                    snapshot = %snapshot.name,
                    %created_at,
                    age_days = verdict.age_days,
                    "deleting backup"
                );
                match gateway.delete_snapshot(&snapshot.name).await {
                    Ok(()) => report.deleted.push(snapshot.name.clone()),
                    Err(e) => {
                        warn!(
                            %instance,
                            snapshot = %snapshot.name,
                            error = %e,
                            "error deleting snapshot"
                        );
                        report.failures.push(Failure {
                            action: Action::Delete,
                            snapshot: snapshot.name.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    report
}
