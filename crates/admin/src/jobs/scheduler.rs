//! Cron scheduler for recurring automation.
//!
//! - the compliance sweep on `AUTOMATION_CRON`, one job per installed shop
//! - a daily prune of dismissed notifications

use chrono::{TimeDelta, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler, JobSchedulerError};

use super::{Job, JobQueue};
use crate::db::{NotificationRepository, SessionRepository};

/// Daily at 03:30 UTC.
const PRUNE_CRON: &str = "0 30 3 * * *";

/// Dismissed notifications older than this are deleted.
const NOTIFICATION_RETENTION_DAYS: i64 = 30;

/// Build and start the scheduler.
///
/// The returned handle must be kept alive; dropping it stops all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot start.
pub async fn build_scheduler(
    pool: PgPool,
    compliance_cron: &str,
    queue: JobQueue,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_compliance_job(&scheduler, compliance_cron, pool.clone(), queue).await?;
    register_prune_job(&scheduler, pool).await?;

    scheduler.start().await?;
    tracing::info!(cron = compliance_cron, "Scheduler started");
    Ok(scheduler)
}

async fn register_compliance_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    queue: JobQueue,
) -> Result<(), JobSchedulerError> {
    let job = CronJob::new_async(cron, move |_uuid, _lock| {
        let pool = pool.clone();
        let queue = queue.clone();

        Box::pin(async move {
            let enqueued = enqueue_compliance_checks(&pool, &queue).await;
            tracing::info!(enqueued, "scheduler: compliance checks enqueued");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Enqueue one compliance check per installed shop; returns how many were
/// queued.
pub async fn enqueue_compliance_checks(pool: &PgPool, queue: &JobQueue) -> usize {
    let shops = match SessionRepository::new(pool).list_shops().await {
        Ok(shops) => shops,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to list shops");
            return 0;
        }
    };

    let mut enqueued = 0;
    for shop in shops {
        match queue.enqueue(Job::CheckCompliance { shop: shop.clone() }) {
            Ok(()) => enqueued += 1,
            Err(e) => tracing::warn!(shop = %shop, error = %e, "scheduler: enqueue failed"),
        }
    }
    enqueued
}

async fn register_prune_job(scheduler: &JobScheduler, pool: PgPool) -> Result<(), JobSchedulerError> {
    let job = CronJob::new_async(PRUNE_CRON, move |_uuid, _lock| {
        let pool = pool.clone();

        Box::pin(async move {
            let cutoff = Utc::now() - TimeDelta::days(NOTIFICATION_RETENTION_DAYS);
            match NotificationRepository::new(&pool).prune_shown(cutoff).await {
                Ok(deleted) => tracing::info!(deleted, "scheduler: pruned notifications"),
                Err(e) => tracing::error!(error = %e, "scheduler: notification prune failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
