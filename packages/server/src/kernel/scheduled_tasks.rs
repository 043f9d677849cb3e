//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! One cron job drives article generation at the admin-configured
//! time-of-day. Settings changes re-register the job.

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domains::blog;
use crate::kernel::ServerDeps;

/// Handle over the running scheduler; `apply_settings` swaps the cron job
/// after an admin edit.
pub struct GenerationScheduler {
    scheduler: JobScheduler,
    job_id: Mutex<Option<Uuid>>,
}

impl GenerationScheduler {
    /// Start the scheduler and register the generation job from current
    /// settings.
    pub async fn start(deps: ServerDeps) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;

        let this = Self {
            scheduler,
            job_id: Mutex::new(None),
        };
        this.apply_settings(&deps).await?;

        tracing::info!("generation scheduler started");
        Ok(this)
    }

    /// Re-register the cron job to match the current settings.
    pub async fn apply_settings(&self, deps: &ServerDeps) -> Result<()> {
        let settings = deps.scheduler_settings.read().await.clone();

        let mut guard = self.job_id.lock().await;
        if let Some(old) = guard.take() {
            let _ = self.scheduler.remove(&old).await;
        }

        if !settings.enabled {
            tracing::info!("generation schedule disabled");
            return Ok(());
        }

        // Six-field cron: sec min hour dom month dow.
        let schedule = format!("0 {} {} * * *", settings.cron_minute, settings.cron_hour);
        let job_deps = deps.clone();

        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let deps = job_deps.clone();
            Box::pin(async move {
                match blog::run_scheduled_generation(&deps).await {
                    Ok(reports) => {
                        tracing::info!(generated = reports.len(), "scheduled generation tick done")
                    }
                    Err(e) => tracing::error!(error = %e, "scheduled generation tick failed"),
                }
            })
        })?;

        let id = self.scheduler.add(job).await?;
        *guard = Some(id);

        tracing::info!(
            hour = settings.cron_hour,
            minute = settings.cron_minute,
            posts_per_day = settings.posts_per_day,
            "generation schedule registered"
        );
        Ok(())
    }
}
