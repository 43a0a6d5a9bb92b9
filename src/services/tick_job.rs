use crate::error::{Error, Result};
use crate::services::drip_scheduler::DripScheduler;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

/// Registers the drip tick on `cron` and starts the scheduler. The returned
/// handle must stay alive for the ticks to keep firing.
pub async fn start_tick_job(scheduler: Arc<DripScheduler>, cron: &str) -> Result<JobScheduler> {
    let jobs = JobScheduler::new().await.map_err(job_error)?;

    let job = Job::new_async(cron, move |_id, _lock| {
        let scheduler = scheduler.clone();
        Box::pin(async move {
            let report = scheduler.tick().await;
            if report.errors > 0 {
                error!(errors = report.errors, "Drip tick finished with errors");
            }
        })
    })
    .map_err(job_error)?;

    jobs.add(job).await.map_err(job_error)?;
    jobs.start().await.map_err(job_error)?;
    info!(cron, "Drip tick job scheduled");
    Ok(jobs)
}

fn job_error(e: JobSchedulerError) -> Error {
    Error::Internal(format!("Job scheduler error: {:?}", e))
}
