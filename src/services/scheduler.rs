use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::error::{Error, Result};
use crate::services::review_service::ReviewService;
use crate::services::user_service::UserService;

pub const PUBLISH_REVIEWS_SCHEDULE: &str = "0 * * * * *";
pub const CLEAN_LINK_TOKENS_SCHEDULE: &str = "0 0 * * * *";

fn scheduler_error(err: JobSchedulerError) -> Error {
    Error::Internal(format!("scheduler error: {:?}", err))
}

/// Starts the background jobs. The returned scheduler must be kept alive.
pub async fn start(reviews: ReviewService, users: UserService) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

    let publish = Job::new_async(PUBLISH_REVIEWS_SCHEDULE, move |_id, _scheduler| {
        let reviews = reviews.clone();
        Box::pin(async move {
            if let Err(err) = reviews.publish_due().await {
                tracing::error!(error = ?err, "review publication job failed");
            }
        })
    })
    .map_err(scheduler_error)?;
    scheduler.add(publish).await.map_err(scheduler_error)?;

    let cleanup = Job::new_async(CLEAN_LINK_TOKENS_SCHEDULE, move |_id, _scheduler| {
        let users = users.clone();
        Box::pin(async move {
            match users.delete_expired_link_tokens().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "expired Telegram link tokens removed"),
                Err(err) => tracing::error!(error = ?err, "link token cleanup failed"),
            }
        })
    })
    .map_err(scheduler_error)?;
    scheduler.add(cleanup).await.map_err(scheduler_error)?;

    scheduler.start().await.map_err(scheduler_error)?;
    tracing::info!("background jobs scheduled");
    Ok(scheduler)
}
