use serenity::client::Context;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::{config, player::ChimePlayer, settings::SettingsStore};

/// Arms the hourly chime. Fires for every enabled guild at the top of each
/// hour for the lifetime of the process; missed ticks are not replayed.
pub async fn start_scheduler(
    ctx: Context,
    settings: Arc<SettingsStore>,
    player: Arc<ChimePlayer>,
) -> anyhow::Result<()> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(config::CHIME_CRON, move |_uuid, _lock| {
        let ctx = ctx.clone();
        let settings = settings.clone();
        let player = player.clone();
        Box::pin(async move {
            player.run_all(&ctx, &settings).await;
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    log::info!("hourly chime scheduler started");
    Ok(())
}
