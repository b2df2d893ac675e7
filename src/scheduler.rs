use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::MaintenanceConfig;
use crate::db::Store;
use crate::services::{ImageService, SweepReport};

/// Removes image files that no game references.
pub async fn sweep_orphan_images(
    store: &Store,
    images: &ImageService,
    grace: Duration,
) -> Result<SweepReport> {
    let referenced: HashSet<String> = store.game_image_sources().await?.into_iter().collect();
    let report = images.sweep_orphans(&referenced, grace).await?;

    metrics::counter!("store_orphan_images_removed_total").increment(report.removed as u64);
    Ok(report)
}

pub struct Scheduler {
    store: Store,
    images: ImageService,
    config: MaintenanceConfig,
}

impl Scheduler {
    #[must_use]
    pub const fn new(store: Store, images: ImageService, config: MaintenanceConfig) -> Self {
        Self {
            store,
            images,
            config,
        }
    }

    /// Registers the maintenance jobs. `None` when maintenance is disabled.
    pub async fn start(self) -> Result<Option<JobScheduler>> {
        if !self.config.orphan_sweep_enabled {
            info!("Orphan image sweep is disabled in config");
            return Ok(None);
        }

        let sched = JobScheduler::new().await?;
        let grace = Duration::from_secs(self.config.orphan_grace_minutes * 60);
        let store = self.store;
        let images = self.images;

        let job = Job::new_async(self.config.orphan_sweep_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            let images = images.clone();
            Box::pin(async move {
                match sweep_orphan_images(&store, &images, grace).await {
                    Ok(report) => info!(
                        scanned = report.scanned,
                        removed = report.removed,
                        "Orphan image sweep finished"
                    ),
                    Err(e) => error!("Orphan image sweep failed: {e:#}"),
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            "Maintenance scheduler running with cron: {}",
            self.config.orphan_sweep_cron
        );
        Ok(Some(sched))
    }
}
