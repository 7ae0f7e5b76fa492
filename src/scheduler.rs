use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, instrument, warn};

use crate::services::{ObservationService, SavePolicy};

/// Tick period for an interval in minutes, saturating on overflow and never
/// shorter than one minute
pub fn tick_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.max(1).saturating_mul(60))
}

#[instrument(skip(service), fields(interval_minutes = %interval_minutes))]
pub async fn start_scrape_scheduler(
    service: ObservationService,
    interval_minutes: u64,
    policy: SavePolicy,
) {
    let mut interval = time::interval(tick_period(interval_minutes));
    // A cycle can outlast the tick when stations are slow
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    info!(
        "Scrape scheduler started with {} minute interval ({:?} save policy)",
        interval_minutes, policy
    );

    loop {
        interval.tick().await;
        debug!("Scheduler tick - initiating scrape cycle");

        match service.scrape_and_store(policy).await {
            Ok(summary) => {
                if summary.aligned_rows == 0 {
                    warn!("Scrape cycle produced no rows");
                } else if summary.records_saved() > 0 {
                    info!(
                        "Stored {} records ({} placeholders, {} stale skipped)",
                        summary.records_saved(),
                        summary.placeholders_saved,
                        summary.skipped_stale
                    );
                } else {
                    debug!("No new records to store");
                }
            }
            Err(e) => {
                error!("Failed to scrape and store observations: {}", e);
            }
        }
    }
}
