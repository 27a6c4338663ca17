//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! minute tick that keeps per-record open/closed statuses current.

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use larder_catalog::refresh_statuses;

use crate::state::AppState;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(state: AppState) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_status_tick(&scheduler, state).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the once-a-minute status refresh (`0 * * * * *`).
///
/// Status is a pure function of the wall clock, so the tick rewrites the
/// derived fields in place for every loaded region. Query handlers run the
/// filter pipeline per request, so a refreshed status is picked up by the
/// next request without any further invalidation.
async fn register_status_tick(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let state = state.clone();

        Box::pin(async move {
            run_status_tick(&state).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_status_tick(state: &AppState) {
    let now = state.clock.now();
    let mut regions = state.regions.write().await;

    for (slug, entry) in regions.iter_mut() {
        refresh_statuses(&mut entry.records, now);
        tracing::debug!(
            region = %slug,
            open_now = larder_catalog::open_now_count(&entry.records),
            "status tick"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RegionEntry;
    use chrono::{NaiveDate, NaiveDateTime};
    use larder_catalog::{normalize_records, Clock, RawRecord, Status};
    use larder_core::{RegionConfig, RegionsFile};
    use larder_source::ConfiguredSource;
    use std::sync::Arc;

    struct SaturdayNoon;

    impl Clock for SaturdayNoon {
        fn now(&self) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2024, 1, 6)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        }
    }

    #[tokio::test]
    async fn status_tick_refreshes_loaded_regions() {
        let mut row = RawRecord::new();
        row.insert("Name".to_string(), "Weekend Kitchen".to_string());
        row.insert("Latitude".to_string(), "53.4".to_string());
        row.insert("Longitude".to_string(), "-2.9".to_string());
        row.insert("Saturday".to_string(), "Y".to_string());
        row.insert("Opening_Time".to_string(), "08:00".to_string());
        row.insert("Closing_Time".to_string(), "20:00".to_string());

        let batch = normalize_records("test_region", &[row]);
        // Seed without refreshing statuses: everything starts closed.
        let entry = RegionEntry {
            name: "Test Region".to_string(),
            boroughs: Vec::new(),
            records: batch.records,
            dropped: batch.dropped,
            loaded_at: chrono::Utc::now(),
        };

        let source = ConfiguredSource::from_regions(
            &RegionsFile {
                regions: vec![RegionConfig {
                    name: "Test Region".to_string(),
                    source: "/nonexistent/test_region.csv".to_string(),
                    notes: None,
                }],
            },
            5,
            "larder-test/0.1",
        )
        .unwrap();
        let state = crate::state::AppState::new(
            source,
            vec![("test_region".to_string(), "Test Region".to_string())],
            Arc::new(SaturdayNoon),
        );
        state
            .regions
            .write()
            .await
            .insert("test_region".to_string(), entry);

        run_status_tick(&state).await;

        let regions = state.regions.read().await;
        let records = &regions.get("test_region").unwrap().records;
        assert_eq!(records[0].status, Status::Open);
        assert!(records[0].next_opening.is_none());
    }
}
