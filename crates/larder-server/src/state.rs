//! Shared server state: one in-memory dataset per configured region.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use larder_catalog::{
    borough_facets, normalize_records, refresh_statuses, CatalogError, Clock, LocationRecord,
    RecordSource,
};
use larder_source::ConfiguredSource;

/// One loaded region dataset. Statuses on the records are refreshed by the
/// minute scheduler and on (re)load.
pub struct RegionEntry {
    pub name: String,
    pub records: Vec<LocationRecord>,
    pub boroughs: Vec<String>,
    pub dropped: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub regions: Arc<RwLock<HashMap<String, RegionEntry>>>,
    pub source: Arc<ConfiguredSource>,
    /// `(slug, display name)` pairs in configuration order.
    pub configured: Arc<Vec<(String, String)>>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        source: ConfiguredSource,
        configured: Vec<(String, String)>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            regions: Arc::new(RwLock::new(HashMap::new())),
            source: Arc::new(source),
            configured: Arc::new(configured),
            clock,
        }
    }

    /// Display name for a configured region slug.
    #[must_use]
    pub fn region_name(&self, slug: &str) -> Option<&str> {
        self.configured
            .iter()
            .find(|(s, _)| s == slug)
            .map(|(_, name)| name.as_str())
    }
}

/// Fetch, normalize, and swap in one region's dataset.
///
/// The swap is atomic from the readers' point of view: on any failure the
/// previous entry stays untouched.
///
/// # Errors
///
/// Returns [`CatalogError`] when the fetch fails; normalization itself
/// cannot fail (invalid rows are dropped and counted).
pub async fn load_region(
    state: &AppState,
    slug: &str,
    name: &str,
) -> Result<(usize, usize), CatalogError> {
    let rows = RecordSource::fetch(state.source.as_ref(), slug).await?;
    let batch = normalize_records(slug, &rows);

    let mut records = batch.records;
    refresh_statuses(&mut records, state.clock.now());
    let adopted = records.len();
    let entry = RegionEntry {
        name: name.to_string(),
        boroughs: borough_facets(&records),
        records,
        dropped: batch.dropped,
        loaded_at: Utc::now(),
    };

    state.regions.write().await.insert(slug.to_string(), entry);
    tracing::info!(region = slug, adopted, dropped = batch.dropped, "region dataset loaded");
    Ok((adopted, batch.dropped))
}
