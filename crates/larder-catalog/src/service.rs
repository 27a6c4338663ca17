//! Orchestration around the [`Catalog`]: dataset acquisition, position
//! acquisition, the minute tick, and presenter notification.
//!
//! Everything runs on one logical thread of control. The only suspension
//! points are the record-source fetch and the position request; both are
//! guarded — loads by a monotonically increasing sequence number
//! (last-request-wins, stale responses discarded), positions by a timeout
//! and a staleness window.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::catalog::{Catalog, Clock};
use crate::distance::UserPosition;
use crate::error::{CatalogError, PositionError};
use crate::filter::{DayFilter, Page, QuickFilter, ServiceFilter, SortKey};
use crate::normalize::{normalize_records, RawRecord};
use crate::record::LocationRecord;

/// Suggested display duration for transient (auto-dismissing) messages.
pub const TRANSIENT_MESSAGE_SECS: u64 = 5;

/// Supplies raw rows for a region. Fetching is asynchronous (network or
/// disk); implementations live outside this crate.
pub trait RecordSource: Send + Sync {
    fn fetch(
        &self,
        region: &str,
    ) -> impl Future<Output = Result<Vec<RawRecord>, CatalogError>> + Send;
}

/// Supplies the user coordinate, at most once per acquisition.
pub trait PositionProvider: Send + Sync {
    fn request(&self) -> impl Future<Output = Result<UserPosition, PositionError>> + Send;
}

/// Consumes rendered pages and user-facing error surfaces. The presenter
/// never mutates catalog state directly — it dispatches intents back to
/// the service.
pub trait Presenter: Send {
    fn render(&mut self, page: &Page);

    /// A transient, auto-dismissing message (position failures). Filtering
    /// continues in degraded mode; see [`TRANSIENT_MESSAGE_SECS`].
    fn show_transient_error(&mut self, message: &str);

    /// A full-panel load failure with a retry affordance. The previous
    /// dataset, if any, is still intact.
    fn show_load_error(&mut self, region: &str, message: &str);
}

/// Handle for an in-flight dataset load. Completing a ticket that has been
/// superseded by a newer load is a silent no-op.
#[derive(Debug)]
pub struct LoadTicket {
    seq: u64,
    region: String,
}

impl LoadTicket {
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Timeout and staleness policy for position acquisition.
#[derive(Debug, Clone, Copy)]
pub struct PositionPolicy {
    pub timeout: Duration,
    /// A fix younger than this is reused without a fresh request.
    pub max_age: Duration,
}

impl Default for PositionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_age: Duration::from_secs(300),
        }
    }
}

pub struct CatalogService<S, P, R> {
    source: S,
    positions: P,
    presenter: R,
    clock: Arc<dyn Clock>,
    policy: PositionPolicy,
    catalog: Option<Catalog>,
    /// Normalized datasets by region; re-switching never re-fetches.
    cache: HashMap<String, Vec<LocationRecord>>,
    load_seq: u64,
    last_fix: Option<(UserPosition, Instant)>,
}

impl<S, P, R> CatalogService<S, P, R>
where
    S: RecordSource,
    P: PositionProvider,
    R: Presenter,
{
    pub fn new(
        source: S,
        positions: P,
        presenter: R,
        clock: Arc<dyn Clock>,
        policy: PositionPolicy,
    ) -> Self {
        Self {
            source,
            positions,
            presenter,
            clock,
            policy,
            catalog: None,
            cache: HashMap::new(),
            load_seq: 0,
            last_fix: None,
        }
    }

    /// Switch to a region: serve from the in-memory cache when possible,
    /// otherwise fetch, normalize, and swap.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Load`] when the fetch fails; the previously
    /// active dataset remains visible.
    pub async fn switch_region(&mut self, region: &str) -> Result<(), CatalogError> {
        let Some(ticket) = self.begin_region_switch(region) else {
            return Ok(());
        };
        let result = self.source.fetch(region).await;
        self.complete_region_switch(ticket, result)
    }

    /// First half of a region switch. Returns `None` when the region was
    /// served from cache (no fetch needed); otherwise the caller fetches and
    /// passes the outcome to [`Self::complete_region_switch`].
    pub fn begin_region_switch(&mut self, region: &str) -> Option<LoadTicket> {
        if let Some(records) = self.cache.get(region).cloned() {
            tracing::debug!(region, "region served from cache");
            self.install(region, records);
            return None;
        }
        self.load_seq += 1;
        Some(LoadTicket {
            seq: self.load_seq,
            region: region.to_string(),
        })
    }

    /// Second half of a region switch: adopt the fetch outcome unless a
    /// newer load superseded this one.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error after surfacing it to the presenter.
    pub fn complete_region_switch(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<RawRecord>, CatalogError>,
    ) -> Result<(), CatalogError> {
        if ticket.seq != self.load_seq {
            tracing::debug!(region = %ticket.region, "discarding stale dataset load");
            return Ok(());
        }
        match result {
            Ok(rows) => {
                let batch = normalize_records(&ticket.region, &rows);
                tracing::info!(
                    region = %ticket.region,
                    adopted = batch.records.len(),
                    dropped = batch.dropped,
                    "dataset loaded"
                );
                self.cache
                    .insert(ticket.region.clone(), batch.records.clone());
                self.install(&ticket.region, batch.records);
                Ok(())
            }
            Err(e) => {
                tracing::error!(region = %ticket.region, error = %e, "dataset load failed");
                self.presenter.show_load_error(&ticket.region, &e.to_string());
                Err(e)
            }
        }
    }

    fn install(&mut self, region: &str, records: Vec<LocationRecord>) {
        match &mut self.catalog {
            Some(catalog) => catalog.set_records(region, records),
            None => {
                self.catalog = Some(Catalog::new(region, records, Arc::clone(&self.clock)));
            }
        }
        self.render();
    }

    /// Acquire the user position: a recent fix is reused, otherwise a fresh
    /// request runs under the policy timeout. Failures surface as a
    /// transient message and leave sort/filter state untouched.
    pub async fn request_position(&mut self) {
        if let Some((position, at)) = self.last_fix {
            if at.elapsed() <= self.policy.max_age {
                tracing::debug!("reusing recent position fix");
                self.apply_position(position);
                return;
            }
        }

        let outcome = tokio::time::timeout(self.policy.timeout, self.positions.request()).await;
        match outcome {
            Ok(Ok(position)) => {
                self.last_fix = Some((position, Instant::now()));
                self.apply_position(position);
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "position request failed");
                self.presenter.show_transient_error(&e.to_string());
            }
            Err(_) => {
                tracing::warn!("position request timed out");
                self.presenter
                    .show_transient_error(&PositionError::Timeout.to_string());
            }
        }
    }

    fn apply_position(&mut self, position: UserPosition) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_position(position);
        }
        self.render();
    }

    /// Minute tick: refresh statuses and re-render when anything is visible.
    pub fn tick(&mut self) {
        let Some(catalog) = &mut self.catalog else {
            return;
        };
        catalog.tick();
        let page = catalog.page_view();
        if !page.items.is_empty() {
            self.presenter.render(&page);
        }
    }

    pub fn set_search(&mut self, text: &str) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_search(text);
        }
        self.render();
    }

    pub fn set_borough_filter(&mut self, borough: &str) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_borough_filter(borough);
        }
        self.render();
    }

    pub fn set_day_filter(&mut self, day: DayFilter) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_day_filter(day);
        }
        self.render();
    }

    pub fn set_service_filter(&mut self, service: ServiceFilter) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_service_filter(service);
        }
        self.render();
    }

    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_quick_filter(quick);
        }
        self.render();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if let Some(catalog) = &mut self.catalog {
            catalog.set_sort(sort);
        }
        self.render();
    }

    pub fn clear_all_filters(&mut self) {
        if let Some(catalog) = &mut self.catalog {
            catalog.clear_all_filters();
        }
        self.render();
    }

    pub fn load_more(&mut self) {
        if let Some(catalog) = &mut self.catalog {
            catalog.load_more();
        }
        self.render();
    }

    #[must_use]
    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    fn render(&mut self) {
        if let Some(catalog) = &self.catalog {
            self.presenter.render(&catalog.page_view());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SystemClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source that counts fetches per region.
    struct MapSource {
        rows: HashMap<String, Vec<RawRecord>>,
        fetches: AtomicUsize,
    }

    impl MapSource {
        fn new(rows: HashMap<String, Vec<RawRecord>>) -> Self {
            Self {
                rows,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl RecordSource for MapSource {
        async fn fetch(&self, region: &str) -> Result<Vec<RawRecord>, CatalogError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.rows
                .get(region)
                .cloned()
                .ok_or_else(|| CatalogError::UnknownRegion(region.to_string()))
        }
    }

    struct FixedProvider(UserPosition);

    impl PositionProvider for FixedProvider {
        async fn request(&self) -> Result<UserPosition, PositionError> {
            Ok(self.0)
        }
    }

    /// Provider whose request never resolves; exercises the timeout path.
    struct StalledProvider;

    impl PositionProvider for StalledProvider {
        fn request(
            &self,
        ) -> impl Future<Output = Result<UserPosition, PositionError>> + Send {
            std::future::pending()
        }
    }

    struct DeniedProvider;

    impl PositionProvider for DeniedProvider {
        async fn request(&self) -> Result<UserPosition, PositionError> {
            Err(PositionError::PermissionDenied)
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        pages: Vec<Page>,
        transient: Vec<String>,
        load_errors: Vec<(String, String)>,
    }

    impl Presenter for RecordingPresenter {
        fn render(&mut self, page: &Page) {
            self.pages.push(page.clone());
        }

        fn show_transient_error(&mut self, message: &str) {
            self.transient.push(message.to_string());
        }

        fn show_load_error(&mut self, region: &str, message: &str) {
            self.load_errors.push((region.to_string(), message.to_string()));
        }
    }

    fn raw_row(name: &str, lat: &str, lng: &str) -> RawRecord {
        let mut row = RawRecord::new();
        row.insert("Name".to_string(), name.to_string());
        row.insert("Latitude".to_string(), lat.to_string());
        row.insert("Longitude".to_string(), lng.to_string());
        row
    }

    fn two_region_source() -> MapSource {
        let mut rows = HashMap::new();
        rows.insert(
            "greater_manchester".to_string(),
            vec![raw_row("Ancoats Pantry", "53.484", "-2.227")],
        );
        rows.insert(
            "liverpool".to_string(),
            vec![
                raw_row("Anfield Larder", "53.431", "-2.961"),
                raw_row("Toxteth Table", "53.390", "-2.963"),
            ],
        );
        MapSource::new(rows)
    }

    fn service(
        source: MapSource,
    ) -> CatalogService<MapSource, FixedProvider, RecordingPresenter> {
        CatalogService::new(
            source,
            FixedProvider(UserPosition {
                latitude: 53.48,
                longitude: -2.24,
            }),
            RecordingPresenter::default(),
            Arc::new(SystemClock),
            PositionPolicy::default(),
        )
    }

    struct FixedClock(chrono::NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> chrono::NaiveDateTime {
            self.0
        }
    }

    #[tokio::test]
    async fn end_to_end_load_filter_sort_scenario() {
        // Saturday 2024-01-06 10:00.
        let saturday = chrono::NaiveDate::from_ymd_opt(2024, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();

        let mut a = raw_row("Manchester Central Pantry", "53.480", "-2.242");
        a.insert("Borough".to_string(), "Manchester".to_string());
        a.insert("Monday".to_string(), "Y".to_string());
        a.insert("Opening_Time".to_string(), "09:00".to_string());
        a.insert("Closing_Time".to_string(), "17:00".to_string());

        let mut b = raw_row("Liverpool Weekend Kitchen", "53.408", "-2.991");
        b.insert("Borough".to_string(), "Liverpool".to_string());
        b.insert("Saturday".to_string(), "Y".to_string());
        b.insert("Sunday".to_string(), "Y".to_string());
        b.insert("Opening_Time".to_string(), "08:00".to_string());
        b.insert("Closing_Time".to_string(), "20:00".to_string());

        // Invalid: no latitude. Must be dropped at load.
        let mut c = RawRecord::new();
        c.insert("Name".to_string(), "Lost Larder".to_string());
        c.insert("Longitude".to_string(), "-2.5".to_string());

        let mut rows = HashMap::new();
        rows.insert("north_west".to_string(), vec![a, b, c]);

        let mut svc = CatalogService::new(
            MapSource::new(rows),
            FixedProvider(UserPosition {
                latitude: 53.48,
                longitude: -2.24,
            }),
            RecordingPresenter::default(),
            Arc::new(FixedClock(saturday)),
            PositionPolicy::default(),
        );

        svc.switch_region("north_west").await.unwrap();
        assert_eq!(svc.catalog().unwrap().total_records(), 2);

        svc.set_day_filter(DayFilter::Weekend);
        svc.set_sort(SortKey::Name);
        svc.set_quick_filter(QuickFilter::OpenNow);

        let page = svc.catalog().unwrap().page_view();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "Liverpool Weekend Kitchen");
        assert_eq!(page.items[0].status, crate::record::Status::Open);
    }

    #[tokio::test]
    async fn switch_region_loads_and_renders() {
        let mut svc = service(two_region_source());
        svc.switch_region("liverpool").await.unwrap();

        let catalog = svc.catalog().unwrap();
        assert_eq!(catalog.region(), "liverpool");
        assert_eq!(catalog.total_records(), 2);
        assert_eq!(svc.presenter.pages.len(), 1);
    }

    #[tokio::test]
    async fn re_switching_serves_from_cache() {
        let mut svc = service(two_region_source());
        svc.switch_region("liverpool").await.unwrap();
        svc.switch_region("greater_manchester").await.unwrap();
        svc.switch_region("liverpool").await.unwrap();

        assert_eq!(svc.source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(svc.catalog().unwrap().region(), "liverpool");
    }

    #[tokio::test]
    async fn load_failure_keeps_previous_dataset() {
        let mut svc = service(two_region_source());
        svc.switch_region("liverpool").await.unwrap();

        let err = svc.switch_region("atlantis").await.unwrap_err();
        assert!(matches!(err, CatalogError::UnknownRegion(_)));

        // Previous dataset fully intact, failure surfaced with the region.
        let catalog = svc.catalog().unwrap();
        assert_eq!(catalog.region(), "liverpool");
        assert_eq!(catalog.total_records(), 2);
        let errors = &svc.presenter.load_errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "atlantis");
    }

    #[tokio::test]
    async fn stale_load_response_is_discarded() {
        let mut svc = service(two_region_source());

        // First load begins, then a second one supersedes it before the
        // first response arrives.
        let first = svc.begin_region_switch("greater_manchester").unwrap();
        let second = svc.begin_region_switch("liverpool").unwrap();

        let liverpool_rows = svc.source.fetch("liverpool").await.unwrap();
        svc.complete_region_switch(second, Ok(liverpool_rows))
            .unwrap();
        assert_eq!(svc.catalog().unwrap().region(), "liverpool");

        let gm_rows = svc.source.fetch("greater_manchester").await.unwrap();
        svc.complete_region_switch(first, Ok(gm_rows)).unwrap();

        // The late response for the superseded request must not win.
        assert_eq!(svc.catalog().unwrap().region(), "liverpool");
    }

    #[tokio::test]
    async fn position_applies_after_filter_changes() {
        let mut svc = service(two_region_source());
        svc.switch_region("liverpool").await.unwrap();
        svc.set_search("larder");
        svc.request_position().await;

        let page = svc.catalog().unwrap().page_view();
        assert_eq!(page.total_count, 1);
        assert!(page.items[0].distance_miles.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn position_timeout_surfaces_transient_error() {
        let mut svc = CatalogService::new(
            two_region_source(),
            StalledProvider,
            RecordingPresenter::default(),
            Arc::new(SystemClock),
            PositionPolicy::default(),
        );
        svc.switch_region("liverpool").await.unwrap();
        let sort_before = svc.catalog().unwrap().filter().sort;

        svc.request_position().await;

        let transient = svc.presenter.transient.clone();
        assert_eq!(transient, vec!["Location request timed out."]);
        assert_eq!(svc.catalog().unwrap().filter().sort, sort_before);
    }

    #[tokio::test]
    async fn position_denied_leaves_filters_untouched() {
        let mut svc = CatalogService::new(
            two_region_source(),
            DeniedProvider,
            RecordingPresenter::default(),
            Arc::new(SystemClock),
            PositionPolicy::default(),
        );
        svc.switch_region("liverpool").await.unwrap();
        svc.request_position().await;

        let transient = svc.presenter.transient.clone();
        assert_eq!(
            transient,
            vec!["Location access denied. Please enable location services."]
        );
        assert!(svc.catalog().unwrap().position().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn recent_fix_is_reused_without_new_request() {
        struct CountingProvider(AtomicUsize);

        impl PositionProvider for CountingProvider {
            async fn request(&self) -> Result<UserPosition, PositionError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(UserPosition {
                    latitude: 53.48,
                    longitude: -2.24,
                })
            }
        }

        let mut svc = CatalogService::new(
            two_region_source(),
            CountingProvider(AtomicUsize::new(0)),
            RecordingPresenter::default(),
            Arc::new(SystemClock),
            PositionPolicy::default(),
        );
        svc.switch_region("liverpool").await.unwrap();

        svc.request_position().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        svc.request_position().await;
        assert_eq!(svc.positions.0.load(Ordering::SeqCst), 1);

        // Past the staleness window a fresh request is issued.
        tokio::time::advance(Duration::from_secs(301)).await;
        svc.request_position().await;
        assert_eq!(svc.positions.0.load(Ordering::SeqCst), 2);
    }
}
