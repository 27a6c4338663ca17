//! The stateful catalog: owns the record list and filter state for one
//! region and exposes the presenter's intent operations.
//!
//! The catalog never talks to the outside world — record acquisition and
//! position acquisition live in [`crate::service`] — so it is fully
//! testable with an injected clock and an in-memory record list.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::distance::{near_count, refresh_distances, UserPosition};
use crate::filter::{
    paginate, run_pipeline, DayFilter, FilterState, Page, QuickFilter, ServiceFilter, SortKey,
};
use crate::record::LocationRecord;
use crate::status::{open_now_count, refresh_statuses};

pub use crate::filter::PAGE_SIZE;

/// Wall-clock source, injected so status computation is testable with a
/// fixed time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The process-local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

pub struct Catalog {
    region: String,
    records: Vec<LocationRecord>,
    boroughs: Vec<String>,
    filter: FilterState,
    position: Option<UserPosition>,
    /// Set once the user explicitly picks a sort; a position fix then stops
    /// forcing the sort key back to distance.
    sort_overridden: bool,
    /// Full filtered+sorted order, retained across load-more requests.
    filtered: Vec<usize>,
    page: usize,
    clock: Arc<dyn Clock>,
}

impl Catalog {
    #[must_use]
    pub fn new(region: impl Into<String>, records: Vec<LocationRecord>, clock: Arc<dyn Clock>) -> Self {
        let mut catalog = Self {
            region: region.into(),
            records,
            boroughs: Vec::new(),
            filter: FilterState::default(),
            position: None,
            sort_overridden: false,
            filtered: Vec::new(),
            page: 1,
            clock,
        };
        catalog.adopt_records();
        catalog
    }

    /// Swap in a new dataset (region switch or reload), keeping the current
    /// filter state and position.
    pub fn set_records(&mut self, region: impl Into<String>, records: Vec<LocationRecord>) {
        self.region = region.into();
        self.records = records;
        self.adopt_records();
    }

    fn adopt_records(&mut self) {
        self.boroughs = crate::record::borough_facets(&self.records);

        refresh_statuses(&mut self.records, self.clock.now());
        if let Some(position) = self.position {
            refresh_distances(&mut self.records, position);
        }
        self.apply_change();
    }

    fn rerun(&mut self) {
        self.filtered = run_pipeline(
            &self.records,
            &self.filter,
            self.clock.now(),
            self.position.is_some(),
        );
    }

    /// A filter change always returns to page 1.
    fn apply_change(&mut self) {
        self.page = 1;
        self.rerun();
    }

    pub fn set_search(&mut self, text: &str) {
        self.filter.search = text.to_string();
        self.apply_change();
    }

    pub fn set_borough_filter(&mut self, borough: &str) {
        self.filter.borough = if borough.is_empty() || borough.eq_ignore_ascii_case("all") {
            None
        } else {
            Some(borough.to_string())
        };
        self.apply_change();
    }

    pub fn set_day_filter(&mut self, day: DayFilter) {
        self.filter.day = day;
        self.apply_change();
    }

    pub fn set_service_filter(&mut self, service: ServiceFilter) {
        self.filter.service = service;
        self.apply_change();
    }

    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        self.filter.quick = quick;
        self.apply_change();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.filter.sort = sort;
        self.sort_overridden = true;
        self.apply_change();
    }

    /// Reset every facet. Sort returns to distance when a position is known,
    /// name otherwise.
    pub fn clear_all_filters(&mut self) {
        self.filter = FilterState {
            sort: if self.position.is_some() {
                SortKey::Distance
            } else {
                SortKey::Name
            },
            ..FilterState::default()
        };
        self.sort_overridden = false;
        self.apply_change();
    }

    /// Attach an acquired position: compute distances and switch to distance
    /// sort unless the user already chose a sort themselves.
    pub fn set_position(&mut self, position: UserPosition) {
        self.position = Some(position);
        refresh_distances(&mut self.records, position);
        if !self.sort_overridden {
            self.filter.sort = SortKey::Distance;
        }
        self.apply_change();
    }

    /// Reveal the next page within the current filter state.
    pub fn load_more(&mut self) {
        if self.has_more() {
            self.page += 1;
        }
    }

    /// Minute tick: refresh statuses, and rerun the pipeline when the
    /// current view actually depends on status (the open-now quick filter
    /// or the status-urgency sort). The page is preserved — a tick is not
    /// a filter change.
    pub fn tick(&mut self) {
        refresh_statuses(&mut self.records, self.clock.now());
        if self.filter.quick == QuickFilter::OpenNow || self.filter.sort == SortKey::OpeningSoon {
            self.rerun();
        }
    }

    #[must_use]
    pub fn page_view(&self) -> Page {
        paginate(&self.records, &self.filtered, self.page)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page * PAGE_SIZE < self.filtered.len()
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn boroughs(&self) -> &[String] {
        &self.boroughs
    }

    #[must_use]
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    #[must_use]
    pub fn position(&self) -> Option<UserPosition> {
        self.position
    }

    /// Total records in the dataset, before filtering.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn open_now(&self) -> usize {
        open_now_count(&self.records)
    }

    /// Records within `within_miles` of the acquired position; zero until a
    /// fix succeeds.
    #[must_use]
    pub fn near(&self, within_miles: f64) -> usize {
        near_count(&self.records, within_miles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{test_record, Status};
    use chrono::{NaiveDate, NaiveTime};

    /// Fixed clock for deterministic status computation.
    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn saturday_ten() -> Arc<dyn Clock> {
        // Saturday 2024-01-06 10:00.
        Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2024, 1, 6)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        ))
    }

    fn manchester_weekday() -> LocationRecord {
        let mut r = test_record("Manchester Central Pantry");
        r.borough = "Manchester".to_string();
        r.open_days = [true, false, false, false, false, false, false];
        r.opening_time = NaiveTime::from_hms_opt(9, 0, 0);
        r.closing_time = NaiveTime::from_hms_opt(17, 0, 0);
        r
    }

    fn liverpool_weekend() -> LocationRecord {
        let mut r = test_record("Liverpool Weekend Kitchen");
        r.borough = "Liverpool".to_string();
        r.latitude = 53.4084;
        r.longitude = -2.9916;
        r.open_days = [false, false, false, false, false, true, true];
        r.opening_time = NaiveTime::from_hms_opt(8, 0, 0);
        r.closing_time = NaiveTime::from_hms_opt(20, 0, 0);
        r
    }

    fn catalog() -> Catalog {
        Catalog::new(
            "test",
            vec![manchester_weekday(), liverpool_weekend()],
            saturday_ten(),
        )
    }

    #[test]
    fn new_computes_statuses_and_boroughs() {
        let catalog = catalog();
        assert_eq!(catalog.boroughs(), ["Liverpool", "Manchester"]);
        assert_eq!(catalog.open_now(), 1);
        assert_eq!(catalog.total_records(), 2);
    }

    #[test]
    fn end_to_end_weekend_open_now_scenario() {
        let mut catalog = catalog();
        catalog.set_day_filter(DayFilter::Weekend);
        catalog.set_sort(SortKey::Name);
        catalog.set_quick_filter(QuickFilter::OpenNow);

        let page = catalog.page_view();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].name, "Liverpool Weekend Kitchen");
        assert_eq!(page.items[0].status, Status::Open);
    }

    #[test]
    fn filter_change_resets_page() {
        let records: Vec<LocationRecord> = (0..30)
            .map(|i| {
                let mut r = test_record(&format!("Record {i:02}"));
                r.id = format!("test_{i}");
                r
            })
            .collect();
        let mut catalog = Catalog::new("test", records, saturday_ten());

        catalog.load_more();
        assert_eq!(catalog.page_view().items.len(), 24);

        catalog.set_search("record");
        assert_eq!(catalog.page_view().items.len(), PAGE_SIZE);
    }

    #[test]
    fn load_more_is_monotonic_and_bounded() {
        let records: Vec<LocationRecord> = (0..30)
            .map(|i| test_record(&format!("Record {i:02}")))
            .collect();
        let mut catalog = Catalog::new("test", records, saturday_ten());

        let mut previous = catalog.page_view().items.len();
        for _ in 0..10 {
            catalog.load_more();
            let visible = catalog.page_view().items.len();
            assert!(visible >= previous);
            previous = visible;
        }
        assert_eq!(previous, 30);
        assert!(!catalog.has_more());
    }

    #[test]
    fn set_position_forces_distance_sort() {
        let mut catalog = catalog();
        catalog.set_position(UserPosition {
            latitude: 53.4084,
            longitude: -2.9916,
        });
        assert_eq!(catalog.filter().sort, SortKey::Distance);
        // Liverpool record is at the fix; it sorts first.
        assert_eq!(
            catalog.page_view().items[0].name,
            "Liverpool Weekend Kitchen"
        );
        assert_eq!(catalog.near(5.0), 1);
    }

    #[test]
    fn set_position_respects_user_sort_override() {
        let mut catalog = catalog();
        catalog.set_sort(SortKey::Borough);
        catalog.set_position(UserPosition {
            latitude: 53.4084,
            longitude: -2.9916,
        });
        assert_eq!(catalog.filter().sort, SortKey::Borough);
    }

    #[test]
    fn clear_all_filters_picks_sort_by_position() {
        let mut catalog = catalog();
        catalog.set_quick_filter(QuickFilter::OpenNow);
        catalog.clear_all_filters();
        assert_eq!(catalog.filter().quick, QuickFilter::All);
        assert_eq!(catalog.filter().sort, SortKey::Name);

        catalog.set_position(UserPosition {
            latitude: 53.48,
            longitude: -2.24,
        });
        catalog.clear_all_filters();
        assert_eq!(catalog.filter().sort, SortKey::Distance);
    }

    /// Clock whose time can be advanced mid-test.
    struct SteppingClock(std::sync::Mutex<NaiveDateTime>);

    impl Clock for SteppingClock {
        fn now(&self) -> NaiveDateTime {
            *self.0.lock().unwrap()
        }
    }

    fn saturday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 6)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn tick_reruns_pipeline_for_open_now_filter() {
        // 19:59 Saturday: Liverpool record is open until 20:00.
        let clock = Arc::new(SteppingClock(std::sync::Mutex::new(saturday_at(19, 59))));
        let mut catalog = Catalog::new(
            "test",
            vec![liverpool_weekend()],
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        catalog.set_quick_filter(QuickFilter::OpenNow);
        assert_eq!(catalog.page_view().total_count, 1);

        // The minute passes; the record closes and must leave the filtered set.
        *clock.0.lock().unwrap() = saturday_at(20, 0);
        catalog.tick();
        assert_eq!(catalog.page_view().total_count, 0);
    }

    #[test]
    fn tick_reorders_status_urgency_sort() {
        let clock = Arc::new(SteppingClock(std::sync::Mutex::new(saturday_at(7, 0))));
        // Opens 08:00: opening-soon at 07:00, open at 08:00.
        let kitchen = liverpool_weekend();
        let mut catalog = Catalog::new(
            "test",
            vec![kitchen],
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        catalog.set_sort(SortKey::OpeningSoon);
        assert_eq!(catalog.page_view().items[0].status, Status::OpeningSoon);

        *clock.0.lock().unwrap() = saturday_at(8, 0);
        catalog.tick();
        assert_eq!(catalog.page_view().items[0].status, Status::Open);
    }

    #[test]
    fn set_records_keeps_filter_state() {
        let mut catalog = catalog();
        catalog.set_search("kitchen");
        catalog.set_records("other", vec![liverpool_weekend()]);
        assert_eq!(catalog.filter().search, "kitchen");
        assert_eq!(catalog.region(), "other");
        assert_eq!(catalog.page_view().total_count, 1);
    }
}
