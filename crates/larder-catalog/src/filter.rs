//! The filter → sort → paginate pipeline.
//!
//! Executed in a fixed order whenever the filter state, dataset, or user
//! position changes. Filtering returns indices into the record slice so the
//! catalog can retain the full ordered result while paging out a prefix.
//!
//! All string-to-enum parsers map unrecognized tokens onto the all-pass
//! default rather than erroring — stale UI state must degrade to a no-op.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDateTime};
use serde::Serialize;

use crate::record::{AccessType, DisplayRecord, LocationRecord, Status};

/// Records shown per page.
pub const PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DayFilter {
    #[default]
    All,
    Today,
    Tomorrow,
    Weekday,
    Weekend,
}

impl DayFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "today" => DayFilter::Today,
            "tomorrow" => DayFilter::Tomorrow,
            "weekday" => DayFilter::Weekday,
            "weekend" => DayFilter::Weekend,
            _ => DayFilter::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceFilter {
    #[default]
    All,
    FoodParcels,
    Meals,
    Delivery,
    Clothing,
    Furniture,
    Utilities,
}

impl ServiceFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "foodbank" | "food-parcels" => ServiceFilter::FoodParcels,
            "meals" => ServiceFilter::Meals,
            "delivery" => ServiceFilter::Delivery,
            "clothing" => ServiceFilter::Clothing,
            "furniture" => ServiceFilter::Furniture,
            "utilities" => ServiceFilter::Utilities,
            _ => ServiceFilter::All,
        }
    }

    #[must_use]
    pub fn matches(self, record: &LocationRecord) -> bool {
        match self {
            ServiceFilter::All => true,
            ServiceFilter::FoodParcels => record.food_parcels,
            ServiceFilter::Meals => record.community_meals,
            ServiceFilter::Delivery => record.delivery,
            ServiceFilter::Clothing => record.clothing,
            ServiceFilter::Furniture => record.furniture,
            ServiceFilter::Utilities => record.utilities,
        }
    }
}

/// Named composite predicates bundling common use-cases, distinct from the
/// raw facet filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum QuickFilter {
    #[default]
    All,
    OpenNow,
    FreeOnly,
    WalkIn,
    Delivery,
}

impl QuickFilter {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "open-now" => QuickFilter::OpenNow,
            "free-only" => QuickFilter::FreeOnly,
            "walk-in" => QuickFilter::WalkIn,
            "delivery" => QuickFilter::Delivery,
            _ => QuickFilter::All,
        }
    }

    #[must_use]
    pub fn matches(self, record: &LocationRecord) -> bool {
        match self {
            QuickFilter::All => true,
            QuickFilter::OpenNow => record.status == Status::Open,
            QuickFilter::FreeOnly => record.cost.to_lowercase().contains("free"),
            // Referral-only is the only access type excluded.
            QuickFilter::WalkIn => record.access != AccessType::ReferralOnly,
            QuickFilter::Delivery => record.delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Distance,
    Name,
    OpeningSoon,
    Borough,
}

impl SortKey {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "name" => SortKey::Name,
            "opening-soon" => SortKey::OpeningSoon,
            "borough" => SortKey::Borough,
            _ => SortKey::Distance,
        }
    }
}

/// Current view parameters, owned by the catalog and mutated only through
/// its intent methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    /// `None` means "all boroughs".
    pub borough: Option<String>,
    pub day: DayFilter,
    pub service: ServiceFilter,
    pub quick: QuickFilter,
    pub sort: SortKey,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            borough: None,
            day: DayFilter::All,
            service: ServiceFilter::All,
            quick: QuickFilter::All,
            sort: SortKey::Distance,
        }
    }
}

/// One page of results for the presenter.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<DisplayRecord>,
    pub has_more: bool,
    pub total_count: usize,
}

/// Run the full filter + sort pipeline, returning record indices in
/// display order.
///
/// `has_position` controls the distance sort: without a position it falls
/// back to name order, and records lacking a computed distance sort last.
#[must_use]
pub fn run_pipeline(
    records: &[LocationRecord],
    filter: &FilterState,
    now: NaiveDateTime,
    has_position: bool,
) -> Vec<usize> {
    let needle = filter.search.trim().to_lowercase();
    let borough = filter.borough.as_deref().map(str::to_lowercase);

    let mut kept: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| needle.is_empty() || matches_search(r, &needle))
        .filter(|(_, r)| {
            borough
                .as_deref()
                .is_none_or(|b| r.borough.to_lowercase() == b)
        })
        .filter(|(_, r)| day_matches(r, filter.day, now))
        .filter(|(_, r)| filter.service.matches(r))
        .filter(|(_, r)| filter.quick.matches(r))
        .map(|(i, _)| i)
        .collect();

    sort_indices(&mut kept, records, filter.sort, has_position);
    kept
}

/// Case-insensitive substring match across the searchable fields.
fn matches_search(record: &LocationRecord, needle_lower: &str) -> bool {
    [
        &record.name,
        &record.full_address,
        &record.postcode,
        &record.borough,
        &record.area,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle_lower))
}

fn day_matches(record: &LocationRecord, day: DayFilter, now: NaiveDateTime) -> bool {
    match day {
        DayFilter::All => true,
        DayFilter::Today => record.open_on(now.weekday()),
        DayFilter::Tomorrow => record.open_on(now.weekday().succ()),
        DayFilter::Weekday => record.open_days[..5].iter().any(|&d| d),
        DayFilter::Weekend => record.open_days[5] || record.open_days[6],
    }
}

fn sort_indices(kept: &mut [usize], records: &[LocationRecord], sort: SortKey, has_position: bool) {
    let by_name = |a: usize, b: usize| -> Ordering {
        records[a]
            .name
            .to_lowercase()
            .cmp(&records[b].name.to_lowercase())
    };

    match sort {
        SortKey::Distance if has_position => {
            kept.sort_by(|&a, &b| {
                let da = records[a].distance_miles.unwrap_or(f64::INFINITY);
                let db = records[b].distance_miles.unwrap_or(f64::INFINITY);
                da.partial_cmp(&db)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| by_name(a, b))
            });
        }
        SortKey::Distance | SortKey::Name => {
            kept.sort_by(|&a, &b| by_name(a, b));
        }
        SortKey::OpeningSoon => {
            kept.sort_by(|&a, &b| {
                records[a]
                    .status
                    .rank()
                    .cmp(&records[b].status.rank())
                    .then_with(|| by_name(a, b))
            });
        }
        SortKey::Borough => {
            kept.sort_by(|&a, &b| {
                records[a]
                    .borough
                    .to_lowercase()
                    .cmp(&records[b].borough.to_lowercase())
                    .then_with(|| by_name(a, b))
            });
        }
    }
}

/// Project the first `page * PAGE_SIZE` entries of the filtered order into
/// presenter records.
#[must_use]
pub fn paginate(records: &[LocationRecord], filtered: &[usize], page: usize) -> Page {
    let visible = page.max(1) * PAGE_SIZE;
    let items = filtered
        .iter()
        .take(visible)
        .map(|&i| DisplayRecord::from_record(&records[i]))
        .collect();
    Page {
        items,
        has_more: visible < filtered.len(),
        total_count: filtered.len(),
    }
}
