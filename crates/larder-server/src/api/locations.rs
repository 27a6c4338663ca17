//! Region directory endpoints: region summaries, the filtered location
//! listing, and the reload affordance for failed datasets.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_catalog::{
    paginate, refresh_distances, run_pipeline, DayFilter, DisplayRecord, FilterState, QuickFilter,
    ServiceFilter, SortKey, UserPosition, PAGE_SIZE,
};

use crate::middleware::RequestId;
use crate::state::{load_region, AppState};

use super::{ApiError, ApiResponse, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct RegionSummaryItem {
    pub slug: String,
    pub name: String,
    pub loaded: bool,
    pub total_locations: usize,
    pub open_now: usize,
    pub boroughs: Vec<String>,
    pub dropped_rows: usize,
    pub loaded_at: Option<DateTime<Utc>>,
}

pub(super) async fn list_regions(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<RegionSummaryItem>>> {
    let regions = state.regions.read().await;

    let data = state
        .configured
        .iter()
        .map(|(slug, name)| match regions.get(slug) {
            Some(entry) => RegionSummaryItem {
                slug: slug.clone(),
                name: name.clone(),
                loaded: true,
                total_locations: entry.records.len(),
                open_now: larder_catalog::open_now_count(&entry.records),
                boroughs: entry.boroughs.clone(),
                dropped_rows: entry.dropped,
                loaded_at: Some(entry.loaded_at),
            },
            None => RegionSummaryItem {
                slug: slug.clone(),
                name: name.clone(),
                loaded: false,
                total_locations: 0,
                open_now: 0,
                boroughs: Vec::new(),
                dropped_rows: 0,
                loaded_at: None,
            },
        })
        .collect();

    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Query parameters for the location listing. Every unrecognized token
/// falls back to its all-pass default — stale client state degrades to a
/// broader result set, never an error.
#[derive(Debug, Deserialize)]
pub(super) struct LocationsQuery {
    q: Option<String>,
    borough: Option<String>,
    day: Option<String>,
    service: Option<String>,
    quick: Option<String>,
    sort: Option<String>,
    page: Option<usize>,
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct LocationsPage {
    pub region: String,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub has_more: bool,
    pub items: Vec<DisplayRecord>,
}

pub(super) async fn list_locations(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<LocationsQuery>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<LocationsPage>>, ApiError> {
    let regions = state.regions.read().await;
    let Some(entry) = regions.get(&region) else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("region '{region}' is not loaded"),
        ));
    };

    // Work on a copy so per-request distances never leak between users.
    let mut records = entry.records.clone();
    drop(regions);

    // Both coordinates are required for a position; a lone lat or lng is
    // treated as absent, matching the no-op handling of unknown tokens.
    let position = match (query.lat, query.lng) {
        (Some(latitude), Some(longitude)) => Some(UserPosition {
            latitude,
            longitude,
        }),
        _ => None,
    };
    if let Some(position) = position {
        refresh_distances(&mut records, position);
    }

    let filter = FilterState {
        search: query.q.unwrap_or_default(),
        borough: query
            .borough
            .filter(|b| !b.is_empty() && !b.eq_ignore_ascii_case("all")),
        day: query.day.as_deref().map(DayFilter::parse).unwrap_or_default(),
        service: query
            .service
            .as_deref()
            .map(ServiceFilter::parse)
            .unwrap_or_default(),
        quick: query
            .quick
            .as_deref()
            .map(QuickFilter::parse)
            .unwrap_or_default(),
        sort: query.sort.as_deref().map(SortKey::parse).unwrap_or_default(),
    };

    let page = query.page.unwrap_or(1).max(1);
    let filtered = run_pipeline(&records, &filter, state.clock.now(), position.is_some());
    let view = paginate(&records, &filtered, page);

    Ok(Json(ApiResponse {
        data: LocationsPage {
            region,
            page,
            page_size: PAGE_SIZE,
            total_count: view.total_count,
            has_more: view.has_more,
            items: view.items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ReloadOutcome {
    pub region: String,
    pub adopted: usize,
    pub dropped: usize,
}

pub(super) async fn reload_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ReloadOutcome>>, ApiError> {
    let Some(name) = state.region_name(&region).map(ToOwned::to_owned) else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("region '{region}' is not configured"),
        ));
    };

    match load_region(&state, &region, &name).await {
        Ok((adopted, dropped)) => Ok(Json(ApiResponse {
            data: ReloadOutcome {
                region,
                adopted,
                dropped,
            },
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(e) => {
            tracing::error!(region, error = %e, "reload failed");
            Err(ApiError::new(req_id.0, "load_failed", e.to_string()))
        }
    }
}
