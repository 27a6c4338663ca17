pub mod catalog;
pub mod distance;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod service;
pub mod status;

pub use catalog::{Catalog, Clock, SystemClock, PAGE_SIZE};
pub use distance::{haversine_miles, near_count, refresh_distances, UserPosition, EARTH_RADIUS_MILES};
pub use error::{CatalogError, PositionError};
pub use filter::{
    paginate, run_pipeline, DayFilter, FilterState, Page, QuickFilter, ServiceFilter, SortKey,
};
pub use normalize::{normalize_record, normalize_records, NormalizedBatch, RawRecord};
pub use record::{borough_facets, AccessType, DisplayRecord, LocationRecord, Status};
pub use service::{
    CatalogService, LoadTicket, PositionPolicy, PositionProvider, Presenter, RecordSource,
    TRANSIENT_MESSAGE_SECS,
};
pub use status::{
    compute_status, find_next_opening, open_now_count, refresh_statuses, StatusInfo,
    OPENING_SOON_WINDOW_MINS,
};
