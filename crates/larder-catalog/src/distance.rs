//! Great-circle distance from the user's position to each record.

use serde::{Deserialize, Serialize};

use crate::record::LocationRecord;

/// Earth radius in miles, matching the published dataset's unit convention.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// An acquired user coordinate. Absent until a position fix succeeds;
/// absence degrades distance sorting to name sorting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserPosition {
    pub latitude: f64,
    pub longitude: f64,
}

/// Haversine distance in miles between two coordinates.
#[must_use]
pub fn haversine_miles(from: UserPosition, to: UserPosition) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Recompute every record's distance from the given position, in place.
///
/// Called once per successful position acquisition — distances do not
/// change without a new fix.
pub fn refresh_distances(records: &mut [LocationRecord], position: UserPosition) {
    for record in records.iter_mut() {
        record.distance_miles = Some(haversine_miles(
            position,
            UserPosition {
                latitude: record.latitude,
                longitude: record.longitude,
            },
        ));
    }
}

/// Number of records with a computed distance within `within_miles`.
#[must_use]
pub fn near_count(records: &[LocationRecord], within_miles: f64) -> usize {
    records
        .iter()
        .filter(|r| r.distance_miles.is_some_and(|d| d <= within_miles))
        .count()
}
