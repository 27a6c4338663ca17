//! The location record model.
//!
//! ## Observed shape from the published datasets
//!
//! Every descriptive field may be missing, the literal string `"null"`, or the
//! literal string `"undefined"` — the sources are hand-maintained spreadsheets
//! exported to delimited text. Normalization (see [`crate::normalize`]) maps
//! all three onto the empty string, so record fields here are plain `String`s
//! with `""` meaning absent and display fallbacks applied at render time.
//!
//! The weekly schedule is seven per-day flags plus a single opening and
//! closing time shared across all open days; the source format has no
//! per-day hours. Records without a name or a finite coordinate pair are
//! never adopted into a catalog.

use chrono::{NaiveTime, Weekday};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;

/// Open/closed state of a location relative to wall-clock time.
///
/// Pure function of `(record, now)` — see [`crate::status::compute_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Open,
    OpeningSoon,
    #[default]
    Closed,
}

impl Status {
    /// Sort rank for the status-urgency sort: open sorts first, closed last.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Status::Open => 1,
            Status::OpeningSoon => 2,
            Status::Closed => 3,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Status::Open => "Open Now",
            Status::OpeningSoon => "Opens Soon",
            Status::Closed => "Closed",
        }
    }
}

/// Canonical access-type vocabulary.
///
/// The sources spell this field inconsistently ("Referral" vs "Referral Only",
/// "Walk-in" vs "Walk In"); all input variants normalize onto these four
/// values. Unrecognized text maps to `Unknown`, with the raw value retained
/// on the record for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    WalkIn,
    ReferralOnly,
    Both,
    #[default]
    Unknown,
}

impl AccessType {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "" | "unknown" => AccessType::Unknown,
            "both" => AccessType::Both,
            "referral" | "referral only" | "referral-only" => AccessType::ReferralOnly,
            s if s.contains("walk") => AccessType::WalkIn,
            _ => AccessType::Unknown,
        }
    }
}

/// One physical service location, fully normalized.
///
/// `status`, `next_opening`, and `distance_miles` are derived fields,
/// recomputed in place on each tick / position fix and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct LocationRecord {
    /// Stable identifier: `"{region}_{row_index}"`.
    pub id: String,
    pub region: String,
    pub name: String,
    pub borough: String,
    pub area: String,
    pub full_address: String,
    pub postcode: String,
    /// Free-text opening description from the source, as distinct from the
    /// structured `opening_time`/`closing_time` pair.
    pub opening_times: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub requirements: String,
    pub cost: String,
    pub services: String,
    pub contact_person: String,
    pub notes: String,

    /// Per-day open flags, Monday first.
    pub open_days: [bool; 7],
    pub opening_time: Option<NaiveTime>,
    pub closing_time: Option<NaiveTime>,
    pub time_notes: String,

    pub food_parcels: bool,
    pub community_meals: bool,
    pub delivery: bool,
    pub clothing: bool,
    pub utilities: bool,
    pub furniture: bool,

    pub access: AccessType,
    /// Raw access-type text, kept for display when it doesn't normalize.
    pub access_raw: String,

    pub latitude: f64,
    pub longitude: f64,
    pub has_complete_info: bool,
    pub last_updated: String,
    pub coordinate_source: String,

    pub status: Status,
    pub next_opening: Option<String>,
    pub distance_miles: Option<f64>,
}

impl LocationRecord {
    /// Whether the location is flagged open on the given weekday.
    #[must_use]
    pub fn open_on(&self, weekday: Weekday) -> bool {
        self.open_days[weekday.num_days_from_monday() as usize]
    }

    /// Human-readable access label with the "Contact for access" fallback.
    #[must_use]
    pub fn access_label(&self) -> String {
        match self.access {
            AccessType::WalkIn => "Walk-in".to_string(),
            AccessType::ReferralOnly => "Referral Required".to_string(),
            AccessType::Both => "Walk-in & Referral".to_string(),
            AccessType::Unknown => {
                let lower = self.access_raw.to_lowercase();
                if self.access_raw.is_empty() || lower == "unknown" {
                    "Contact for access".to_string()
                } else {
                    self.access_raw.clone()
                }
            }
        }
    }

    /// Google Maps directions link for the record's address.
    #[must_use]
    pub fn directions_url(&self) -> String {
        let destination = if self.postcode.is_empty() {
            self.full_address.clone()
        } else {
            format!("{}, {}", self.full_address, self.postcode)
        };
        format!(
            "https://www.google.com/maps/dir/?api=1&destination={}",
            utf8_percent_encode(&destination, NON_ALPHANUMERIC)
        )
    }
}

/// One row of the weekly hours table.
#[derive(Debug, Clone, Serialize)]
pub struct DayHours {
    pub day: &'static str,
    pub times: String,
}

/// The presenter-facing projection of a [`LocationRecord`]: every normalized
/// and derived field needed for display, with fallbacks already applied.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayRecord {
    pub id: String,
    pub name: String,
    pub borough: String,
    pub area: String,
    pub full_address: String,
    pub postcode: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub requirements: String,
    pub cost: String,
    pub services: String,
    pub contact_person: String,
    pub notes: String,
    pub opening_hours: Vec<DayHours>,
    pub time_notes: String,
    pub food_parcels: bool,
    pub community_meals: bool,
    pub delivery: bool,
    pub clothing: bool,
    pub utilities: bool,
    pub furniture: bool,
    pub access_type: AccessType,
    pub access_label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: Status,
    pub status_label: &'static str,
    pub next_opening: Option<String>,
    pub distance_miles: Option<f64>,
    pub directions_url: String,
}

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

impl DisplayRecord {
    #[must_use]
    pub fn from_record(record: &LocationRecord) -> Self {
        let opening_hours = DAY_NAMES
            .iter()
            .enumerate()
            .map(|(i, day)| {
                let times = match (record.open_days[i], record.opening_time, record.closing_time)
                {
                    (true, Some(open), Some(close)) => {
                        format!("{} - {}", open.format("%H:%M"), close.format("%H:%M"))
                    }
                    _ => "Closed".to_string(),
                };
                DayHours { day, times }
            })
            .collect();

        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            borough: record.borough.clone(),
            area: record.area.clone(),
            full_address: record.full_address.clone(),
            postcode: record.postcode.clone(),
            phone: record.phone.clone(),
            email: record.email.clone(),
            website: record.website.clone(),
            requirements: record.requirements.clone(),
            cost: if record.cost.is_empty() {
                "Contact for details".to_string()
            } else {
                record.cost.clone()
            },
            services: record.services.clone(),
            contact_person: record.contact_person.clone(),
            notes: record.notes.clone(),
            opening_hours,
            time_notes: record.time_notes.clone(),
            food_parcels: record.food_parcels,
            community_meals: record.community_meals,
            delivery: record.delivery,
            clothing: record.clothing,
            utilities: record.utilities,
            furniture: record.furniture,
            access_type: record.access,
            access_label: record.access_label(),
            latitude: record.latitude,
            longitude: record.longitude,
            status: record.status,
            status_label: record.status.label(),
            next_opening: record.next_opening.clone(),
            distance_miles: record.distance_miles,
            directions_url: record.directions_url(),
        }
    }
}

/// Sorted, de-duplicated borough names present in a dataset — the borough
/// facet offered to the presenter.
#[must_use]
pub fn borough_facets(records: &[LocationRecord]) -> Vec<String> {
    let mut boroughs: Vec<String> = records
        .iter()
        .map(|r| r.borough.clone())
        .filter(|b| !b.is_empty())
        .collect();
    boroughs.sort();
    boroughs.dedup();
    boroughs
}

/// Minimal valid record for unit tests across the crate.
#[cfg(test)]
pub(crate) fn test_record(name: &str) -> LocationRecord {
    LocationRecord {
        id: "test_0".to_string(),
        region: "test".to_string(),
        name: name.to_string(),
        borough: String::new(),
        area: String::new(),
        full_address: String::new(),
        postcode: String::new(),
        opening_times: String::new(),
        phone: String::new(),
        email: String::new(),
        website: String::new(),
        requirements: String::new(),
        cost: String::new(),
        services: String::new(),
        contact_person: String::new(),
        notes: String::new(),
        open_days: [false; 7],
        opening_time: None,
        closing_time: None,
        time_notes: String::new(),
        food_parcels: false,
        community_meals: false,
        delivery: false,
        clothing: false,
        utilities: false,
        furniture: false,
        access: AccessType::Unknown,
        access_raw: String::new(),
        latitude: 53.4808,
        longitude: -2.2426,
        has_complete_info: false,
        last_updated: String::new(),
        coordinate_source: String::new(),
        status: Status::Closed,
        next_opening: None,
        distance_miles: None,
    }
}
