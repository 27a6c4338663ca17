//! Normalization from raw field-maps to [`LocationRecord`].
//!
//! A row is either fully adopted or silently excluded — there is no partial
//! state. Exclusion happens only when the name is empty or a coordinate
//! fails to parse to a finite number; every other field degrades to an
//! absent value with a display fallback.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::record::{AccessType, LocationRecord, Status};

/// One raw row from a record source: header → cell text.
///
/// Missing keys are treated as absent values, not errors.
pub type RawRecord = HashMap<String, String>;

/// Result of normalizing a batch of rows.
pub struct NormalizedBatch {
    pub records: Vec<LocationRecord>,
    /// Rows excluded for a missing name or unparseable coordinates.
    pub dropped: usize,
}

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$").expect("valid time regex"));

/// Normalize a batch of raw rows for one region.
///
/// Invalid rows are dropped silently; the aggregate count is logged once
/// as a diagnostic and returned in the batch.
#[must_use]
pub fn normalize_records(region: &str, rows: &[RawRecord]) -> NormalizedBatch {
    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for (index, row) in rows.iter().enumerate() {
        match normalize_record(region, index, row) {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(
            region,
            dropped,
            adopted = records.len(),
            "excluded rows with missing name or invalid coordinates"
        );
    }

    NormalizedBatch { records, dropped }
}

/// Normalize a single raw row.
///
/// Returns `None` when the row cannot be adopted: empty name, or a latitude
/// or longitude that is missing, unparseable, or non-finite.
#[must_use]
pub fn normalize_record(region: &str, index: usize, row: &RawRecord) -> Option<LocationRecord> {
    let raw = |key: &str| row.get(key).map_or("", String::as_str);
    let text = |key: &str| clean_text(raw(key));
    let flag = |key: &str| parse_flag(raw(key));

    let name = text("Name");
    if name.is_empty() {
        return None;
    }
    let latitude = parse_coordinate(raw("Latitude"))?;
    let longitude = parse_coordinate(raw("Longitude"))?;

    let access_raw = text("Access_Type");

    Some(LocationRecord {
        id: format!("{region}_{index}"),
        region: region.to_string(),
        name,
        borough: text("Borough"),
        area: text("Area"),
        full_address: text("Full_Address"),
        postcode: text("Postcode"),
        opening_times: text("Opening_Times"),
        phone: format_phone(raw("Phone")),
        email: text("Email"),
        website: text("Website"),
        requirements: text("Requirements"),
        cost: text("Cost"),
        services: text("Services"),
        contact_person: text("Contact_Person"),
        notes: text("Notes"),
        open_days: [
            flag("Monday"),
            flag("Tuesday"),
            flag("Wednesday"),
            flag("Thursday"),
            flag("Friday"),
            flag("Saturday"),
            flag("Sunday"),
        ],
        opening_time: parse_time(raw("Opening_Time")),
        closing_time: parse_time(raw("Closing_Time")),
        time_notes: text("Time_Notes"),
        food_parcels: flag("Service_FoodBank"),
        community_meals: flag("Service_CommunityMeals"),
        delivery: flag("Service_Delivery"),
        clothing: flag("Service_Clothing"),
        utilities: flag("Service_Utilities"),
        furniture: flag("Service_Furniture"),
        access: AccessType::parse(&access_raw),
        access_raw,
        latitude,
        longitude,
        has_complete_info: flag("Has_Complete_Info"),
        last_updated: text("Last_Updated"),
        coordinate_source: text("Coordinate_Source"),
        status: Status::Closed,
        next_opening: None,
        distance_miles: None,
    })
}

/// Trim and map the literal strings `"null"` and `"undefined"` to absent.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" || trimmed == "undefined" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Parse a boolean-ish cell: `y`/`yes`/`true`/`1` (case-insensitive) are
/// true, everything else — including absent — is false.
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    matches!(lower.as_str(), "y" | "yes" | "true" | "1")
}

/// Clean a phone number and reformat UK national numbers.
///
/// Strips everything except digits, `+`, and whitespace. If the stripped
/// value is exactly 11 digits starting with `0`, it is reformatted as
/// `"XXXX XXX XXXX"`; otherwise the stripped value passes through unchanged.
#[must_use]
pub fn format_phone(raw: &str) -> String {
    let cleaned_input = clean_text(raw);
    let cleaned: String = cleaned_input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+' || c.is_whitespace())
        .collect();

    let all_digits = !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit());
    if all_digits && cleaned.len() == 11 && cleaned.starts_with('0') {
        format!("{} {} {}", &cleaned[..4], &cleaned[4..7], &cleaned[7..])
    } else {
        cleaned
    }
}

/// Parse a time-of-day cell.
///
/// Accepts `H:MM`, `HH:MM`, or `HH:MM:SS`; seconds are discarded. Anything
/// else — including an empty cell — is an explicit absent value, never a
/// guessed default.
#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = clean_text(raw);
    if !TIME_RE.is_match(&trimmed) {
        return None;
    }
    let mut parts = trimmed.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = parts.next()?.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn valid_row() -> RawRecord {
        row(&[
            ("Name", "Salford Foodbank"),
            ("Borough", "Salford"),
            ("Latitude", "53.4875"),
            ("Longitude", "-2.2901"),
        ])
    }

    // -----------------------------------------------------------------------
    // clean_text
    // -----------------------------------------------------------------------

    #[test]
    fn clean_text_trims() {
        assert_eq!(clean_text("  hello  "), "hello");
    }

    #[test]
    fn clean_text_null_literal_is_absent() {
        assert_eq!(clean_text("null"), "");
        assert_eq!(clean_text("undefined"), "");
        assert_eq!(clean_text(""), "");
    }

    // -----------------------------------------------------------------------
    // parse_flag
    // -----------------------------------------------------------------------

    #[test]
    fn parse_flag_truthy_vocabulary() {
        for token in ["y", "Y", "yes", "YES", "true", "True", "1"] {
            assert!(parse_flag(token), "expected truthy: {token}");
        }
    }

    #[test]
    fn parse_flag_everything_else_is_false() {
        for token in ["", "n", "no", "false", "0", "maybe", "null"] {
            assert!(!parse_flag(token), "expected falsy: {token}");
        }
    }

    // -----------------------------------------------------------------------
    // format_phone
    // -----------------------------------------------------------------------

    #[test]
    fn format_phone_uk_national_number() {
        assert_eq!(format_phone("01611234567"), "0161 123 4567");
    }

    #[test]
    fn format_phone_strips_punctuation() {
        assert_eq!(format_phone("(0161)123-4567"), "0161 123 4567");
    }

    #[test]
    fn format_phone_passthrough_when_not_eleven_digits() {
        assert_eq!(format_phone("+44 161 123 4567"), "+44 161 123 4567");
    }

    #[test]
    fn format_phone_absent_is_empty() {
        assert_eq!(format_phone("null"), "");
        assert_eq!(format_phone(""), "");
    }

    // -----------------------------------------------------------------------
    // parse_time
    // -----------------------------------------------------------------------

    #[test]
    fn parse_time_accepts_padded_and_unpadded() {
        assert_eq!(parse_time("09:00"), NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(parse_time("9:30"), NaiveTime::from_hms_opt(9, 30, 0));
    }

    #[test]
    fn parse_time_drops_seconds() {
        assert_eq!(parse_time("09:00:30"), NaiveTime::from_hms_opt(9, 0, 0));
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert_eq!(parse_time("morning"), None);
        assert_eq!(parse_time("9am"), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("null"), None);
    }

    #[test]
    fn parse_time_rejects_out_of_range() {
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("12:61"), None);
    }

    // -----------------------------------------------------------------------
    // normalize_record
    // -----------------------------------------------------------------------

    #[test]
    fn normalize_record_round_trip() {
        let mut r = valid_row();
        r.insert("Monday".to_string(), "Y".to_string());
        r.insert("Opening_Time".to_string(), "09:00".to_string());
        r.insert("Closing_Time".to_string(), "17:00".to_string());

        let record = normalize_record("greater_manchester", 3, &r).unwrap();
        assert_eq!(record.id, "greater_manchester_3");
        assert!(record.open_days[0]);
        assert!(!record.open_days[1]);
        assert_eq!(record.opening_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(record.closing_time, NaiveTime::from_hms_opt(17, 0, 0));
    }

    #[test]
    fn normalize_record_drops_missing_name() {
        let mut r = valid_row();
        r.insert("Name".to_string(), "  ".to_string());
        assert!(normalize_record("test", 0, &r).is_none());
    }

    #[test]
    fn normalize_record_drops_missing_latitude() {
        let mut r = valid_row();
        r.remove("Latitude");
        assert!(normalize_record("test", 0, &r).is_none());
    }

    #[test]
    fn normalize_record_drops_non_finite_coordinate() {
        let mut r = valid_row();
        r.insert("Longitude".to_string(), "NaN".to_string());
        assert!(normalize_record("test", 0, &r).is_none());

        let mut r = valid_row();
        r.insert("Latitude".to_string(), "inf".to_string());
        assert!(normalize_record("test", 0, &r).is_none());
    }

    #[test]
    fn normalize_record_drops_unparseable_coordinate() {
        let mut r = valid_row();
        r.insert("Latitude".to_string(), "fifty-three".to_string());
        assert!(normalize_record("test", 0, &r).is_none());
    }

    #[test]
    fn normalize_record_missing_keys_are_absent_values() {
        let record = normalize_record("test", 0, &valid_row()).unwrap();
        assert_eq!(record.full_address, "");
        assert_eq!(record.cost, "");
        assert_eq!(record.access, AccessType::Unknown);
        assert!(record.opening_time.is_none());
        assert!(!record.delivery);
    }

    #[test]
    fn normalize_record_canonicalizes_access_type() {
        let mut r = valid_row();
        r.insert("Access_Type".to_string(), "Referral Only".to_string());
        let record = normalize_record("test", 0, &r).unwrap();
        assert_eq!(record.access, AccessType::ReferralOnly);
        assert_eq!(record.access_raw, "Referral Only");
    }

    #[test]
    fn normalize_records_counts_dropped_rows() {
        let rows = vec![
            valid_row(),
            row(&[("Name", "No Coordinates Pantry")]),
            valid_row(),
        ];
        let batch = normalize_records("test", &rows);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.dropped, 1);
        assert_eq!(batch.records[0].id, "test_0");
        assert_eq!(batch.records[1].id, "test_2");
    }
}
