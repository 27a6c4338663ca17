//! Delimited-text parsing into raw field-maps.
//!
//! The published datasets are header-first CSV exports of hand-maintained
//! spreadsheets: ragged rows, blank lines, and stray quoting all occur in
//! the wild. Parsing is deliberately permissive — every structural oddity
//! degrades to absent fields, and semantic validation happens later in
//! record normalization.

use larder_catalog::RawRecord;

use crate::error::SourceError;

/// Parse CSV text into one field-map per data row.
///
/// The first row is the header. Rows shorter than the header simply lack
/// those keys; rows longer than the header have the extra cells ignored.
/// Fully empty rows are skipped.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] only for structural failures the reader
/// cannot recover from (e.g. unterminated quotes), not for ragged rows.
pub fn parse_rows(input: &[u8]) -> Result<Vec<RawRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
