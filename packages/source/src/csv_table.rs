//! CSV response decoding.
//!
//! The first row is the header; every following row becomes one table row
//! with trimmed cells. Rows may be shorter or longer than the header.

use crime_dashboard_source_models::RawTable;

use crate::FetchError;

/// Parses a CSV response body into a [`RawTable`].
///
/// A body with a header row but no data rows is a valid, empty table.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the body is empty or has no header row,
/// or [`FetchError::Csv`] if the CSV is malformed.
pub fn parse_csv(body: &str) -> Result<RawTable, FetchError> {
    if body.trim().is_empty() {
        return Err(FetchError::Parse {
            message: "empty response body".to_string(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(FetchError::Parse {
            message: "CSV response contains no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|cell| cell.trim().to_owned()).collect());
    }

    log::debug!("Parsed {} CSV rows with {} columns", rows.len(), headers.len());

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use crime_dashboard_source_models::KnownColumn;

    use super::*;

    #[test]
    fn parses_scalar_count() {
        let table = parse_csv("\"cnt\"\n\"264812\"\n").unwrap();
        assert!(table.has(KnownColumn::Count));
        assert_eq!(
            table.first_row().unwrap().get(KnownColumn::Count),
            Some("264812")
        );
    }

    #[test]
    fn parses_quoted_fields_with_commas() {
        let body = "\"primary_type\",\"cnt\"\n\"THEFT\",\"100\"\n\"CRIM SEXUAL ASSAULT, AGG\",\"7\"\n";
        let table = parse_csv(body).unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1].get(KnownColumn::PrimaryType),
            Some("CRIM SEXUAL ASSAULT, AGG")
        );
    }

    #[test]
    fn header_only_is_empty_table() {
        let table = parse_csv("\"date\",\"primary_type\"\n").unwrap();
        assert!(table.is_empty());
        assert!(table.has(KnownColumn::Date));
    }

    #[test]
    fn trims_cells_and_tolerates_ragged_rows() {
        let table = parse_csv("id,date\n 1 , 2021-01-01T00:00:00 \n2\n").unwrap();
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get(KnownColumn::Id), Some("1"));
        assert_eq!(rows[0].get(KnownColumn::Date), Some("2021-01-01T00:00:00"));
        assert_eq!(rows[1].get(KnownColumn::Date), None);
    }

    #[test]
    fn empty_body_is_a_parse_error() {
        assert!(matches!(parse_csv("  \n"), Err(FetchError::Parse { .. })));
    }
}
