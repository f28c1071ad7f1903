//! Column encoding helpers shared by the model row mappers.
//!
//! Ids are stored as hyphenated UUID text. Date-times are stored as RFC 3339
//! with exactly six fractional digits and a `Z` suffix; dates as `YYYY-MM-DD`.
//! Both forms sort lexically in time order.

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Truncate a timestamp to the precision the database keeps.
pub fn stored_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

/// Current time at stored precision.
pub fn now() -> DateTime<Utc> {
    stored_precision(Utc::now())
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn encode_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error<E>(row: &Row<'_>, column: &str, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

pub fn get_id(row: &Row<'_>, column: &str) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(column)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(row, column, e))
}

pub fn get_optional_id(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<Uuid>> {
    match row.get::<_, Option<String>>(column)? {
        Some(raw) => Uuid::parse_str(&raw)
            .map(Some)
            .map_err(|e| conversion_error(row, column, e)),
        None => Ok(None),
    }
}

pub fn get_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(row, column, e))
}

pub fn get_date(row: &Row<'_>, column: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(column)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(row, column, e))
}

/// Parse a stored enum tag through its `FromStr` implementation.
pub fn get_tag<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    raw.parse::<T>().map_err(|e| conversion_error(row, column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_encoding_is_fixed_width() {
        let whole = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let fractional = whole + chrono::Duration::milliseconds(500);
        let a = encode_timestamp(&whole);
        let b = encode_timestamp(&fractional);
        assert_eq!(a, "2024-03-01T12:00:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_stored_precision_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let stored = stored_precision(ts);
        let reparsed = DateTime::parse_from_rfc3339(&encode_timestamp(&stored))
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(stored, reparsed);
    }

    #[test]
    fn test_date_encoding() {
        let date = NaiveDate::from_ymd_opt(2021, 7, 4).unwrap();
        assert_eq!(encode_date(&date), "2021-07-04");
    }
}
