//! Conversions between SQLite column values and model field types.
//!
//! Ids are stored as UUID text, instants as RFC 3339 text with a fixed
//! microsecond precision (so lexical order equals chronological order),
//! calendar dates as `YYYY-MM-DD` and times of day as `HH:MM:SS`.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

const TIME_FORMAT: &str = "%H:%M:%S";

pub(crate) fn ts(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn date(day: &NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub(crate) fn time(t: &NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn conversion_failure<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn id<T: From<Uuid>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map(T::from)
        .map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn opt_id<T: From<Uuid>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map(T::from))
        .transpose()
        .map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn opt_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn day(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn time_of_day(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(|e| conversion_failure(idx, e))
}

pub(crate) fn flag(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    let raw: i64 = row.get(idx)?;
    Ok(raw != 0)
}

/// Truncate an instant to the precision it will have after a round trip
/// through the database.
pub(crate) fn stored(instant: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&ts(&instant))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(instant)
}

/// The current instant at storage precision.
pub fn now() -> DateTime<Utc> {
    stored(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn timestamps_sort_lexically() {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let later = base + Duration::microseconds(1);
        let much_later = base + Duration::seconds(1);

        assert!(ts(&base) < ts(&later));
        assert!(ts(&later) < ts(&much_later));
        assert_eq!(ts(&base).len(), ts(&much_later).len());
    }

    #[test]
    fn stored_drops_sub_microsecond_precision() {
        let noon = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let truncated = stored(noon + Duration::nanoseconds(1_500));
        let expected = noon + Duration::microseconds(1);
        assert_eq!(truncated, expected);
    }
}
