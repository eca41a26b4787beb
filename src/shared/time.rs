use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Microseconds between the Unix epoch and the database epoch (2000-01-01 UTC).
pub const PG_EPOCH_UNIX_MICROS: i64 = 946_684_800_000_000;
pub const PG_EPOCH_UNIX_MILLIS: i64 = PG_EPOCH_UNIX_MICROS / 1_000;

/// The database's binary timestamp epoch.
pub fn pg_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(PG_EPOCH_UNIX_MICROS / 1_000_000, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Convert database-epoch microseconds into Unix milliseconds.
///
/// Total over the whole `i64` domain: the micros are floored to millis before
/// the epoch shift, so the sum always fits. Flooring matches how the server
/// truncates sub-millisecond precision for instants before the epoch.
pub fn pg_micros_to_unix_millis(pg_micros: i64) -> i64 {
    pg_micros.div_euclid(1_000) + PG_EPOCH_UNIX_MILLIS
}

/// Inverse of [`pg_micros_to_unix_millis`] for millisecond-aligned instants.
pub fn unix_millis_to_pg_micros(unix_millis: i64) -> Option<i64> {
    unix_millis
        .checked_sub(PG_EPOCH_UNIX_MILLIS)?
        .checked_mul(1_000)
}

/// Shift `t` by `micros`. `TimeDelta` spans ±i64::MAX milliseconds, so any
/// microsecond delta is representable in one step; the result is `None` only
/// when it falls outside the calendar range chrono supports.
pub fn add_micros(t: DateTime<Utc>, micros: i64) -> Option<DateTime<Utc>> {
    t.checked_add_signed(TimeDelta::microseconds(micros))
}

pub fn pg_micros_to_datetime(pg_micros: i64) -> Option<DateTime<Utc>> {
    add_micros(pg_epoch(), pg_micros)
}

pub fn unix_millis_to_datetime(unix_millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(unix_millis)
}
