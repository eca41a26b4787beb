use crate::shared::time::{
    PG_EPOCH_UNIX_MILLIS, add_micros, pg_epoch, pg_micros_to_datetime, pg_micros_to_unix_millis,
    unix_millis_to_datetime, unix_millis_to_pg_micros,
};
use chrono::{TimeZone, Utc};

#[test]
fn pg_epoch_is_y2k() {
    let expected = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single().unwrap();
    assert_eq!(pg_epoch(), expected);
    assert_eq!(pg_epoch().timestamp_millis(), PG_EPOCH_UNIX_MILLIS);
}

#[test]
fn zero_micros_is_the_epoch_in_unix_millis() {
    assert_eq!(pg_micros_to_unix_millis(0), 946_684_800_000);
}

#[test]
fn sub_millisecond_precision_is_floored() {
    assert_eq!(pg_micros_to_unix_millis(1_999), PG_EPOCH_UNIX_MILLIS + 1);
    // Before the epoch the floor goes away from zero, like the server.
    assert_eq!(pg_micros_to_unix_millis(-1), PG_EPOCH_UNIX_MILLIS - 1);
    assert_eq!(pg_micros_to_unix_millis(-1_000), PG_EPOCH_UNIX_MILLIS - 1);
    assert_eq!(pg_micros_to_unix_millis(-1_001), PG_EPOCH_UNIX_MILLIS - 2);
}

#[test]
fn extremes_do_not_overflow() {
    assert_eq!(
        pg_micros_to_unix_millis(i64::MAX),
        i64::MAX / 1_000 + PG_EPOCH_UNIX_MILLIS
    );
    assert_eq!(
        pg_micros_to_unix_millis(i64::MIN),
        i64::MIN.div_euclid(1_000) + PG_EPOCH_UNIX_MILLIS
    );
}

#[test]
fn millis_roundtrip_through_pg_micros() {
    let samples = [
        0_i64,
        1,
        -1,
        PG_EPOCH_UNIX_MILLIS,
        1_700_000_000_123,
        -62_135_596_800_000,
        9_000_000_000_000_000,
        -9_000_000_000_000_000,
    ];
    for ms in samples {
        let micros = unix_millis_to_pg_micros(ms).expect("in range");
        assert_eq!(pg_micros_to_unix_millis(micros), ms, "ms={ms}");
    }
}

#[test]
fn unix_millis_to_pg_micros_rejects_overflow() {
    assert_eq!(unix_millis_to_pg_micros(i64::MAX), None);
    assert_eq!(unix_millis_to_pg_micros(i64::MIN), None);
}

#[test]
fn add_micros_matches_calendar_arithmetic() {
    let one_day = 86_400_000_000_i64;
    let got = add_micros(pg_epoch(), one_day).unwrap();
    assert_eq!(got, Utc.with_ymd_and_hms(2000, 1, 2, 0, 0, 0).single().unwrap());

    let back = add_micros(pg_epoch(), -one_day).unwrap();
    assert_eq!(back, Utc.with_ymd_and_hms(1999, 12, 31, 0, 0, 0).single().unwrap());
}

#[test]
fn datetime_helpers_agree_with_millis_conversion() {
    let micros = 757_382_400_123_000_i64; // 2024-01-01T00:00:00.123Z
    let dt = pg_micros_to_datetime(micros).unwrap();
    let ms = pg_micros_to_unix_millis(micros);
    assert_eq!(dt.timestamp_millis(), ms);
    assert_eq!(unix_millis_to_datetime(ms).unwrap(), dt);
}

#[test]
fn far_out_instants_are_none_not_panics() {
    // ~294k years past 2000 is beyond chrono's calendar.
    assert!(pg_micros_to_datetime(i64::MAX).is_none());
    assert!(unix_millis_to_datetime(i64::MAX).is_none());
}
