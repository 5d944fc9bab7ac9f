//! Cycle resolution tests across the publication-delay boundaries.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use forecast_common::time::{resolve_cycle, resolve_init_date, InitDate, ModelCycle, TimeParseError};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

// ============================================================================
// resolve_cycle boundaries
// ============================================================================

#[test]
fn test_cycle_00_window() {
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 5, 0)), ModelCycle::Z00);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 10, 59)), ModelCycle::Z00);
}

#[test]
fn test_cycle_06_window() {
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 11, 0)), ModelCycle::Z06);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 16, 59)), ModelCycle::Z06);
}

#[test]
fn test_cycle_12_window() {
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 17, 0)), ModelCycle::Z12);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 20, 59)), ModelCycle::Z12);
}

#[test]
fn test_cycle_18_window_wraps_midnight() {
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 21, 0)), ModelCycle::Z18);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 23, 59)), ModelCycle::Z18);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 0, 0)), ModelCycle::Z18);
    assert_eq!(resolve_cycle(utc(2023, 6, 1, 4, 59)), ModelCycle::Z18);
}

// ============================================================================
// resolve_init_date
// ============================================================================

#[test]
fn test_init_date_previous_day_before_05z() {
    for hour in 0..5 {
        let now = utc(2023, 6, 1, hour, 15);
        let init = resolve_init_date(now);
        assert_eq!(init.datetime().date_naive(), (now - Duration::days(1)).date_naive());
        assert_eq!(init.datetime().hour(), 18);
    }
}

#[test]
fn test_init_date_same_day_from_05z() {
    for hour in 5..24 {
        let now = utc(2023, 6, 1, hour, 15);
        let init = resolve_init_date(now);
        assert_eq!(init.datetime().date_naive(), now.date_naive());
    }
}

#[test]
fn test_init_date_scenario_1300z() {
    let init = resolve_init_date(utc(2023, 6, 1, 13, 0));
    assert_eq!(init.cycle(), ModelCycle::Z06);
    assert_eq!(init.datetime(), utc(2023, 6, 1, 6, 0));
    assert_eq!(init.to_string(), "2023-06-01T06:00:00Z");
    assert_eq!(init.day_string(), "20230601");
}

#[test]
fn test_valid_time_crosses_day() {
    let init = resolve_init_date(utc(2023, 6, 1, 22, 0));
    let valid = init.valid_time(12);
    assert_eq!(valid.day(), 2);
    assert_eq!(valid.hour(), 6);
}

// ============================================================================
// InitDate parsing
// ============================================================================

#[test]
fn test_parse_init_date_forms() {
    let expected = utc(2023, 6, 1, 6, 0);
    for s in [
        "2023-06-01T06:00:00Z",
        "2023-06-01T06:00:00",
        "2023-06-01T06:00",
        "2023-06-01T06",
        "2023060106",
    ] {
        assert_eq!(InitDate::parse(s).unwrap().datetime(), expected, "{}", s);
    }
}

#[test]
fn test_parse_init_date_rejects_off_cycle() {
    assert!(matches!(
        InitDate::parse("2023-06-01T07:00:00Z"),
        Err(TimeParseError::NotACycle(_))
    ));
    assert!(matches!(
        InitDate::parse("2023-06-01T06:30:00Z"),
        Err(TimeParseError::NotACycle(_))
    ));
}

#[test]
fn test_parse_init_date_rejects_garbage() {
    assert!(matches!(
        InitDate::parse("yesterday"),
        Err(TimeParseError::InvalidFormat(_))
    ));
}

#[test]
fn test_init_date_deserializes_from_string() {
    let init: InitDate = serde_json::from_str("\"2023-06-01T12\"").unwrap();
    assert_eq!(init.cycle(), ModelCycle::Z12);
}
