//! CRM date-time conversion tests

use core_kernel::{CrmDateTime, TemporalError, Timezone};

#[test]
fn test_winter_time_offset() {
    // 2017-01-15T08:30:00Z is 09:30 in Berlin (CET)
    let dt = CrmDateTime::from_epoch(1_484_469_000, Timezone::default()).unwrap();
    assert_eq!(dt.to_string(), "20170115093000");
}

#[test]
fn test_other_site_timezone() {
    let tz: Timezone = "America/New_York".parse().unwrap();
    // 2017-01-15T08:30:00Z is 03:30 in New York (EST)
    let dt = CrmDateTime::from_epoch(1_484_469_000, tz).unwrap();
    assert_eq!(dt.to_string(), "20170115033000");
}

#[test]
fn test_parse_round_trip() {
    let dt = CrmDateTime::parse("20170115093000").unwrap();
    assert_eq!(dt.to_string(), "20170115093000");
    assert!(matches!(
        CrmDateTime::parse("2017-01-15"),
        Err(TemporalError::InvalidFormat(_))
    ));
}

#[test]
fn test_serializes_compact_form() {
    let dt = CrmDateTime::parse("20170115093000").unwrap();
    assert_eq!(serde_json::to_string(&dt).unwrap(), "\"20170115093000\"");
}
