use assert_matches::assert_matches;
use chrono::NaiveDateTime;

use modis_msg_coreg::domain::{GeoProduct, Instant, TemporalWindow, format_instant};
use modis_msg_coreg::error::CoregError;
use modis_msg_coreg::polar::select;

fn instant(s: &str) -> Instant {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn summer_afternoons() -> TemporalWindow {
    TemporalWindow::parse("2023-06-01", "2023-06-03", "10:00:00", "14:00:00").unwrap()
}

#[test]
fn catalog_interval_is_continuous_across_days() {
    let window = summer_afternoons();
    assert!(window.catalog_contains(&instant("2023-06-02 03:00:00")));
    assert!(window.catalog_contains(&instant("2023-06-01 10:00:00")));
    assert!(!window.catalog_contains(&instant("2023-06-01 09:59:59")));
    assert!(window.catalog_contains(&instant("2023-06-03 14:00:00")));
    assert!(!window.catalog_contains(&instant("2023-06-03 14:00:01")));
}

#[test]
fn daily_windows_repeat_time_of_day_on_every_day() {
    let window = summer_afternoons();
    assert!(!window.daily_contains(&instant("2023-06-02 03:00:00")));
    assert!(window.daily_contains(&instant("2023-06-02 12:00:00")));
    assert!(window.daily_contains(&instant("2023-06-01 10:00:00")));
    assert!(!window.daily_contains(&instant("2023-06-03 14:00:01")));

    let days = window.daily_windows();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0], (instant("2023-06-01 10:00:00"), instant("2023-06-01 14:00:00")));
    assert_eq!(days[2], (instant("2023-06-03 10:00:00"), instant("2023-06-03 14:00:00")));
}

#[test]
fn overnight_window_spans_midnight() {
    let window =
        TemporalWindow::parse("2023-06-01", "2023-06-03", "22:00:00", "02:00:00").unwrap();
    assert!(window.is_overnight());
    assert_eq!(
        window.catalog_interval(),
        (instant("2023-06-01 22:00:00"), instant("2023-06-03 02:00:00"))
    );
    assert!(window.catalog_contains(&instant("2023-06-02 12:00:00")));

    assert_eq!(
        window.daily_windows(),
        vec![
            (instant("2023-06-01 22:00:00"), instant("2023-06-02 02:00:00")),
            (instant("2023-06-02 22:00:00"), instant("2023-06-03 02:00:00")),
        ]
    );
    assert!(window.daily_contains(&instant("2023-06-02 01:30:00")));
    assert!(window.daily_contains(&instant("2023-06-02 23:00:00")));
    assert!(!window.daily_contains(&instant("2023-06-02 12:00:00")));
    assert!(!window.daily_contains(&instant("2023-06-01 01:00:00")));
    assert!(!window.daily_contains(&instant("2023-06-03 22:30:00")));
}

#[test]
fn single_day_window() {
    let window =
        TemporalWindow::parse("2023-06-01", "2023-06-01", "00:00:00", "23:59:00").unwrap();
    assert_eq!(window.days().count(), 1);
    assert_eq!(
        window.catalog_interval(),
        (instant("2023-06-01 00:00:00"), instant("2023-06-01 23:59:00"))
    );
}

#[test]
fn window_rejects_bad_input() {
    assert_matches!(
        TemporalWindow::parse("2023-06-31", "2023-07-01", "00:00:00", "23:59:00"),
        Err(CoregError::InvalidDate(_))
    );
    assert_matches!(
        TemporalWindow::parse("2023-06-01", "2023-07-01", "25:00:00", "23:59:00"),
        Err(CoregError::InvalidTime(_))
    );
    assert_matches!(
        TemporalWindow::parse("2023-06-01", "2023-06-01", "14:00:00", "10:00:00"),
        Err(CoregError::InvalidWindow(_))
    );
}

#[test]
fn instants_format_to_seconds() {
    assert_eq!(
        format_instant(&instant("2023-06-01 12:37:43")),
        "2023-06-01 12:37:43"
    );
}

#[test]
fn msg_products_map_to_data_store_collections() {
    assert_eq!(GeoProduct::Base.collection(), "EO:EUM:DAT:MSG:HRSEVIRI");
    assert_eq!(GeoProduct::CloudMask.instrument(), "CLM");
    assert_eq!(GeoProduct::CloudMask.extension(), "grb");
}

#[test]
fn selector_rejects_unprefixed_names() {
    assert_matches!(select("MYD021KM"), Ok(_));
    assert_matches!(select("mod021km"), Err(CoregError::UnknownProduct(_)));
}
