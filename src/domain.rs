use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoregError;

/// Acquisition instants are UTC throughout; no zone is carried.
pub type Instant = NaiveDateTime;

pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub fn format_instant(instant: &Instant) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

/// Region of interest as `(min_lon, min_lat, max_lon, max_lat)` in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl BoundingBox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, CoregError> {
        let values = [min_lon, min_lat, max_lon, max_lat];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(CoregError::InvalidBoundingBox(format!("{values:?}")));
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(CoregError::InvalidBoundingBox(format!(
                "longitude out of range: {min_lon}, {max_lon}"
            )));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(CoregError::InvalidBoundingBox(format!(
                "latitude out of range: {min_lat}, {max_lat}"
            )));
        }
        if min_lon > max_lon || min_lat > max_lat {
            return Err(CoregError::InvalidBoundingBox(format!(
                "minimum exceeds maximum: {values:?}"
            )));
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

impl Default for BoundingBox {
    /// North Africa and southern Europe, well inside the MSG 0 degree disk.
    fn default() -> Self {
        Self {
            min_lon: -10.019531,
            min_lat: 30.22889,
            max_lon: 46.617188,
            max_lat: 49.012224,
        }
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = CoregError;

    fn try_from(value: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(value: BoundingBox) -> Self {
        [value.min_lon, value.min_lat, value.max_lon, value.max_lat]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl FromStr for BoundingBox {
    type Err = CoregError;

    /// Accepts four numbers separated by whitespace and/or commas.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let numbers = value
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>()
                    .map_err(|_| CoregError::InvalidBoundingBox(value.to_string()))
            })
            .collect::<Result<Vec<_>, CoregError>>()?;
        let [min_lon, min_lat, max_lon, max_lat] = numbers[..] else {
            return Err(CoregError::InvalidBoundingBox(value.to_string()));
        };
        Self::new(min_lon, min_lat, max_lon, max_lat)
    }
}

/// A date range plus a time-of-day range.
///
/// The two halves combine differently depending on the consumer:
/// [`TemporalWindow::catalog_interval`] joins them into one continuous interval, so the
/// time of day only bounds the first and the last day, while
/// [`TemporalWindow::daily_windows`] applies the time-of-day range on every day.
///
/// A start time later than the end time is an overnight range: each daily window runs
/// from the start time on one day to the end time on the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
}

impl TemporalWindow {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self, CoregError> {
        if start_date > end_date {
            return Err(CoregError::InvalidWindow(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        if start_date.and_time(start_time) > end_date.and_time(end_time) {
            return Err(CoregError::InvalidWindow(format!(
                "start {start_date} {start_time} is after end {end_date} {end_time}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            start_time,
            end_time,
        })
    }

    pub fn parse(
        start_date: &str,
        end_date: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Self, CoregError> {
        Self::new(
            parse_date(start_date)?,
            parse_date(end_date)?,
            parse_time(start_time)?,
            parse_time(end_time)?,
        )
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn is_overnight(&self) -> bool {
        self.start_time > self.end_time
    }

    pub fn catalog_interval(&self) -> (Instant, Instant) {
        (
            self.start_date.and_time(self.start_time),
            self.end_date.and_time(self.end_time),
        )
    }

    pub fn catalog_contains(&self, instant: &Instant) -> bool {
        let (start, end) = self.catalog_interval();
        start <= *instant && *instant <= end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end_date;
        self.start_date.iter_days().take_while(move |day| *day <= end)
    }

    pub fn daily_windows(&self) -> Vec<(Instant, Instant)> {
        if !self.is_overnight() {
            return self
                .days()
                .map(|day| (day.and_time(self.start_time), day.and_time(self.end_time)))
                .collect();
        }
        // An overnight window closes on the following day, so the last date only ends one.
        self.days()
            .zip(self.days().skip(1))
            .map(|(day, next)| (day.and_time(self.start_time), next.and_time(self.end_time)))
            .collect()
    }

    pub fn daily_contains(&self, instant: &Instant) -> bool {
        self.daily_windows()
            .iter()
            .any(|(start, end)| start <= instant && instant <= end)
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, CoregError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CoregError::InvalidDate(value.to_string()))
}

pub fn parse_time(value: &str) -> Result<NaiveTime, CoregError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| CoregError::InvalidTime(value.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarSatellite {
    Aqua,
    Terra,
}

impl PolarSatellite {
    pub fn name(&self) -> &'static str {
        match self {
            PolarSatellite::Aqua => "Aqua",
            PolarSatellite::Terra => "Terra",
        }
    }

    /// MODIS short-name prefix: `MYD` for Aqua, `MOD` for Terra.
    pub fn prefix(&self) -> &'static str {
        match self {
            PolarSatellite::Aqua => "MYD",
            PolarSatellite::Terra => "MOD",
        }
    }

    pub fn products(&self) -> &'static [PolarProduct] {
        match self {
            PolarSatellite::Aqua => &[
                PolarProduct::Base,
                PolarProduct::CloudMask,
                PolarProduct::FireMask,
            ],
            PolarSatellite::Terra => &[PolarProduct::Base, PolarProduct::CloudMask],
        }
    }

    pub fn supports(&self, product: PolarProduct) -> bool {
        self.products().contains(&product)
    }
}

impl fmt::Display for PolarSatellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarProduct {
    Base,
    CloudMask,
    FireMask,
}

impl PolarProduct {
    /// Two-digit MODIS product number.
    pub fn identifier(&self) -> &'static str {
        match self {
            PolarProduct::Base => "02",
            PolarProduct::CloudMask => "35",
            PolarProduct::FireMask => "14",
        }
    }

    pub fn processing_level(&self) -> &'static str {
        match self {
            PolarProduct::Base => "L1b",
            PolarProduct::CloudMask | PolarProduct::FireMask => "L2",
        }
    }

    pub fn resolution(&self) -> &'static str {
        "1KM"
    }

    pub fn subdir(&self) -> &'static str {
        match self {
            PolarProduct::Base => "L1b",
            PolarProduct::CloudMask => "CM",
            PolarProduct::FireMask => "FM",
        }
    }

    pub fn short_name(&self, satellite: PolarSatellite) -> String {
        let prefix = satellite.prefix();
        let id = self.identifier();
        match self {
            PolarProduct::Base => format!("{prefix}{id}{}", self.resolution()),
            PolarProduct::CloudMask => format!("{prefix}{id}_{}", self.processing_level()),
            PolarProduct::FireMask => format!("{prefix}{id}"),
        }
    }
}

impl fmt::Display for PolarProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolarProduct::Base => write!(f, "base"),
            PolarProduct::CloudMask => write!(f, "cloud mask"),
            PolarProduct::FireMask => write!(f, "fire mask"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoProduct {
    Base,
    CloudMask,
}

impl GeoProduct {
    pub fn satellite(&self) -> &'static str {
        "MSG"
    }

    pub fn instrument(&self) -> &'static str {
        match self {
            GeoProduct::Base => "HRSEVIRI",
            GeoProduct::CloudMask => "CLM",
        }
    }

    pub fn processing_level(&self) -> &'static str {
        "L1"
    }

    pub fn subdir(&self) -> &'static str {
        match self {
            GeoProduct::Base => "L1b",
            GeoProduct::CloudMask => "CM",
        }
    }

    /// EUMETSAT Data Store collection id.
    pub fn collection(&self) -> &'static str {
        match self {
            GeoProduct::Base => "EO:EUM:DAT:MSG:HRSEVIRI",
            GeoProduct::CloudMask => "EO:EUM:DAT:MSG:CLM",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            GeoProduct::Base => "nat",
            GeoProduct::CloudMask => "grb",
        }
    }
}

impl fmt::Display for GeoProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoProduct::Base => write!(f, "MSG base"),
            GeoProduct::CloudMask => write!(f, "MSG cloud mask"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_bounding_box_with_spaces_and_commas() {
        let bbox: BoundingBox = "-10.5 30, 46.6 49".parse().unwrap();
        assert_eq!(bbox.as_tuple(), (-10.5, 30.0, 46.6, 49.0));
        assert_eq!(bbox.to_string(), "-10.5,30,46.6,49");
    }

    #[test]
    fn bounding_box_rejects_wrong_arity_and_order() {
        assert_matches!(
            "1 2 3".parse::<BoundingBox>(),
            Err(CoregError::InvalidBoundingBox(_))
        );
        assert_matches!(
            BoundingBox::new(10.0, 0.0, -10.0, 5.0),
            Err(CoregError::InvalidBoundingBox(_))
        );
        assert_matches!(
            BoundingBox::new(0.0, -91.0, 10.0, 5.0),
            Err(CoregError::InvalidBoundingBox(_))
        );
    }

    #[test]
    fn short_names_follow_modis_convention() {
        assert_eq!(PolarProduct::Base.short_name(PolarSatellite::Aqua), "MYD021KM");
        assert_eq!(
            PolarProduct::CloudMask.short_name(PolarSatellite::Terra),
            "MOD35_L2"
        );
        assert_eq!(PolarProduct::FireMask.short_name(PolarSatellite::Aqua), "MYD14");
    }

    #[test]
    fn terra_lacks_fire_mask() {
        assert!(PolarSatellite::Aqua.supports(PolarProduct::FireMask));
        assert!(!PolarSatellite::Terra.supports(PolarProduct::FireMask));
        assert!(PolarSatellite::Terra.supports(PolarProduct::CloudMask));
    }
}
