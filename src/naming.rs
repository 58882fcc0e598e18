use std::path::Path;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::domain::Instant;
use crate::error::CoregError;

static MODIS_GRANULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.A(?<year>\d{4})(?<doy>\d{3})\.(?<hour>\d{2})(?<minute>\d{2})(?:\.|$)")
        .expect("MODIS granule pattern should always compile")
});

static MSG_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^MSG\d-SEVI-.+-(?<stamp>\d{14})\.\d+Z-")
        .expect("MSG file name pattern should always compile")
});

/// Turns a file name into the instant its scene was acquired.
pub trait FilenameParser {
    fn acquisition_instant(&self, path: &Path) -> Result<Instant, CoregError>;
}

/// SEVIRI naming, e.g. `MSG4-SEVI-MSG15-0100-NA-20230601123743.664000000Z-NA.nat`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgFileNames;

impl FilenameParser for MsgFileNames {
    fn acquisition_instant(&self, path: &Path) -> Result<Instant, CoregError> {
        msg_acquisition_instant(path)
    }
}

/// Parses a MODIS granule identifier such as
/// `MYD021KM.A2023152.1235.061.2023153012345.hdf` into its acquisition instant
/// (year, day of year, HHMM).
pub fn granule_to_timestamp(identifier: &str) -> Result<Instant, CoregError> {
    let malformed = || CoregError::MalformedIdentifier(identifier.to_string());
    let captures = MODIS_GRANULE.captures(identifier).ok_or_else(malformed)?;

    let year: i32 = captures["year"].parse().map_err(|_| malformed())?;
    let doy: u32 = captures["doy"].parse().map_err(|_| malformed())?;
    let hour: u32 = captures["hour"].parse().map_err(|_| malformed())?;
    let minute: u32 = captures["minute"].parse().map_err(|_| malformed())?;

    let date = NaiveDate::from_yo_opt(year, doy).ok_or_else(malformed)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(malformed)?;
    Ok(date.and_time(time))
}

pub fn msg_acquisition_instant(path: &Path) -> Result<Instant, CoregError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CoregError::MalformedFilename(path.display().to_string()))?;
    let captures = MSG_FILENAME
        .captures(name)
        .ok_or_else(|| CoregError::MalformedFilename(name.to_string()))?;
    NaiveDateTime::parse_from_str(&captures["stamp"], "%Y%m%d%H%M%S")
        .map_err(|_| CoregError::MalformedFilename(name.to_string()))
}
