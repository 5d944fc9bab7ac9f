//! Model cycle resolution and the date formats used by MPAS configuration files.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// strftime format for dates in MPAS and WPS namelists.
pub const NAMELIST_DATE_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// UTC hour before which the newest published GFS cycle is still yesterday's 18Z.
const PREVIOUS_DAY_CUTOFF_HOUR: u32 = 5;

/// Model run cycles (common for NWP models).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelCycle {
    /// 00Z run
    Z00,
    /// 06Z run
    Z06,
    /// 12Z run
    Z12,
    /// 18Z run
    Z18,
}

impl ModelCycle {
    pub fn from_hour(hour: u32) -> Option<Self> {
        match hour {
            0 => Some(ModelCycle::Z00),
            6 => Some(ModelCycle::Z06),
            12 => Some(ModelCycle::Z12),
            18 => Some(ModelCycle::Z18),
            _ => None,
        }
    }

    pub fn hour(&self) -> u32 {
        match self {
            ModelCycle::Z00 => 0,
            ModelCycle::Z06 => 6,
            ModelCycle::Z12 => 12,
            ModelCycle::Z18 => 18,
        }
    }

    /// Get all cycles for models that run 4x daily
    pub fn all_4x_daily() -> &'static [ModelCycle] {
        &[ModelCycle::Z00, ModelCycle::Z06, ModelCycle::Z12, ModelCycle::Z18]
    }
}

/// Two-digit, zero-padded cycle hour ("00", "06", ...).
impl fmt::Display for ModelCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.hour())
    }
}

/// Most recent GFS cycle published on NOMADS at `now`.
///
/// Cycles show up several hours after their nominal run time, so the day is
/// split into half-open windows:
///
/// | UTC hour       | cycle |
/// |----------------|-------|
/// | [05, 11)       | 00Z   |
/// | [11, 17)       | 06Z   |
/// | [17, 21)       | 12Z   |
/// | [21, 24), [0, 5) | 18Z |
pub fn resolve_cycle(now: DateTime<Utc>) -> ModelCycle {
    match now.hour() {
        5..=10 => ModelCycle::Z00,
        11..=16 => ModelCycle::Z06,
        17..=20 => ModelCycle::Z12,
        _ => ModelCycle::Z18,
    }
}

/// Initialization time of the most recent available cycle at `now`.
///
/// Before 05Z the 18Z cycle belongs to the previous calendar day.
pub fn resolve_init_date(now: DateTime<Utc>) -> InitDate {
    let cycle = resolve_cycle(now);
    let today = now.date_naive();
    let date = if now.hour() < PREVIOUS_DAY_CUTOFF_HOUR {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    };
    InitDate::new(date, cycle)
}

/// A model initialization time: a calendar date plus a cycle hour.
///
/// Minutes, seconds and sub-seconds are always zero and the hour is always
/// one of the four cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InitDate(DateTime<Utc>);

impl InitDate {
    pub fn new(date: NaiveDate, cycle: ModelCycle) -> Self {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        let time = Utc.from_utc_datetime(&midnight) + Duration::hours(cycle.hour() as i64);
        Self(time)
    }

    /// Accept an arbitrary timestamp only if it sits exactly on a cycle.
    pub fn from_datetime(time: DateTime<Utc>) -> Result<Self, TimeParseError> {
        let cycle = ModelCycle::from_hour(time.hour())
            .ok_or_else(|| TimeParseError::NotACycle(time.to_rfc3339()))?;
        if time.minute() != 0 || time.second() != 0 || time.nanosecond() != 0 {
            return Err(TimeParseError::NotACycle(time.to_rfc3339()));
        }
        Ok(Self::new(time.date_naive(), cycle))
    }

    /// Parse an init date given on the command line.
    ///
    /// Accepts RFC 3339 (`2023-06-01T06:00:00Z`), `2023-06-01T06:00:00`,
    /// `2023-06-01T06` and the compact `2023060106`.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Self::from_datetime(dt.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
                return Self::from_datetime(Utc.from_utc_datetime(&ndt));
            }
        }

        // Hour-only forms are not accepted by NaiveDateTime, split them by hand
        let (date_part, hour_part) = match s.split_once('T') {
            Some((d, h)) => (NaiveDate::parse_from_str(d, "%Y-%m-%d").ok(), h),
            None => match (s.get(..8), s.get(8..)) {
                (Some(d), Some(h)) if s.len() == 10 => {
                    (NaiveDate::parse_from_str(d, "%Y%m%d").ok(), h)
                }
                _ => (None, ""),
            },
        };
        let date = date_part.ok_or_else(|| TimeParseError::InvalidFormat(s.to_string()))?;
        let hour: u32 = hour_part
            .parse()
            .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))?;
        let cycle =
            ModelCycle::from_hour(hour).ok_or_else(|| TimeParseError::NotACycle(s.to_string()))?;
        Ok(Self::new(date, cycle))
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn cycle(&self) -> ModelCycle {
        // The constructor guarantees the hour is a cycle hour
        ModelCycle::from_hour(self.0.hour()).unwrap_or(ModelCycle::Z00)
    }

    /// Valid time of a forecast hour from this initialization.
    pub fn valid_time(&self, forecast_hour: u32) -> DateTime<Utc> {
        self.0 + Duration::hours(forecast_hour as i64)
    }

    /// Date component as used in NOMADS directory names (`20230601`).
    pub fn day_string(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for InitDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl<'de> Deserialize<'de> for InitDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        InitDate::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Format a timestamp the way MPAS and WPS namelists expect (`2023-06-01_06:00:00`).
pub fn namelist_date(time: DateTime<Utc>) -> String {
    time.format(NAMELIST_DATE_FORMAT).to_string()
}

/// Format a run length as `D_HH:MM:SS`, with an unpadded day count.
///
/// Negative durations render as zero.
pub fn run_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);

    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    format!("{}_{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    #[error("Time is not on a 00/06/12/18Z cycle: {0}")]
    NotACycle(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_cycle_display_is_zero_padded() {
        assert_eq!(ModelCycle::Z00.to_string(), "00");
        assert_eq!(ModelCycle::Z06.to_string(), "06");
        assert_eq!(ModelCycle::Z18.to_string(), "18");
    }

    #[test]
    fn test_resolve_cycle_every_hour() {
        for hour in 0..24 {
            let expected = match hour {
                5..=10 => 0,
                11..=16 => 6,
                17..=20 => 12,
                _ => 18,
            };
            assert_eq!(resolve_cycle(at(hour, 30)).hour(), expected, "hour {}", hour);
        }
    }

    #[test]
    fn test_init_date_zeroes_minutes() {
        let now = Utc.with_ymd_and_hms(2023, 6, 1, 13, 47, 12).unwrap();
        let init = resolve_init_date(now);
        assert_eq!(init.datetime().minute(), 0);
        assert_eq!(init.datetime().second(), 0);
        assert_eq!(init.datetime().nanosecond(), 0);
    }

    #[test]
    fn test_init_date_rolls_back_across_year() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap();
        let init = resolve_init_date(now);
        assert_eq!(init.datetime().year(), 2023);
        assert_eq!(init.datetime().month(), 12);
        assert_eq!(init.datetime().day(), 31);
        assert_eq!(init.cycle(), ModelCycle::Z18);
    }

    #[test]
    fn test_run_duration() {
        assert_eq!(run_duration(Duration::hours(6)), "0_06:00:00");
        assert_eq!(run_duration(Duration::hours(24)), "1_00:00:00");
        assert_eq!(run_duration(Duration::hours(84)), "3_12:00:00");
        assert_eq!(run_duration(Duration::seconds(90_061)), "1_01:01:01");
        assert_eq!(run_duration(Duration::hours(-3)), "0_00:00:00");
    }

    #[test]
    fn test_namelist_date() {
        assert_eq!(namelist_date(at(6, 0)), "2023-06-01_06:00:00");
    }
}
