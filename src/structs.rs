use chrono::{Datelike, NaiveDate};
use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, Result};

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// Meteorological season bucket.
///
/// The derive order (winter first) is also the sort order used when profile
/// tables are emitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// Maps a calendar month to its season: DJF, MAM, JJA, SON.
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3 | 4 | 5 => Season::Spring,
            6 | 7 | 8 => Season::Summer,
            _ => Season::Autumn,
        }
    }

    /// Season of a calendar date. Pure function of the month.
    pub fn from_date(date: NaiveDate) -> Season {
        Season::from_month(date.month())
    }

    /// Classifies an ISO-format (`YYYY-MM-DD`) date string.
    pub fn from_iso_date(value: &str) -> Result<Season> {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| PipelineError::InvalidDate(value.to_string()))?;
        Ok(Season::from_date(date))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "winter"),
            Season::Spring => write!(f, "spring"),
            Season::Summer => write!(f, "summer"),
            Season::Autumn => write!(f, "autumn"),
        }
    }
}

/// A single loaded temperature reading.
///
/// `temperature` is `None` when the source row left the field empty; such
/// rows stay in the series but never contribute to aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub city: String,
    pub date: NaiveDate,
    pub temperature: Option<f64>,
    pub season: Season,
}

impl Observation {
    pub fn new(city: impl Into<String>, date: NaiveDate, temperature: Option<f64>) -> Self {
        Self {
            city: city.into(),
            date,
            temperature,
            season: Season::from_date(date),
        }
    }
}

/// Baseline statistics for one (city, season) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    pub city: String,
    pub season: Season,
    pub mean_temperature: f64,
    /// Sample standard deviation (n - 1 divisor); `None` when the group
    /// holds a single reading, in which case the band is undefined.
    pub std_temperature: Option<f64>,
    pub count: u32,
}

/// Verdict for one reading against a seasonal baseline.
///
/// When no baseline exists (or its std is undefined) the bounds are zero and
/// `is_normal` is false; callers that need to tell "anomalous" apart from
/// "insufficient data" must consult the profile table themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyCheck {
    pub is_normal: bool,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// One position of a city's annotated, chronologically sorted series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub city: String,
    pub date: NaiveDate,
    pub season: Season,
    pub temperature: Option<f64>,
    pub rolling_mean: Option<f64>,
    pub rolling_std: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    pub is_anomaly: bool,
    pub trend_long: Option<f64>,
}

/// Descriptive statistics over one city's non-missing readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySummary {
    pub city: String,
    pub count: u32,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

/// Window configuration for the historical annotation pass.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Trailing window for the local baseline, in positions.
    pub rolling_window: usize,
    /// Centered window for the long-trend overlay, in positions.
    pub long_window: usize,
    /// Minimum valid readings required inside the long window.
    pub long_min_periods: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rolling_window: 30,
            long_window: 365,
            long_min_periods: 180,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_month_maps_to_a_season() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (4, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (7, Season::Summer),
            (8, Season::Summer),
            (9, Season::Autumn),
            (10, Season::Autumn),
            (11, Season::Autumn),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), season, "month {}", month);
        }
    }

    #[test]
    fn classification_depends_only_on_the_month() {
        let a = NaiveDate::from_ymd_opt(1999, 7, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        assert_eq!(Season::from_date(a), Season::from_date(b));
    }

    #[test]
    fn iso_date_strings_are_classified() {
        assert_eq!(Season::from_iso_date("2023-12-15").unwrap(), Season::Winter);
        assert_eq!(Season::from_iso_date("2023-04-01").unwrap(), Season::Spring);
    }

    #[test]
    fn malformed_iso_dates_are_rejected() {
        assert!(matches!(
            Season::from_iso_date("15.12.2023"),
            Err(PipelineError::InvalidDate(_))
        ));
        assert!(matches!(
            Season::from_iso_date("2023-13-01"),
            Err(PipelineError::InvalidDate(_))
        ));
        assert!(matches!(
            Season::from_iso_date("not a date"),
            Err(PipelineError::InvalidDate(_))
        ));
    }

    #[test]
    fn seasons_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Season::Winter).unwrap(), "\"winter\"");
        assert_eq!(Season::Autumn.to_string(), "autumn");
    }
}
