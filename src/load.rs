use crate::error::{PipelineError, Result};
use crate::structs::Observation;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::{fs::File, io::Read, path::Path};

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Loads a weather history CSV into observations, tagging each row with its
/// season.
///
/// Required columns: `city`, `temperature`, and a date column named either
/// `timestamp` or `date` (`timestamp` wins when both exist). A missing
/// column aborts the load; a row whose date fails to parse is skipped with a
/// warning. An empty or non-finite temperature field is kept as a missing
/// reading.
pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    debug!("Reading CSV file: {}", path.display());
    let file = File::open(path)?;
    read_observations(file)
}

/// Same contract as [`load_observations`], over any reader.
pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let city_idx = column_index(&headers, "city")?;
    let temp_idx = column_index(&headers, "temperature")?;
    let date_idx = column_index(&headers, "timestamp")
        .or_else(|_| column_index(&headers, "date"))
        .map_err(|_| PipelineError::MissingColumn("timestamp or date".to_string()))?;

    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for record in csv_reader.records() {
        let record = record?;
        let date = match parse_date(&record[date_idx]) {
            Ok(date) => date,
            Err(_) => {
                skipped += 1;
                warn!("Skipping row with unparseable date: {:?}", &record[date_idx]);
                continue;
            }
        };
        let temperature = parse_temperature(&record[temp_idx])?;
        observations.push(Observation::new(record[city_idx].to_string(), date, temperature));
    }

    if skipped > 0 {
        debug!("Skipped {} rows with unparseable dates", skipped);
    }
    debug!("Loaded {} observations", observations.len());
    Ok(observations)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

/// Parses a date cell. Accepts plain dates, the common datetime spellings,
/// and RFC 3339 timestamps.
fn parse_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_ONLY_FORMAT) {
        return Ok(date);
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.date_naive());
    }
    Err(PipelineError::InvalidDate(trimmed.to_string()))
}

/// An empty cell is a missing reading. A cell that parses to a non-finite
/// value is treated the same way, so NaN can never enter the aggregates.
fn parse_temperature(value: &str) -> Result<Option<f64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let parsed: f64 = trimmed
        .parse()
        .map_err(|_| PipelineError::Data(format!("Invalid temperature value: {}", trimmed)))?;
    Ok(parsed.is_finite().then_some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Season;

    #[test]
    fn loads_rows_and_derives_seasons() {
        let csv = "city,date,temperature\n\
                   Berlin,2020-01-15,-3.2\n\
                   Berlin,2020-07-15,24.0\n\
                   Moscow,2020-10-01,6.5\n";
        let observations = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].city, "Berlin");
        assert_eq!(observations[0].season, Season::Winter);
        assert_eq!(observations[0].temperature, Some(-3.2));
        assert_eq!(observations[1].season, Season::Summer);
        assert_eq!(observations[2].season, Season::Autumn);
    }

    #[test]
    fn timestamp_column_wins_over_date() {
        let csv = "city,date,timestamp,temperature\n\
                   Berlin,2020-01-15,2020-07-15T12:00:00,20.0\n";
        let observations = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(observations[0].season, Season::Summer);
        assert_eq!(
            observations[0].date,
            NaiveDate::from_ymd_opt(2020, 7, 15).unwrap()
        );
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let no_city = "date,temperature\n2020-01-15,1.0\n";
        assert!(matches!(
            read_observations(no_city.as_bytes()),
            Err(PipelineError::MissingColumn(_))
        ));

        let no_date = "city,temperature\nBerlin,1.0\n";
        let err = read_observations(no_date.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("timestamp or date"));

        let no_temp = "city,date\nBerlin,2020-01-15\n";
        assert!(matches!(
            read_observations(no_temp.as_bytes()),
            Err(PipelineError::MissingColumn(_))
        ));
    }

    #[test]
    fn unparseable_date_rows_are_skipped() {
        let csv = "city,date,temperature\n\
                   Berlin,garbage,1.0\n\
                   Berlin,2020-01-15,2.0\n";
        let observations = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].temperature, Some(2.0));
    }

    #[test]
    fn empty_and_non_finite_temperatures_become_missing() {
        let csv = "city,date,temperature\n\
                   Berlin,2020-01-15,\n\
                   Berlin,2020-01-16,NaN\n\
                   Berlin,2020-01-17,3.5\n";
        let observations = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].temperature, None);
        assert_eq!(observations[1].temperature, None);
        assert_eq!(observations[2].temperature, Some(3.5));
    }

    #[test]
    fn malformed_temperature_is_a_data_error() {
        let csv = "city,date,temperature\nBerlin,2020-01-15,cold\n";
        assert!(matches!(
            read_observations(csv.as_bytes()),
            Err(PipelineError::Data(_))
        ));
    }

    #[test]
    fn datetime_and_rfc3339_dates_parse() {
        assert_eq!(
            parse_date("2020-03-01 08:30:00").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
        assert_eq!(
            parse_date("2020-03-01T08:30:00+02:00").unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
        );
        assert!(parse_date("01/03/2020").is_err());
    }
}
