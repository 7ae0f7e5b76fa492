use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, instrument, warn};

use crate::extract::table::RawRow;
use crate::observation::Observation;
use crate::stations::StationConfig;
use crate::utils::{extract_number, non_missing};

/// Tokens that mark the header row above the data rows
const HEADER_MARKERS: &[&str] = &["時刻", "time", "時"];

const MIN_DATA_CELLS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row has {0} cells, expected at least 3")]
    TooFewCells(usize),
    #[error("time cell '{0}' has no ':'")]
    MissingTime(String),
    #[error("invalid time '{0}'")]
    InvalidTime(String),
}

impl RowError {
    /// Note and footer rows fail this way on every page
    fn is_routine(&self) -> bool {
        matches!(self, RowError::TooFewCells(_) | RowError::MissingTime(_))
    }
}

/// Cells of one data row, located by layout
#[derive(Debug, PartialEq)]
struct RowCells<'a> {
    date: Option<&'a str>,
    time: &'a str,
    direction: &'a str,
    speed: &'a str,
    wave: Option<&'a str>,
}

/// Locate the cells of a data row.
///
/// Station pages use two layouts: `date, time, direction, speed, ...` with
/// the wave height (when reported) in the last column, and
/// `time, direction, speed[, wave]`. Rows of four or more cells whose first
/// cell carries no ':' are taken to be dated. This is a heuristic over the
/// layouts seen so far, not a schema.
fn locate_cells(row: &[String]) -> Result<RowCells<'_>, RowError> {
    if row.len() < MIN_DATA_CELLS {
        return Err(RowError::TooFewCells(row.len()));
    }

    if row.len() >= 4 && !row[0].contains(':') {
        Ok(RowCells {
            date: Some(row[0].as_str()),
            time: row[1].as_str(),
            direction: row[2].as_str(),
            speed: row[3].as_str(),
            wave: if row.len() > 4 {
                row.last().map(String::as_str)
            } else {
                None
            },
        })
    } else {
        Ok(RowCells {
            date: None,
            time: row[0].as_str(),
            direction: row[1].as_str(),
            speed: row[2].as_str(),
            wave: row.get(3).map(String::as_str),
        })
    }
}

/// Parse "HH:MM" (trailing ":SS" ignored, empty minutes read as 0)
fn parse_time(text: &str) -> Result<NaiveTime, RowError> {
    let trimmed = text.trim();
    if !trimmed.contains(':') {
        return Err(RowError::MissingTime(trimmed.to_string()));
    }

    let invalid = || RowError::InvalidTime(trimmed.to_string());
    let mut parts = trimmed.split(':');

    let hour = parts
        .next()
        .map(str::trim)
        .ok_or_else(invalid)?
        .parse::<u32>()
        .map_err(|_| invalid())?;

    let minute = match parts.next().map(str::trim) {
        None | Some("") => 0,
        Some(value) => value.parse::<u32>().map_err(|_| invalid())?,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Parse a "Y/M/D" date cell
fn parse_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.trim().split('/').map(str::trim).collect();
    if parts.len() < 3 {
        return None;
    }

    let year = parts[0].parse::<i32>().ok()?;
    let month = parts[1].parse::<u32>().ok()?;
    let day = parts[2].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn is_header_row(row: &[String]) -> bool {
    let text = row.join(" ").to_lowercase();
    HEADER_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Convert one data row into an observation.
///
/// `reference_date` supplies the date for rows that carry only a time of
/// day, and for dated rows whose date cell does not parse.
pub fn parse_row(
    row: &[String],
    station: &StationConfig,
    reference_date: NaiveDate,
) -> Result<Observation, RowError> {
    let cells = locate_cells(row)?;
    let time = parse_time(cells.time)?;
    let date = cells.date.and_then(parse_date).unwrap_or(reference_date);

    let wave_height = if station.has_wave_height {
        cells.wave.and_then(extract_number)
    } else {
        None
    };

    Ok(Observation {
        station_name: station.name.clone(),
        station_code: station.code.clone(),
        timestamp: NaiveDateTime::new(date, time),
        wind_direction: non_missing(cells.direction).map(str::to_string),
        wind_speed: extract_number(cells.speed),
        wave_height,
    })
}

/// Build observations from the extracted rows of one station page.
///
/// Rows up to and including the first header row are ignored. Rows that
/// cannot be interpreted are logged and skipped.
#[instrument(skip(rows, station), fields(station_code = %station.code, row_count = rows.len()))]
pub fn build_observations(
    rows: &[RawRow],
    station: &StationConfig,
    reference_date: NaiveDate,
) -> Vec<Observation> {
    let Some(header_index) = rows.iter().position(|row| is_header_row(row)) else {
        warn!("No header row found for station {}", station.code);
        return Vec::new();
    };

    let mut observations = Vec::new();
    let mut skipped_rows = 0;

    for (offset, row) in rows[header_index + 1..].iter().enumerate() {
        let row_number = header_index + 1 + offset;
        match parse_row(row, station, reference_date) {
            Ok(observation) => observations.push(observation),
            Err(e) if e.is_routine() => {
                debug!("Row {} skipped: {} ({:?})", row_number, e, row);
            }
            Err(e) => {
                warn!("Failed to parse row {} for {}: {} ({:?})", row_number, station.code, e, row);
                skipped_rows += 1;
            }
        }
    }

    if skipped_rows > 0 {
        warn!("Skipped {} unparseable rows for {}", skipped_rows, station.code);
    }
    debug!("Built {} observations", observations.len());

    observations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> RawRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn station(has_wave_height: bool) -> StationConfig {
        StationConfig::new("テスト", "test_station", "http://localhost/test", has_wave_height, 15)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_time_variants() {
        assert_eq!(parse_time("09:15").unwrap(), NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(parse_time(" 9:05 ").unwrap(), NaiveTime::from_hms_opt(9, 5, 0).unwrap());
        assert_eq!(parse_time("23:45:30").unwrap(), NaiveTime::from_hms_opt(23, 45, 0).unwrap());
        assert_eq!(parse_time("7:").unwrap(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_time_rejects_bad_input() {
        assert_eq!(parse_time("0915"), Err(RowError::MissingTime("0915".to_string())));
        assert_eq!(parse_time("25:00"), Err(RowError::InvalidTime("25:00".to_string())));
        assert_eq!(parse_time("ab:cd"), Err(RowError::InvalidTime("ab:cd".to_string())));
        assert_eq!(parse_time("09:7x"), Err(RowError::InvalidTime("09:7x".to_string())));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024/12/31"), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(parse_date("2024/2/30"), None);
        assert_eq!(parse_date("12/31"), None);
        assert_eq!(parse_date("昨日"), None);
    }

    #[test]
    fn test_time_first_row_uses_reference_date() {
        let obs = parse_row(&row(&["09:15", "NNE", "8m"]), &station(false), today()).unwrap();

        assert_eq!(obs.timestamp, at(today(), 9, 15));
        assert_eq!(obs.wind_direction.as_deref(), Some("NNE"));
        assert_eq!(obs.wind_speed, Some(8.0));
        assert_eq!(obs.wave_height, None);
        assert_eq!(obs.station_code, "test_station");
        assert_eq!(obs.station_name, "テスト");
    }

    #[test]
    fn test_dated_row_overrides_reference_date() {
        let obs = parse_row(
            &row(&["2025/05/31", "23:45", "SW", "12.5m/s"]),
            &station(false),
            today(),
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        assert_eq!(obs.timestamp, at(date, 23, 45));
        assert_eq!(obs.wind_speed, Some(12.5));
    }

    #[test]
    fn test_dated_row_with_bad_date_falls_back() {
        let obs = parse_row(&row(&["31日", "06:00", "N", "3"]), &station(false), today()).unwrap();
        assert_eq!(obs.timestamp, at(today(), 6, 0));
    }

    #[test]
    fn test_wave_height_read_from_last_column_of_wide_row() {
        let cells = row(&["2025/06/01", "10:00", "E", "5m", "1012hPa", "1.5m"]);

        let obs = parse_row(&cells, &station(true), today()).unwrap();
        assert_eq!(obs.wave_height, Some(1.5));

        let obs = parse_row(&cells, &station(false), today()).unwrap();
        assert_eq!(obs.wave_height, None);
    }

    #[test]
    fn test_four_cell_dated_row_has_no_wave() {
        let obs = parse_row(
            &row(&["2025/06/01", "10:00", "E", "5m"]),
            &station(true),
            today(),
        )
        .unwrap();
        assert_eq!(obs.wave_height, None);
    }

    #[test]
    fn test_time_first_row_with_wave_column() {
        let obs = parse_row(&row(&["10:30", "S", "6", "0.8"]), &station(true), today()).unwrap();

        assert_eq!(obs.timestamp, at(today(), 10, 30));
        assert_eq!(obs.wind_speed, Some(6.0));
        assert_eq!(obs.wave_height, Some(0.8));
    }

    #[test]
    fn test_missing_markers_become_absent() {
        let obs = parse_row(&row(&["11:00", "-", "-", "-"]), &station(true), today()).unwrap();

        assert_eq!(obs.wind_direction, None);
        assert_eq!(obs.wind_speed, None);
        assert_eq!(obs.wave_height, None);
    }

    #[test]
    fn test_short_row_rejected() {
        let result = parse_row(&row(&["09:00", "N"]), &station(false), today());
        assert_eq!(result, Err(RowError::TooFewCells(2)));
    }

    #[test]
    fn test_build_skips_rows_through_header() {
        let rows = vec![
            row(&["伊良湖岬 気象現況"]),
            row(&["時刻", "風向", "風速"]),
            row(&["09:00", "N", "5m"]),
            row(&["09:15", "NNE", "6m"]),
        ];

        let observations = build_observations(&rows, &station(false), today());
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].timestamp, at(today(), 9, 0));
        assert_eq!(observations[1].timestamp, at(today(), 9, 15));
    }

    #[test]
    fn test_build_header_match_is_case_insensitive() {
        let rows = vec![row(&["TIME", "Dir", "Speed"]), row(&["12:00", "W", "4"])];

        let observations = build_observations(&rows, &station(false), today());
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn test_build_without_header_yields_nothing() {
        let rows = vec![row(&["09:00", "N", "5m"]), row(&["09:15", "N", "6m"])];
        assert!(build_observations(&rows, &station(false), today()).is_empty());
    }

    #[test]
    fn test_build_continues_past_bad_rows() {
        let rows = vec![
            row(&["時刻", "風向", "風速"]),
            row(&["09:00", "N", "5m"]),
            row(&["99:99", "N", "5m"]),
            row(&["注意事項"]),
            row(&["欠測", "-", "-"]),
            row(&["09:30", "NE", "7m"]),
        ];

        let observations = build_observations(&rows, &station(false), today());
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1].wind_direction.as_deref(), Some("NE"));
    }
}
