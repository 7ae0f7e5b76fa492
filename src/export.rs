//! CSV downloads of stored observations.
//!
//! Two layouts: a flat one with one line per stored row, and a marine one
//! that pivots rows sharing a timestamp into a single line with wind and
//! wave columns per station. Both start with a UTF-8 byte order mark so
//! spreadsheet software picks up the Japanese headers.
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::db::{ObservationQuery, StoredObservation};
use crate::stations::StationConfig;

pub const CSV_BOM: &str = "\u{feff}";

const CSV_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

const FLAT_HEADERS: [&str; 7] = [
    "観測地点",
    "地点コード",
    "日時",
    "風向",
    "風速(m/s)",
    "波高(m)",
    "登録日時",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer could not be flushed: {0}")]
    Flush(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One line per stored observation
    #[default]
    Flat,
    /// One line per timestamp, columns per station
    Marine,
}

impl ExportFormat {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ExportFormat::Flat => "weather_data",
            ExportFormat::Marine => "marine_weather",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub station_code: Option<String>,
}

impl ExportQuery {
    pub fn observation_query(&self) -> ObservationQuery {
        ObservationQuery {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            station_code: self.station_code.clone(),
            limit: None,
        }
    }
}

fn csv_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(CSV_TIMESTAMP_FORMAT).to_string()
}

fn number_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(CSV_BOM.as_bytes().to_vec())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))
}

/// One line per row, in the order given
pub fn flat_csv(rows: &[StoredObservation]) -> Result<Vec<u8>, ExportError> {
    let mut writer = writer();
    writer.write_record(FLAT_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.station_name.clone(),
            row.station_code.clone(),
            csv_timestamp(&row.timestamp),
            row.wind_direction.clone().unwrap_or_default(),
            number_cell(row.wind_speed),
            number_cell(row.wave_height),
            csv_timestamp(&row.created_at),
        ])?;
    }

    finish(writer)
}

/// Pivot rows into one line per timestamp, in first-seen order.
///
/// Every station gets direction and speed columns, plus a wave column when
/// it reports wave height. Stations without a row at a timestamp leave
/// their cells empty.
pub fn marine_csv(
    rows: &[StoredObservation],
    stations: &[StationConfig],
) -> Result<Vec<u8>, ExportError> {
    let mut order: Vec<NaiveDateTime> = Vec::new();
    let mut grouped: HashMap<NaiveDateTime, HashMap<&str, &StoredObservation>> = HashMap::new();

    for row in rows {
        grouped
            .entry(row.timestamp)
            .or_insert_with(|| {
                order.push(row.timestamp);
                HashMap::new()
            })
            .insert(row.station_code.as_str(), row);
    }

    let mut headers = vec!["日時".to_string()];
    for station in stations {
        headers.push(format!("{}_風向", station.name));
        headers.push(format!("{}_風速", station.name));
        if station.has_wave_height {
            headers.push(format!("{}_波高", station.name));
        }
    }

    let mut writer = writer();
    writer.write_record(&headers)?;

    for timestamp in &order {
        let Some(by_station) = grouped.get(timestamp) else {
            continue;
        };

        let mut record = vec![csv_timestamp(timestamp)];
        for station in stations {
            let row = by_station.get(station.code.as_str());
            record.push(
                row.and_then(|r| r.wind_direction.clone())
                    .unwrap_or_default(),
            );
            record.push(number_cell(row.and_then(|r| r.wind_speed)));
            if station.has_wave_height {
                record.push(number_cell(row.and_then(|r| r.wave_height)));
            }
        }
        writer.write_record(&record)?;
    }

    finish(writer)
}
