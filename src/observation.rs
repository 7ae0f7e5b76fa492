use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Storage and wire format for observation timestamps.
///
/// Fixed width and zero padded, so string comparison orders the same way
/// as the timestamps themselves.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
}

/// Serde adapter that writes `NaiveDateTime` as `YYYY-MM-DD HH:MM:SS`
pub mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(timestamp))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_timestamp(&value).map_err(serde::de::Error::custom)
    }
}

/// One reading scraped from a station page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Observation {
    pub station_name: String,
    pub station_code: String,
    #[serde(with = "timestamp_format")]
    #[schema(value_type = String, example = "2025-06-01 09:15:00")]
    pub timestamp: NaiveDateTime,
    pub wind_direction: Option<String>,
    pub wind_speed: Option<f64>,
    pub wave_height: Option<f64>,
}

impl Observation {
    /// Observation with every measured field absent
    pub fn placeholder(station_name: &str, station_code: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            station_name: station_name.to_string(),
            station_code: station_code.to_string(),
            timestamp,
            wind_direction: None,
            wind_speed: None,
            wave_height: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.wind_direction.is_none() && self.wind_speed.is_none() && self.wave_height.is_none()
    }
}

/// How an aligned row was resolved against its reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    WithinTolerance,
    Nearest,
    Placeholder,
    /// Reference station had no data, row passed through as scraped
    Unaligned,
}

/// A station's observation resolved for one reference instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AlignedRow {
    #[serde(with = "timestamp_format")]
    #[schema(value_type = String, example = "2025-06-01 09:15:00")]
    pub reference_timestamp: NaiveDateTime,
    pub observation: Observation,
    pub match_kind: MatchKind,
}

impl AlignedRow {
    pub fn is_placeholder(&self) -> bool {
        self.match_kind == MatchKind::Placeholder
    }
}
