use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::observation::timestamp_format;

// Database entity models
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, ToSchema)]
pub struct StoredObservation {
    pub id: i64,
    pub station_name: String,
    pub station_code: String,
    #[serde(with = "timestamp_format")]
    #[schema(value_type = String, example = "2025-06-01 09:15:00")]
    pub timestamp: NaiveDateTime,
    pub wind_direction: Option<String>,
    pub wind_speed: Option<f64>,
    pub wave_height: Option<f64>,
    #[serde(with = "timestamp_format")]
    #[schema(value_type = String, example = "2025-06-01 09:16:02")]
    pub created_at: NaiveDateTime,
}

/// Filters for historical queries. Timestamp bounds are inclusive and are
/// compared as text against the stored "YYYY-MM-DD HH:MM:SS" form
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ObservationQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub station_code: Option<String>,
    pub limit: Option<i64>,
}

// API response DTOs
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WeatherStats {
    pub total_records: i64,
}
