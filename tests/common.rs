#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use marine_weather_service::db;
use marine_weather_service::observation::Observation;
use marine_weather_service::stations::StationConfig;
use sqlx::SqlitePool;

/// Fresh in-memory database with migrations applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn observation(code: &str, timestamp: NaiveDateTime, wind_speed: Option<f64>) -> Observation {
    Observation {
        station_name: format!("Station {}", code),
        station_code: code.to_string(),
        timestamp,
        wind_direction: Some("北".to_string()),
        wind_speed,
        wave_height: None,
    }
}

pub fn station(code: &str, url: &str, has_wave_height: bool, interval: i64) -> StationConfig {
    StationConfig::new(&format!("Station {}", code), code, url, has_wave_height, interval)
}

/// A station page in the dated layout: date, time, direction, speed,
/// pressure, wave. `rows` are (time, direction, speed, wave) on 2025/06/01.
pub fn station_page(rows: &[(&str, &str, &str, &str)]) -> String {
    let mut html = String::from(
        "<html><body><table>\
         <tr><th>日付</th><th>時刻</th><th>風向</th><th>風速</th><th>気圧</th><th>波高</th></tr>",
    );
    for (time, direction, speed, wave) in rows {
        html.push_str(&format!(
            "<tr><td>2025/06/01</td><td>{}</td><td>{}</td><td>{}</td><td>1012</td><td>{}</td></tr>",
            time, direction, speed, wave
        ));
    }
    html.push_str("</table></body></html>");
    html
}
