use chrono::NaiveDateTime;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

use crate::db::{DbError, ObservationQuery, StoredObservation};
use crate::observation::{format_timestamp, parse_timestamp, Observation};

const SELECT_COLUMNS: &str = "SELECT id, station_name, station_code, timestamp, wind_direction, \
     wind_speed, wave_height, created_at FROM weather_observations";

#[derive(Clone)]
pub struct ObservationRepository {
    pool: SqlitePool,
}

impl ObservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite observations keyed by (station_code, timestamp).
    ///
    /// Records are written independently: a failing record is logged and
    /// the rest of the batch is still attempted. Returns the number saved.
    #[instrument(skip(self, observations), fields(count = observations.len()))]
    pub async fn upsert_many(&self, observations: &[Observation]) -> Result<usize, DbError> {
        debug!("Upserting {} observations", observations.len());
        let mut saved = 0;
        let mut failed = 0;

        for observation in observations {
            let result = sqlx::query(
                r#"
                INSERT INTO weather_observations (
                    station_name, station_code, timestamp,
                    wind_direction, wind_speed, wave_height
                )
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT (station_code, timestamp) DO UPDATE SET
                    station_name = excluded.station_name,
                    wind_direction = excluded.wind_direction,
                    wind_speed = excluded.wind_speed,
                    wave_height = excluded.wave_height
                "#,
            )
            .bind(&observation.station_name)
            .bind(&observation.station_code)
            .bind(format_timestamp(&observation.timestamp))
            .bind(&observation.wind_direction)
            .bind(observation.wind_speed)
            .bind(observation.wave_height)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => saved += 1,
                Err(e) => {
                    error!(
                        station_code = %observation.station_code,
                        timestamp = %observation.timestamp,
                        error = %e,
                        "Failed to upsert observation"
                    );
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            warn!("{} of {} observations could not be saved", failed, observations.len());
        }
        info!("Saved {} weather records to database", saved);
        Ok(saved)
    }

    /// Record empty rows for (station, instant) pairs that have no data.
    ///
    /// Existing rows are left untouched so a gap never overwrites a real
    /// reading. Returns the number of rows actually inserted.
    #[instrument(skip(self, placeholders), fields(count = placeholders.len()))]
    pub async fn insert_placeholders(&self, placeholders: &[Observation]) -> Result<usize, DbError> {
        let mut inserted = 0;

        for placeholder in placeholders {
            let result = sqlx::query(
                r#"
                INSERT INTO weather_observations (station_name, station_code, timestamp)
                VALUES (?, ?, ?)
                ON CONFLICT (station_code, timestamp) DO NOTHING
                "#,
            )
            .bind(&placeholder.station_name)
            .bind(&placeholder.station_code)
            .bind(format_timestamp(&placeholder.timestamp))
            .execute(&self.pool)
            .await;

            match result {
                Ok(done) => inserted += done.rows_affected() as usize,
                Err(e) => error!(
                    station_code = %placeholder.station_code,
                    timestamp = %placeholder.timestamp,
                    error = %e,
                    "Failed to insert placeholder"
                ),
            }
        }

        debug!("Inserted {} placeholder rows", inserted);
        Ok(inserted)
    }

    /// Observations matching the filter, newest first
    #[instrument(skip(self))]
    pub async fn query(&self, filter: &ObservationQuery) -> Result<Vec<StoredObservation>, DbError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(start) = &filter.start_date {
            builder.push(" AND timestamp >= ").push_bind(start.clone());
        }
        if let Some(end) = &filter.end_date {
            builder.push(" AND timestamp <= ").push_bind(end.clone());
        }
        if let Some(code) = &filter.station_code {
            builder.push(" AND station_code = ").push_bind(code.clone());
        }

        builder.push(" ORDER BY timestamp DESC, station_code");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let observations = builder
            .build_query_as::<StoredObservation>()
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} observations", observations.len());
        Ok(observations)
    }

    /// The most recent row of every station, ordered by station code
    #[instrument(skip(self))]
    pub async fn latest_per_station(&self) -> Result<Vec<StoredObservation>, DbError> {
        let sql = format!(
            "{SELECT_COLUMNS} w1 \
             WHERE timestamp = ( \
                 SELECT MAX(timestamp) FROM weather_observations w2 \
                 WHERE w2.station_code = w1.station_code \
             ) \
             ORDER BY station_code"
        );

        let observations = sqlx::query_as::<_, StoredObservation>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found latest rows for {} stations", observations.len());
        Ok(observations)
    }

    /// Latest stored timestamp per station code
    #[instrument(skip(self))]
    pub async fn latest_timestamps(&self) -> Result<HashMap<String, NaiveDateTime>, DbError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT station_code, MAX(timestamp)
            FROM weather_observations
            GROUP BY station_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut latest = HashMap::with_capacity(rows.len());
        for (station_code, timestamp) in rows {
            match parse_timestamp(&timestamp) {
                Ok(parsed) => {
                    latest.insert(station_code, parsed);
                }
                Err(e) => warn!(
                    "Ignoring unparseable stored timestamp '{}' for {}: {}",
                    timestamp, station_code, e
                ),
            }
        }

        Ok(latest)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM weather_observations")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
