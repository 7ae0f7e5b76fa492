use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::db::{DbError, ObservationQuery, ObservationRepository, StoredObservation, WeatherStats};
use crate::observation::{AlignedRow, Observation};
use crate::orchestrator::ScrapeOrchestrator;
use crate::stations::StationConfig;

/// Which aligned observations a scrape cycle writes to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    /// Upsert everything; re-saving a key overwrites it
    #[default]
    All,
    /// Only observations newer than the latest stored one per station
    Incremental,
}

/// What one scrape-and-store cycle did
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSummary {
    pub aligned_rows: usize,
    pub saved: usize,
    pub placeholders_saved: usize,
    pub skipped_stale: usize,
    pub failed_stations: Vec<String>,
}

impl StoreSummary {
    /// Distinct records written. An observation attached to several
    /// reference instants counts once.
    pub fn records_saved(&self) -> usize {
        self.saved + self.placeholders_saved
    }
}

/// Keep the last value per (station_code, timestamp), in first-seen order.
///
/// Aligned rows repeat an observation when it serves several reference
/// instants.
pub fn dedupe_by_key(observations: Vec<Observation>) -> Vec<Observation> {
    let mut index: HashMap<(String, NaiveDateTime), usize> = HashMap::new();
    let mut unique: Vec<Observation> = Vec::with_capacity(observations.len());

    for observation in observations {
        let key = (observation.station_code.clone(), observation.timestamp);
        match index.get(&key) {
            Some(&position) => unique[position] = observation,
            None => {
                index.insert(key, unique.len());
                unique.push(observation);
            }
        }
    }

    unique
}

/// Drop observations not newer than the latest stored timestamp of their
/// station. Stations with nothing stored keep everything.
pub fn retain_newer(
    observations: Vec<Observation>,
    latest: &HashMap<String, NaiveDateTime>,
) -> Vec<Observation> {
    observations
        .into_iter()
        .filter(|o| match latest.get(&o.station_code) {
            Some(stored) => o.timestamp > *stored,
            None => true,
        })
        .collect()
}

#[derive(Clone)]
pub struct ObservationService {
    observation_repo: ObservationRepository,
    orchestrator: ScrapeOrchestrator,
}

impl ObservationService {
    pub fn new(observation_repo: ObservationRepository, orchestrator: ScrapeOrchestrator) -> Self {
        Self {
            observation_repo,
            orchestrator,
        }
    }

    pub fn stations(&self) -> &[StationConfig] {
        self.orchestrator.stations()
    }

    pub async fn get_latest(&self) -> Result<Vec<StoredObservation>, DbError> {
        self.observation_repo.latest_per_station().await
    }

    pub async fn get_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<StoredObservation>, DbError> {
        self.observation_repo.query(query).await
    }

    pub async fn get_stats(&self) -> Result<WeatherStats, DbError> {
        let total_records = self.observation_repo.count().await?;
        Ok(WeatherStats { total_records })
    }

    /// Run one scrape cycle dated today (local wall clock) and persist it
    #[instrument(skip(self))]
    pub async fn scrape_and_store(&self, policy: SavePolicy) -> Result<StoreSummary, DbError> {
        let reference_date = Local::now().date_naive();
        let report = self.orchestrator.scrape_all(reference_date).await;

        let failed_stations: Vec<String> = report
            .failed_stations()
            .map(|o| o.station_code.clone())
            .collect();

        let mut summary = self.store_rows(report.rows, policy).await?;
        summary.failed_stations = failed_stations;

        if !summary.failed_stations.is_empty() {
            warn!("Stations without data this cycle: {:?}", summary.failed_stations);
        }
        Ok(summary)
    }

    /// Persist aligned rows according to the save policy
    #[instrument(skip(self, rows), fields(row_count = rows.len()))]
    pub async fn store_rows(
        &self,
        rows: Vec<AlignedRow>,
        policy: SavePolicy,
    ) -> Result<StoreSummary, DbError> {
        let aligned_rows = rows.len();
        let (placeholders, observations): (Vec<AlignedRow>, Vec<AlignedRow>) =
            rows.into_iter().partition(AlignedRow::is_placeholder);

        let mut observations = dedupe_by_key(observations.into_iter().map(|r| r.observation).collect());
        let mut placeholders = dedupe_by_key(placeholders.into_iter().map(|r| r.observation).collect());

        let mut skipped_stale = 0;
        if policy == SavePolicy::Incremental {
            let latest = self.observation_repo.latest_timestamps().await?;
            let before = observations.len() + placeholders.len();
            observations = retain_newer(observations, &latest);
            placeholders = retain_newer(placeholders, &latest);
            skipped_stale = before - observations.len() - placeholders.len();
            debug!("Incremental save skipped {} stale observations", skipped_stale);
        }

        if observations.is_empty() && placeholders.is_empty() {
            info!("No new data to save");
        }

        let saved = self.observation_repo.upsert_many(&observations).await?;
        let placeholders_saved = self.observation_repo.insert_placeholders(&placeholders).await?;

        Ok(StoreSummary {
            aligned_rows,
            saved,
            placeholders_saved,
            skipped_stale,
            failed_stations: Vec::new(),
        })
    }
}
