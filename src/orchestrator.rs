use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::alignment::align;
use crate::extract::{build_observations, extract_rows};
use crate::fetch_error::FetchError;
use crate::fetcher::StationPageFetcher;
use crate::observation::{AlignedRow, Observation};
use crate::stations::{find_station, StationConfig};

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Unknown station: {0}")]
    UnknownStation(String),
    #[error("Failed to fetch station page: {0}")]
    Fetch(#[from] FetchError),
}

/// Result of scraping one station within a cycle
#[derive(Debug, Clone)]
pub struct StationOutcome {
    pub station_code: String,
    pub observations: usize,
    pub error: Option<String>,
}

/// Everything one scrape cycle produced
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub rows: Vec<AlignedRow>,
    pub outcomes: Vec<StationOutcome>,
}

impl ScrapeReport {
    pub fn failed_stations(&self) -> impl Iterator<Item = &StationOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Extract observations from one fetched station page.
///
/// A page without a usable table yields no observations.
pub fn process_page(html: &str, station: &StationConfig, reference_date: NaiveDate) -> Vec<Observation> {
    let rows = extract_rows(html);
    if rows.is_empty() {
        warn!("No table found for station: {}", station.code);
        return Vec::new();
    }

    build_observations(&rows, station, reference_date)
}

/// Runs one scrape cycle: every configured station in order, one at a
/// time, then alignment onto the reference station's timeline
#[derive(Clone)]
pub struct ScrapeOrchestrator {
    fetcher: StationPageFetcher,
    stations: Vec<StationConfig>,
    reference_code: String,
    request_delay: Duration,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: StationPageFetcher,
        stations: Vec<StationConfig>,
        reference_code: String,
        request_delay: Duration,
    ) -> Self {
        Self {
            fetcher,
            stations,
            reference_code,
            request_delay,
        }
    }

    pub fn stations(&self) -> &[StationConfig] {
        &self.stations
    }

    pub fn reference_code(&self) -> &str {
        &self.reference_code
    }

    #[instrument(skip(self, station), fields(station_code = %station.code))]
    async fn fetch_observations(
        &self,
        station: &StationConfig,
        reference_date: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError> {
        info!("Scraping {}...", station.name);
        let html = self.fetcher.fetch_page(&station.url).await?;
        let observations = process_page(&html, station, reference_date);
        info!("Scraped {} records from {}", observations.len(), station.name);
        Ok(observations)
    }

    /// Scrape a single configured station, without alignment
    pub async fn scrape_station(
        &self,
        station_code: &str,
        reference_date: NaiveDate,
    ) -> Result<Vec<Observation>, ScrapeError> {
        let station = find_station(&self.stations, station_code)
            .ok_or_else(|| ScrapeError::UnknownStation(station_code.to_string()))?;

        Ok(self.fetch_observations(station, reference_date).await?)
    }

    /// Scrape all stations and align the result.
    ///
    /// A station that cannot be fetched contributes no observations; the
    /// cycle carries on with the next one after the politeness delay.
    #[instrument(skip(self), fields(stations = self.stations.len(), reference = %self.reference_code))]
    pub async fn scrape_all(&self, reference_date: NaiveDate) -> ScrapeReport {
        let mut all_observations = Vec::new();
        let mut outcomes = Vec::with_capacity(self.stations.len());

        for (index, station) in self.stations.iter().enumerate() {
            match self.fetch_observations(station, reference_date).await {
                Ok(observations) => {
                    outcomes.push(StationOutcome {
                        station_code: station.code.clone(),
                        observations: observations.len(),
                        error: None,
                    });
                    all_observations.extend(observations);
                }
                Err(e) => {
                    error!("Failed to scrape {}: {}", station.name, e);
                    outcomes.push(StationOutcome {
                        station_code: station.code.clone(),
                        observations: 0,
                        error: Some(e.to_string()),
                    });
                }
            }

            let is_last = index + 1 == self.stations.len();
            if !is_last && !self.request_delay.is_zero() {
                debug!("Waiting {:?} before next station", self.request_delay);
                tokio::time::sleep(self.request_delay).await;
            }
        }

        info!(
            "Collected {} observations from {} stations",
            all_observations.len(),
            self.stations.len()
        );

        let rows = align(&all_observations, &self.stations, &self.reference_code);
        ScrapeReport { rows, outcomes }
    }
}
