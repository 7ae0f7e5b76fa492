//! Alignment of multi-station observations onto one timeline.
//!
//! Stations refresh their pages at different cadences (15 or 30 minutes)
//! and the scraped timestamps drift with page latency. The reference
//! station's timestamps become the canonical instants, and every configured
//! station is resolved against each instant using its own update interval
//! as the tolerance window.
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use crate::observation::{AlignedRow, MatchKind, Observation};
use crate::stations::StationConfig;

/// Absolute distance between two instants in seconds
fn seconds_apart(a: NaiveDateTime, b: NaiveDateTime) -> i64 {
    (a - b).num_seconds().abs()
}

/// Resolve one station's observation for a reference instant.
///
/// Exact timestamp matches win. Otherwise the first observation in scrape
/// order within `tolerance_minutes` is taken, not the nearest one. When
/// nothing falls inside the window the globally nearest observation is
/// used, ties going to the earlier one in scrape order.
pub fn resolve<'a>(
    candidates: &[&'a Observation],
    reference: NaiveDateTime,
    tolerance_minutes: i64,
) -> Option<(&'a Observation, MatchKind)> {
    if let Some(exact) = candidates.iter().find(|o| o.timestamp == reference) {
        return Some((*exact, MatchKind::Exact));
    }

    if let Some(within) = candidates
        .iter()
        .find(|o| seconds_apart(o.timestamp, reference) <= tolerance_minutes * 60)
    {
        return Some((*within, MatchKind::WithinTolerance));
    }

    // min_by_key keeps the first of equal keys
    candidates
        .iter()
        .min_by_key(|o| seconds_apart(o.timestamp, reference))
        .map(|nearest| (*nearest, MatchKind::Nearest))
}

/// Align all scraped observations to the reference station's timestamps.
///
/// Emits one row per (reference instant, configured station), in instant
/// order then configuration order. Stations without any observation in the
/// batch get placeholder rows. If the reference station produced nothing,
/// the observations are returned as scraped, marked `Unaligned`.
#[instrument(skip(observations, stations), fields(observation_count = observations.len(), station_count = stations.len()))]
pub fn align(
    observations: &[Observation],
    stations: &[StationConfig],
    reference_code: &str,
) -> Vec<AlignedRow> {
    let reference_instants: Vec<NaiveDateTime> = observations
        .iter()
        .filter(|o| o.station_code == reference_code)
        .map(|o| o.timestamp)
        .collect();

    if reference_instants.is_empty() {
        warn!(
            "No observations from reference station {}, returning {} observations unaligned",
            reference_code,
            observations.len()
        );
        return observations
            .iter()
            .map(|o| AlignedRow {
                reference_timestamp: o.timestamp,
                observation: o.clone(),
                match_kind: MatchKind::Unaligned,
            })
            .collect();
    }

    let mut by_station: HashMap<&str, Vec<&Observation>> = HashMap::new();
    for observation in observations {
        by_station
            .entry(observation.station_code.as_str())
            .or_default()
            .push(observation);
    }

    let mut aligned = Vec::with_capacity(reference_instants.len() * stations.len());
    for &instant in &reference_instants {
        for station in stations {
            let candidates = by_station
                .get(station.code.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();

            let row = match resolve(candidates, instant, station.update_interval_minutes) {
                Some((observation, match_kind)) => AlignedRow {
                    reference_timestamp: instant,
                    observation: observation.clone(),
                    match_kind,
                },
                None => AlignedRow {
                    reference_timestamp: instant,
                    observation: Observation::placeholder(&station.name, &station.code, instant),
                    match_kind: MatchKind::Placeholder,
                },
            };
            aligned.push(row);
        }
    }

    let placeholders = aligned.iter().filter(|r| r.is_placeholder()).count();
    debug!("{} placeholder rows", placeholders);
    info!(
        "Aligned {} rows ({} instants x {} stations)",
        aligned.len(),
        reference_instants.len(),
        stations.len()
    );

    aligned
}
