// Tests for ObservationRepository against an in-memory SQLite database

mod common;

use common::{at, observation, test_pool};
use marine_weather_service::db::{ObservationQuery, ObservationRepository};
use marine_weather_service::observation::Observation;

#[tokio::test]
async fn test_save_then_query_by_code_and_exact_range() {
    let repo = ObservationRepository::new(test_pool().await);
    let saved = repo
        .upsert_many(&[
            observation("daiosaki_lt", at(9, 0), Some(8.0)),
            observation("daiosaki_lt", at(9, 15), Some(9.0)),
            observation("iragomisaki_vtss", at(9, 0), Some(5.0)),
        ])
        .await
        .expect("upsert failed");
    assert_eq!(saved, 3);

    let rows = repo
        .query(&ObservationQuery {
            start_date: Some("2025-06-01 09:00:00".to_string()),
            end_date: Some("2025-06-01 09:00:00".to_string()),
            station_code: Some("daiosaki_lt".to_string()),
            limit: None,
        })
        .await
        .expect("query failed");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].station_code, "daiosaki_lt");
    assert_eq!(rows[0].timestamp, at(9, 0));
    assert_eq!(rows[0].wind_speed, Some(8.0));
    assert_eq!(rows[0].wind_direction.as_deref(), Some("北"));
}

#[tokio::test]
async fn test_upsert_twice_keeps_one_row_with_latest_values() {
    let repo = ObservationRepository::new(test_pool().await);

    repo.upsert_many(&[observation("daiosaki_lt", at(9, 0), Some(8.0))])
        .await
        .unwrap();
    let first = repo.query(&ObservationQuery::default()).await.unwrap();

    let mut updated = observation("daiosaki_lt", at(9, 0), Some(11.5));
    updated.wave_height = Some(2.0);
    repo.upsert_many(&[updated]).await.unwrap();

    let rows = repo.query(&ObservationQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].wind_speed, Some(11.5));
    assert_eq!(rows[0].wave_height, Some(2.0));
    assert_eq!(rows[0].id, first[0].id);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_query_orders_newest_first_and_applies_limit() {
    let repo = ObservationRepository::new(test_pool().await);
    repo.upsert_many(&[
        observation("a", at(8, 0), Some(1.0)),
        observation("a", at(9, 0), Some(2.0)),
        observation("b", at(9, 0), Some(3.0)),
        observation("a", at(10, 0), Some(4.0)),
    ])
    .await
    .unwrap();

    let rows = repo.query(&ObservationQuery::default()).await.unwrap();
    let keys: Vec<(&str, _)> = rows
        .iter()
        .map(|r| (r.station_code.as_str(), r.timestamp))
        .collect();
    assert_eq!(
        keys,
        vec![("a", at(10, 0)), ("a", at(9, 0)), ("b", at(9, 0)), ("a", at(8, 0))]
    );

    let limited = repo
        .query(&ObservationQuery {
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].timestamp, at(10, 0));
}

#[tokio::test]
async fn test_query_start_bound_is_inclusive() {
    let repo = ObservationRepository::new(test_pool().await);
    repo.upsert_many(&[
        observation("a", at(8, 45), Some(1.0)),
        observation("a", at(9, 0), Some(2.0)),
        observation("a", at(9, 15), Some(3.0)),
    ])
    .await
    .unwrap();

    let rows = repo
        .query(&ObservationQuery {
            start_date: Some("2025-06-01 09:00:00".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.timestamp >= at(9, 0)));
}

#[tokio::test]
async fn test_latest_per_station() {
    let repo = ObservationRepository::new(test_pool().await);
    repo.upsert_many(&[
        observation("b", at(9, 0), Some(1.0)),
        observation("a", at(9, 0), Some(2.0)),
        observation("a", at(9, 30), Some(3.0)),
        observation("b", at(8, 30), Some(4.0)),
    ])
    .await
    .unwrap();

    let latest = repo.latest_per_station().await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].station_code, "a");
    assert_eq!(latest[0].timestamp, at(9, 30));
    assert_eq!(latest[1].station_code, "b");
    assert_eq!(latest[1].timestamp, at(9, 0));

    let timestamps = repo.latest_timestamps().await.unwrap();
    assert_eq!(timestamps.get("a"), Some(&at(9, 30)));
    assert_eq!(timestamps.get("b"), Some(&at(9, 0)));
}

#[tokio::test]
async fn test_placeholder_never_overwrites_real_reading() {
    let repo = ObservationRepository::new(test_pool().await);
    repo.upsert_many(&[observation("a", at(9, 0), Some(7.0))])
        .await
        .unwrap();

    let inserted = repo
        .insert_placeholders(&[
            Observation::placeholder("Station a", "a", at(9, 0)),
            Observation::placeholder("Station a", "a", at(9, 15)),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let rows = repo
        .query(&ObservationQuery {
            station_code: Some("a".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].timestamp, at(9, 15));
    assert_eq!(rows[0].wind_speed, None);
    assert_eq!(rows[0].wind_direction, None);
    assert_eq!(rows[1].timestamp, at(9, 0));
    assert_eq!(rows[1].wind_speed, Some(7.0));
}

#[tokio::test]
async fn test_real_reading_fills_placeholder() {
    let repo = ObservationRepository::new(test_pool().await);
    repo.insert_placeholders(&[Observation::placeholder("Station a", "a", at(9, 0))])
        .await
        .unwrap();
    repo.upsert_many(&[observation("a", at(9, 0), Some(6.5))])
        .await
        .unwrap();

    let rows = repo.query(&ObservationQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].wind_speed, Some(6.5));
}

#[tokio::test]
async fn test_empty_database() {
    let repo = ObservationRepository::new(test_pool().await);
    assert_eq!(repo.count().await.unwrap(), 0);
    assert!(repo.latest_per_station().await.unwrap().is_empty());
    assert!(repo.latest_timestamps().await.unwrap().is_empty());
    assert_eq!(repo.upsert_many(&[]).await.unwrap(), 0);
}
