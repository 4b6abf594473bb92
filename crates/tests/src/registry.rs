/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::support::*;
use ride_dispatch_service::{
    common::types::*,
    domain::{action::ui::events, types::ui::events::InboundEvent},
};
use std::sync::Arc;

#[tokio::test]
async fn last_write_wins_for_the_same_driver() {
    let data = app_state();
    let (first, _first_rx) = connect(&data);
    let (second, _second_rx) = connect(&data);

    report_location(&data, &first, "driver-1", 12.90, 77.60).await;
    report_location(&data, &first, "driver-1", 12.91, 77.61).await;
    report_location(&data, &second, "driver-1", 12.95, 77.65).await;

    let records = data.registry.scan_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].driver_id, DriverId("driver-1".to_string()));
    assert_eq!(records[0].pt, Point::new(12.95, 77.65));
    assert_eq!(records[0].connection_id, second);
}

#[tokio::test(start_paused = true)]
async fn records_disappear_after_ttl_without_refresh() {
    let data = app_state();
    let (connection_id, _rx) = connect(&data);

    report_location(&data, &connection_id, "stale", 0.0, 0.0).await;
    report_location(&data, &connection_id, "fresh", 0.0, 0.01).await;

    tokio::time::advance(TTL - std::time::Duration::from_secs(5)).await;
    report_location(&data, &connection_id, "fresh", 0.0, 0.02).await;
    assert_eq!(data.registry.scan_all().await.unwrap().len(), 2);

    tokio::time::advance(std::time::Duration::from_secs(10)).await;
    let records = data.registry.scan_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].driver_id, DriverId("fresh".to_string()));

    tokio::time::advance(TTL).await;
    assert!(data.registry.scan_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn nearby_drivers_within_radius_nearest_first() {
    let data = app_state();
    let (connection_id, _rx) = connect(&data);

    report_location(&data, &connection_id, "D3", 0.0, 0.2).await;
    report_location(&data, &connection_id, "D2", 0.0, 0.05).await;
    report_location(&data, &connection_id, "D1", 0.0, 0.0).await;

    let nearby = data
        .matcher
        .find_nearby(&Point::new(0.0, 0.0), Kilometers(10.0))
        .await
        .unwrap();

    let ids: Vec<&str> = nearby
        .iter()
        .map(|driver| driver.record.driver_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["D1", "D2"]);
    assert_eq!(nearby[0].distance_km, Kilometers(0.0));
    assert!((nearby[1].distance_km.0 - 5.56).abs() < 0.05);
    assert!(nearby
        .windows(2)
        .all(|pair| pair[0].distance_km.0 <= pair[1].distance_km.0));
}

#[tokio::test]
async fn find_nearby_is_idempotent_without_updates() {
    let data = app_state();
    let (connection_id, _rx) = connect(&data);

    for (index, lon) in [0.01, 0.03, 0.02, 0.04, 0.3].iter().enumerate() {
        report_location(&data, &connection_id, &format!("driver-{index}"), 0.0, *lon).await;
    }

    let origin = Point::new(0.0, 0.0);
    let first = data.matcher.find_nearby(&origin, Kilometers(10.0)).await.unwrap();
    let second = data.matcher.find_nearby(&origin, Kilometers(10.0)).await.unwrap();

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
}

#[tokio::test]
async fn negative_radius_is_malformed() {
    let data = app_state();
    let err = data
        .matcher
        .find_nearby(&Point::new(0.0, 0.0), Kilometers(-1.0))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "MALFORMED_INPUT");
}

#[tokio::test]
async fn failed_update_keeps_previous_location() {
    let storage = Arc::new(FlakyStorage::default());
    let data = app_state_over(storage.clone());
    let (connection_id, _rx) = connect(&data);

    report_location(&data, &connection_id, "driver-1", 1.0, 1.0).await;

    storage.set_down(true);
    events::handle_event(
        &data,
        &connection_id,
        InboundEvent::parse(
            r#"{"event":"driverLocationUpdate","data":{"driverId":"driver-1","latitude":2.0,"longitude":2.0}}"#,
        )
        .unwrap(),
    )
    .await;
    storage.set_down(false);

    let records = data.registry.scan_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].pt, Point::new(1.0, 1.0));
}

#[tokio::test]
async fn matching_falls_back_to_last_good_snapshot() {
    let storage = Arc::new(FlakyStorage::default());
    let data = app_state_over(storage.clone());
    let (connection_id, _rx) = connect(&data);

    report_location(&data, &connection_id, "driver-1", 0.0, 0.01).await;
    let origin = Point::new(0.0, 0.0);
    let before = data.matcher.find_nearby(&origin, Kilometers(5.0)).await.unwrap();

    storage.set_down(true);
    let during = data.matcher.find_nearby(&origin, Kilometers(5.0)).await.unwrap();

    assert_eq!(before, during);
    assert_eq!(during.len(), 1);
}

#[tokio::test]
async fn outage_before_any_scan_is_reported() {
    let storage = Arc::new(FlakyStorage::default());
    let data = app_state_over(storage.clone());

    storage.set_down(true);
    let err = data.registry.snapshot().await.unwrap_err();
    assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
}
