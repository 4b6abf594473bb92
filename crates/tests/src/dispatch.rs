/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::support::*;
use ride_dispatch_service::{
    common::{dispatch::ConnectionManager, types::*},
    domain::{
        action::ui::{events, ride},
        types::ui::events::{OutboundEvent, RideRequestFromClient},
    },
};

fn delivered_client(event: &OutboundEvent) -> &str {
    match event {
        OutboundEvent::RideRequestFromClient(RideRequestFromClient { client_id, .. }) => {
            client_id.0.as_str()
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn nearby_drivers_receive_the_request_once() {
    let data = app_state();
    let (client, mut client_rx) = connect(&data);
    let (near, mut near_rx) = connect(&data);
    let (far, mut far_rx) = connect(&data);

    report_location(&data, &near, "near", 0.0, 0.01).await;
    report_location(&data, &far, "far", 0.0, 0.5).await;

    let report = ride::request_ride(&data, &client, ride_request("client-1", 0.0, 0.0, "ride-1"))
        .await
        .unwrap();

    assert_eq!(report.stage, DispatchStage::Dispatched);
    assert_eq!(report.matched, vec![DriverId("near".to_string())]);
    assert_eq!(report.delivered, vec![near.clone()]);
    assert!(report.gone.is_empty());

    let events = drain(&mut near_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        OutboundEvent::RideRequestFromClient(RideRequestFromClient {
            client_id: ClientId("client-1".to_string()),
            latitude: Latitude(0.0),
            longitude: Longitude(0.0),
            ride_request_id: RideRequestId("ride-1".to_string()),
        })
    );
    assert!(drain(&mut far_rx).is_empty());
    assert!(drain(&mut client_rx).is_empty());
}

#[tokio::test]
async fn zero_matches_is_not_an_error() {
    let data = app_state();
    let (client, mut client_rx) = connect(&data);
    let (far, mut far_rx) = connect(&data);

    report_location(&data, &far, "far", 10.0, 10.0).await;

    let report = ride::request_ride(&data, &client, ride_request("client-1", 0.0, 0.0, "ride-1"))
        .await
        .unwrap();

    assert_eq!(report.stage, DispatchStage::Dispatched);
    assert!(report.matched.is_empty());
    assert!(report.delivered.is_empty());
    assert!(drain(&mut far_rx).is_empty());
    assert!(drain(&mut client_rx).is_empty());
}

#[tokio::test]
async fn disconnected_driver_is_skipped_without_aborting_dispatch() {
    let data = app_state();
    let (client, _client_rx) = connect(&data);
    let (online, mut online_rx) = connect(&data);
    let (offline, _offline_rx) = connect(&data);

    report_location(&data, &online, "online", 0.0, 0.01).await;
    report_location(&data, &offline, "offline", 0.0, 0.02).await;
    data.connections.unregister(&offline);

    let report = ride::request_ride(&data, &client, ride_request("client-1", 0.0, 0.0, "ride-1"))
        .await
        .unwrap();

    assert_eq!(report.matched.len(), 2);
    assert_eq!(report.delivered, vec![online]);
    assert_eq!(report.gone, vec![offline]);
    assert_eq!(drain(&mut online_rx).len(), 1);
}

#[tokio::test]
async fn concurrent_requests_never_cross_deliver() {
    let data = app_state();
    let (client_a, _a_rx) = connect(&data);
    let (client_b, _b_rx) = connect(&data);
    let (driver_a, mut driver_a_rx) = connect(&data);
    let (driver_b, mut driver_b_rx) = connect(&data);
    let (shared, mut shared_rx) = connect(&data);

    report_location(&data, &driver_a, "driver-a", 0.0, 0.0).await;
    report_location(&data, &driver_b, "driver-b", 1.0, 1.0).await;
    report_location(&data, &shared, "shared", 0.5, 0.5).await;

    let mut request_a = ride_request("client-a", 0.0, 0.0, "ride-a");
    request_a.max_distance_km = Some(Kilometers(80.0));
    let mut request_b = ride_request("client-b", 1.0, 1.0, "ride-b");
    request_b.max_distance_km = Some(Kilometers(5.0));

    let (report_a, report_b) = tokio::join!(
        ride::request_ride(&data, &client_a, request_a),
        ride::request_ride(&data, &client_b, request_b),
    );
    let (report_a, report_b) = (report_a.unwrap(), report_b.unwrap());

    assert_eq!(report_a.delivered.len(), 2);
    assert_eq!(report_b.delivered, vec![driver_b.clone()]);

    let a_events = drain(&mut driver_a_rx);
    assert_eq!(a_events.len(), 1);
    assert_eq!(delivered_client(&a_events[0]), "client-a");

    let b_events = drain(&mut driver_b_rx);
    assert_eq!(b_events.len(), 1);
    assert_eq!(delivered_client(&b_events[0]), "client-b");

    let shared_events = drain(&mut shared_rx);
    assert_eq!(shared_events.len(), 1);
    assert_eq!(delivered_client(&shared_events[0]), "client-a");
}

#[tokio::test]
async fn driver_sharing_a_connection_is_delivered_once() {
    let data = app_state();
    let (client, _client_rx) = connect(&data);
    let (fleet, mut fleet_rx) = connect(&data);

    report_location(&data, &fleet, "driver-1", 0.0, 0.01).await;
    report_location(&data, &fleet, "driver-2", 0.0, 0.02).await;

    let report = ride::request_ride(&data, &client, ride_request("client-1", 0.0, 0.0, "ride-1"))
        .await
        .unwrap();

    assert_eq!(report.matched.len(), 2);
    assert_eq!(report.enrolled, vec![fleet.clone()]);
    assert_eq!(drain(&mut fleet_rx).len(), 1);
}

#[tokio::test]
async fn requester_that_left_cannot_form_a_group() {
    let data = app_state();
    let (client, _client_rx) = connect(&data);
    let (driver, mut driver_rx) = connect(&data);

    report_location(&data, &driver, "driver-1", 0.0, 0.01).await;
    data.connections.unregister(&client);

    let err = ride::request_ride(&data, &client, ride_request("client-1", 0.0, 0.0, "ride-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "CONNECTION_GONE");
    assert!(drain(&mut driver_rx).is_empty());
}

#[tokio::test]
async fn malformed_request_is_reported_only_to_the_sender() {
    let data = app_state();
    let (client, mut client_rx) = connect(&data);
    let (driver, mut driver_rx) = connect(&data);

    report_location(&data, &driver, "driver-1", 0.0, 0.01).await;

    events::handle_frame(
        &data,
        &client,
        r#"{"event":"rideRequest","data":{"clientId":"client-1","latitude":"north","longitude":0,"rideRequestId":"ride-1"}}"#,
    )
    .await;

    let client_events = drain(&mut client_rx);
    assert_eq!(client_events.len(), 1);
    match &client_events[0] {
        OutboundEvent::Error(body) => assert_eq!(body.error_code, "MALFORMED_INPUT"),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(drain(&mut driver_rx).is_empty());
    assert!(data
        .connections
        .group_members(&GroupId::for_client(&ClientId("client-1".to_string())))
        .is_empty());
}

#[tokio::test]
async fn frames_from_the_socket_drive_dispatch() {
    let data = app_state();
    let (client, _client_rx) = connect(&data);
    let (driver, mut driver_rx) = connect(&data);

    events::handle_frame(
        &data,
        &driver,
        r#"{"event":"updateDriverLocation","data":{"driverId":"driver-1","latitude":0.0,"longitude":0.01}}"#,
    )
    .await;
    events::handle_frame(
        &data,
        &client,
        r#"{"event":"requestRide","data":{"clientId":"client-1","latitude":0,"longitude":0,"rideRequestId":"ride-1","maxDistanceKm":2}}"#,
    )
    .await;

    let events = drain(&mut driver_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(delivered_client(&events[0]), "client-1");

    let mut members = data
        .connections
        .group_members(&GroupId::for_client(&ClientId("client-1".to_string())));
    members.sort_by(|a, b| a.0.cmp(&b.0));
    let mut expected = vec![client, driver];
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(members, expected);
}

#[tokio::test]
async fn disconnect_leaves_location_until_ttl() {
    let data = app_state();
    let (driver, _driver_rx) = connect(&data);

    report_location(&data, &driver, "driver-1", 0.0, 0.0).await;
    events::handle_frame(&data, &driver, r#"{"event":"disconnect"}"#).await;
    data.connections.unregister(&driver);

    assert!(!data.connections.is_live(&driver));
    assert_eq!(data.registry.scan_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn numeric_identifiers_are_registered_and_dispatched() {
    let data = app_state();
    let (client, mut client_rx) = connect(&data);
    let (driver, mut driver_rx) = connect(&data);

    events::handle_frame(
        &data,
        &driver,
        r#"{"event":"updateDriverLocation","data":{"driverId":42,"latitude":0.0,"longitude":0.01}}"#,
    )
    .await;

    let records = data.registry.scan_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].driver_id, DriverId("42".to_string()));

    events::handle_frame(
        &data,
        &client,
        r#"{"event":"requestRide","data":{"clientId":7,"latitude":0,"longitude":0,"rideRequestId":1001}}"#,
    )
    .await;

    assert!(drain(&mut client_rx).is_empty());
    let events = drain(&mut driver_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        OutboundEvent::RideRequestFromClient(RideRequestFromClient {
            client_id: ClientId("7".to_string()),
            latitude: Latitude(0.0),
            longitude: Longitude(0.0),
            ride_request_id: RideRequestId("1001".to_string()),
        })
    );
}
