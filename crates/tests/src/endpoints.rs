/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::support::*;
use actix_web::{
    http::StatusCode,
    rt::time::{sleep, timeout},
    test,
    web::{Bytes, Data},
    App,
};
use awc::ws;
use futures::{SinkExt, Stream, StreamExt};
use ride_dispatch_service::{domain::api, middleware::CheckContentLength};
use serde_json::{json, Value};
use std::time::Duration;

#[actix_web::test]
async fn nearby_endpoint_ranks_drivers() {
    let data = app_state();
    let (connection_id, _rx) = connect(&data);
    report_location(&data, &connection_id, "D3", 0.0, 0.2).await;
    report_location(&data, &connection_id, "D2", 0.0, 0.05).await;
    report_location(&data, &connection_id, "D1", 0.0, 0.0).await;

    let app = test::init_service(App::new().app_data(Data::new(data)).configure(api::handler)).await;

    let req = test::TestRequest::post()
        .uri("/internal/drivers/nearby")
        .set_json(json!({"lat": 0.0, "lon": 0.0, "radius": 10.0}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let ids: Vec<&str> = body["resp"]
        .as_array()
        .unwrap()
        .iter()
        .map(|driver| driver["driverId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["D1", "D2"]);
    assert_eq!(body["resp"][0]["connectionId"], json!(connection_id.0));
    assert_eq!(body["resp"][1]["lat"], json!(0.0));
    assert_eq!(body["resp"][1]["lon"], json!(0.05));
    assert!(body["resp"][1]["distanceKm"].as_f64().unwrap() > 5.0);
}

#[actix_web::test]
async fn nearby_endpoint_rejects_out_of_range_coordinates() {
    let app = test::init_service(
        App::new()
            .app_data(Data::new(app_state()))
            .configure(api::handler),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/internal/drivers/nearby")
        .set_json(json!({"lat": 91.0, "lon": 0.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
}

#[actix_web::test]
async fn oversized_bodies_are_rejected() {
    let data = app_state();
    let limit = data.max_frame_size;
    let app = test::init_service(
        App::new()
            .app_data(Data::new(data))
            .wrap(CheckContentLength)
            .configure(api::handler),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/internal/drivers/nearby")
        .insert_header(("content-type", "application/json"))
        .set_payload(" ".repeat(limit + 1))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();

    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[actix_web::test]
async fn healthcheck_round_trips_through_storage() {
    let app = test::init_service(
        App::new()
            .app_data(Data::new(app_state()))
            .configure(api::handler),
    )
    .await;

    let req = test::TestRequest::get().uri("/healthcheck").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({"result": "Service Is Up"}));
}

async fn next_frame<S>(socket: &mut S) -> ws::Frame
where
    S: Stream<Item = Result<ws::Frame, awc::error::WsProtocolError>> + Unpin,
{
    timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("no frame within 5s")
        .expect("socket closed")
        .expect("protocol error")
}

async fn next_event<S>(socket: &mut S) -> Value
where
    S: Stream<Item = Result<ws::Frame, awc::error::WsProtocolError>> + Unpin,
{
    match next_frame(socket).await {
        ws::Frame::Text(text) => serde_json::from_slice(&text).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within 2s");
}

#[actix_web::test]
async fn websocket_round_trip_dispatches_and_unregisters_on_close() {
    let data = Data::new(app_state());
    let server_data = data.clone();
    let srv = actix_test::start(move || {
        App::new()
            .app_data(server_data.clone())
            .configure(api::handler)
    });

    let (_, mut driver) = awc::Client::new().ws(srv.url("/ws")).connect().await.unwrap();
    let (_, mut client) = awc::Client::new().ws(srv.url("/ws")).connect().await.unwrap();
    wait_until(|| data.connections.live_connections() == 2).await;

    driver
        .send(ws::Message::Ping(Bytes::from_static(b"alive")))
        .await
        .unwrap();
    match next_frame(&mut driver).await {
        ws::Frame::Pong(bytes) => assert_eq!(bytes, Bytes::from_static(b"alive")),
        other => panic!("unexpected frame {other:?}"),
    }

    driver
        .send(ws::Message::Text(
            r#"{"event":"driverLocationUpdate","data":{"driverId":"driver-1","latitude":0.0,"longitude":0.01}}"#.into(),
        ))
        .await
        .unwrap();
    for _ in 0..100 {
        if !data.registry.scan_all().await.unwrap().is_empty() {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }

    client
        .send(ws::Message::Text(
            r#"{"event":"rideRequest","data":{"clientId":"client-1","latitude":0.0,"longitude":0.0,"rideRequestId":"ride-1"}}"#.into(),
        ))
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut driver).await,
        json!({
            "event": "rideRequestFromClient",
            "data": {"clientId": "client-1", "latitude": 0.0, "longitude": 0.0, "rideRequestId": "ride-1"}
        })
    );

    client
        .send(ws::Message::Text(r#"{"event":"rideRequest","data":{}}"#.into()))
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut client).await["data"]["errorCode"],
        json!("MALFORMED_INPUT")
    );

    driver.send(ws::Message::Close(None)).await.unwrap();
    wait_until(|| data.connections.live_connections() == 1).await;
    assert_eq!(data.registry.scan_all().await.unwrap().len(), 1);
}
