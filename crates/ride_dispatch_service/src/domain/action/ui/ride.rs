/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::types::ui::{
    events::{OutboundEvent, RideRequest, RideRequestFromClient},
    ride::DispatchReport,
};
use crate::environment::AppState;
use crate::tools::{
    error::AppError,
    logger::*,
    prometheus::{DISPATCH_DELIVERIES, MATCHED_DRIVERS, TOTAL_RIDE_REQUESTS},
};

/// Matches a ride request against the registry and delivers it to every reachable nearby driver.
///
/// Zero matches, or matches whose connections have closed, end the request quietly with
/// fewer deliveries. Only a malformed radius or a requester that is already gone is an error.
pub async fn request_ride(
    data: &AppState,
    connection_id: &ConnectionId,
    request: RideRequest,
) -> Result<DispatchReport, AppError> {
    TOTAL_RIDE_REQUESTS.inc();

    let mut report = DispatchReport::received(request.ride_request_id.to_owned());

    let radius = request
        .max_distance_km
        .unwrap_or(data.default_search_radius);
    if !radius.is_valid_radius() {
        return Err(AppError::MalformedInput(format!(
            "maxDistanceKm {} is not a finite non-negative number",
            radius.0
        )));
    }

    let origin = Point {
        lat: request.latitude,
        lon: request.longitude,
    };

    let nearby = match data.matcher.find_nearby(&origin, radius).await {
        Ok(nearby) => nearby,
        Err(AppError::StorageUnavailable(reason)) => {
            error!(
                tag = "[Ride Request - Registry Unavailable]",
                client_id = %request.client_id,
                ride_request_id = %request.ride_request_id,
                %reason
            );
            Vec::new()
        }
        Err(err) => return Err(err),
    };

    MATCHED_DRIVERS.observe(nearby.len() as f64);
    report.stage = DispatchStage::Matched;
    report.matched = nearby
        .iter()
        .map(|driver| driver.record.driver_id.to_owned())
        .collect();

    info!(
        tag = "[Ride Request - Matched]",
        client_id = %request.client_id,
        ride_request_id = %request.ride_request_id,
        radius_km = radius.0,
        matched = nearby.len()
    );

    let mut group = data
        .dispatcher
        .create_group(&request.client_id, connection_id)?;

    for driver in &nearby {
        match data
            .dispatcher
            .enroll_driver(&mut group, &driver.record.connection_id)
        {
            Ok(true) => report.enrolled.push(driver.record.connection_id.to_owned()),
            Ok(false) => {}
            Err(AppError::ConnectionGone(_)) => {
                warn!(
                    tag = "[Driver Connection Not Found]",
                    driver_id = %driver.record.driver_id,
                    connection_id = %driver.record.connection_id
                );
                report.gone.push(driver.record.connection_id.to_owned());
            }
            Err(err) => return Err(err),
        }
    }

    let group = group.seal();
    report.stage = DispatchStage::GroupFormed;

    debug!(
        tag = "[Dispatch Group Formed]",
        group_id = %group.group_id(),
        members = ?group.members()
    );

    let broadcast = data.dispatcher.broadcast(
        &group,
        &OutboundEvent::RideRequestFromClient(RideRequestFromClient::from(&request)),
        connection_id,
    );

    DISPATCH_DELIVERIES
        .with_label_values(&["delivered"])
        .inc_by(broadcast.delivered.len() as u64);
    DISPATCH_DELIVERIES
        .with_label_values(&["connection_gone"])
        .inc_by((report.gone.len() + broadcast.gone.len()) as u64);

    report.delivered = broadcast.delivered;
    report.gone.extend(broadcast.gone);
    report.stage = DispatchStage::Dispatched;

    info!(
        tag = "[Ride Request - Dispatched]",
        client_id = %request.client_id,
        ride_request_id = %request.ride_request_id,
        delivered = report.delivered.len(),
        gone = report.gone.len()
    );

    Ok(report)
}
