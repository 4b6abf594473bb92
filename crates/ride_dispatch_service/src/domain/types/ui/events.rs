/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::tools::error::{AppError, ErrorBody};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationUpdate {
    pub driver_id: DriverId,
    pub latitude: Latitude,
    pub longitude: Longitude,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub client_id: ClientId,
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub ride_request_id: RideRequestId,
    #[serde(default)]
    pub max_distance_km: Option<Kilometers>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RideRequestFromClient {
    pub client_id: ClientId,
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub ride_request_id: RideRequestId,
}

impl From<&RideRequest> for RideRequestFromClient {
    fn from(request: &RideRequest) -> Self {
        RideRequestFromClient {
            client_id: request.client_id.to_owned(),
            latitude: request.latitude,
            longitude: request.longitude,
            ride_request_id: request.ride_request_id.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    DriverLocationUpdate(DriverLocationUpdate),
    RideRequest(RideRequest),
    Disconnect,
}

#[derive(Deserialize)]
struct EventEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl InboundEvent {
    /// Parses a `{"event": ..., "data": ...}` text frame.
    pub fn parse(frame: &str) -> Result<Self, AppError> {
        let EventEnvelope { event, data } = serde_json::from_str(frame)
            .map_err(|err| AppError::MalformedInput(format!("invalid event frame : {err}")))?;

        let malformed = |err: serde_json::Error| AppError::MalformedInput(format!("{event} : {err}"));

        match event.as_str() {
            "driverLocationUpdate" | "updateDriverLocation" => serde_json::from_value(data)
                .map(InboundEvent::DriverLocationUpdate)
                .map_err(malformed),
            "rideRequest" | "requestRide" => serde_json::from_value(data)
                .map(InboundEvent::RideRequest)
                .map_err(malformed),
            "disconnect" => Ok(InboundEvent::Disconnect),
            _ => Err(AppError::MalformedInput(format!("unknown event : {event}"))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "rideRequestFromClient")]
    RideRequestFromClient(RideRequestFromClient),
    #[serde(rename = "error")]
    Error(ErrorBody),
}
