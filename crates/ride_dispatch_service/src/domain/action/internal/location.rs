/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::{
    common::types::*,
    domain::types::internal::location::*,
    environment::AppState,
    tools::{error::AppError, logger::*},
};
use actix_web::web::Data;

/// Read-only view of what a ride request at this point would match.
pub async fn get_nearby_drivers(
    data: Data<AppState>,
    request_body: NearbyDriversRequest,
) -> Result<NearbyDriverResponse, AppError> {
    let radius = request_body.radius.unwrap_or(data.default_search_radius);
    let origin = Point {
        lat: request_body.lat,
        lon: request_body.lon,
    };

    let resp = data.matcher.find_nearby(&origin, radius).await?;

    debug!(
        tag = "[Nearby Drivers]",
        lat = origin.lat.0,
        lon = origin.lon.0,
        radius_km = radius.0,
        found = resp.len()
    );

    Ok(NearbyDriverResponse { resp })
}
