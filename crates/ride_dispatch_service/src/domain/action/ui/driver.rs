/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::types::ui::events::DriverLocationUpdate;
use crate::environment::AppState;
use crate::tools::{error::AppError, logger::*, prometheus::TOTAL_LOCATION_UPDATES};

/// Records where the driver is and which connection currently speaks for them.
pub async fn update_driver_location(
    data: &AppState,
    connection_id: &ConnectionId,
    request: DriverLocationUpdate,
) -> Result<(), AppError> {
    let record = DriverLocationRecord {
        driver_id: request.driver_id,
        pt: Point {
            lat: request.latitude,
            lon: request.longitude,
        },
        timestamp: TimeStamp::now(),
        connection_id: connection_id.to_owned(),
    };

    debug!(
        tag = "[Driver Location Update]",
        driver_id = %record.driver_id,
        lat = record.pt.lat.0,
        lon = record.pt.lon.0,
        connection_id = %connection_id
    );

    data.registry.upsert(&record).await?;

    TOTAL_LOCATION_UPDATES.inc();

    Ok(())
}
