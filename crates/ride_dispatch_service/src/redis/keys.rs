/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;

pub fn driver_location_key(DriverId(driver_id): &DriverId) -> String {
    format!("driver:{driver_id}:location")
}

pub fn driver_location_pattern() -> String {
    "driver:*:location".to_string()
}

pub fn driver_id_from_location_key(key: &str) -> Option<DriverId> {
    key.strip_prefix("driver:")
        .and_then(|rest| rest.strip_suffix(":location"))
        .filter(|driver_id| !driver_id.is_empty())
        .map(|driver_id| DriverId(driver_id.to_string()))
}

pub fn health_check_key() -> String {
    "rds:health_check".to_string()
}
