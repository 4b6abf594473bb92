/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use serde::Serialize;

/// Outcome of one ride request, from matching to broadcast.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub ride_request_id: RideRequestId,
    #[serde(skip)]
    pub stage: DispatchStage,
    pub matched: Vec<DriverId>,
    pub enrolled: Vec<ConnectionId>,
    pub delivered: Vec<ConnectionId>,
    pub gone: Vec<ConnectionId>,
}

impl DispatchReport {
    pub fn received(ride_request_id: RideRequestId) -> Self {
        DispatchReport {
            ride_request_id,
            stage: DispatchStage::Received,
            matched: Vec::new(),
            enrolled: Vec::new(),
            delivered: Vec::new(),
            gone: Vec::new(),
        }
    }
}
