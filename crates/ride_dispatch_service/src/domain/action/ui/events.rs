/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{dispatch::ConnectionManager, types::*};
use crate::domain::action::ui::{driver, ride};
use crate::domain::types::ui::events::{InboundEvent, OutboundEvent};
use crate::environment::AppState;
use crate::tools::{error::AppError, logger::*};

/// Parses and handles one inbound text frame from `connection_id`.
pub async fn handle_frame(data: &AppState, connection_id: &ConnectionId, frame: &str) {
    match InboundEvent::parse(frame) {
        Ok(event) => handle_event(data, connection_id, event).await,
        Err(err) => report_error(data, connection_id, err),
    }
}

pub async fn handle_event(data: &AppState, connection_id: &ConnectionId, event: InboundEvent) {
    let result = match event {
        InboundEvent::DriverLocationUpdate(request) => {
            driver::update_driver_location(data, connection_id, request).await
        }
        InboundEvent::RideRequest(request) => ride::request_ride(data, connection_id, request)
            .await
            .map(|_| ()),
        InboundEvent::Disconnect => {
            info!(tag = "[Disconnect Requested]", connection_id = %connection_id);
            Ok(())
        }
    };

    if let Err(err) = result {
        report_error(data, connection_id, err);
    }
}

fn report_error(data: &AppState, connection_id: &ConnectionId, err: AppError) {
    match err {
        AppError::MalformedInput(_) => {
            warn!(
                tag = "[Malformed Event]",
                connection_id = %connection_id,
                error = %err.message()
            );
            let _ = data
                .connections
                .emit(connection_id, OutboundEvent::Error(err.error_message()));
        }
        AppError::ConnectionGone(_) => {
            warn!(
                tag = "[Connection Gone]",
                connection_id = %connection_id,
                error = %err.message()
            );
        }
        _ => {
            error!(
                tag = "[Event Dropped]",
                connection_id = %connection_id,
                error = %err.message()
            );
        }
    }
}
