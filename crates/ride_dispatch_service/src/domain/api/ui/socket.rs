/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::{
    common::types::*,
    domain::action::ui::events,
    domain::types::ui::events::OutboundEvent,
    environment::AppState,
    tools::logger::*,
};
use actix_web::{
    get, rt,
    web::{Data, Payload},
    HttpRequest, HttpResponse,
};
use actix_ws::{Message, MessageStream, Session};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::Instrument;

/// Upgrades to a websocket and serves it until either side closes.
#[get("/ws")]
pub async fn socket(
    data: Data<AppState>,
    req: HttpRequest,
    body: Payload,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, body)?;

    let connection_id = ConnectionId::new();
    let outbound = data.connections.register(&connection_id);
    let msg_stream = msg_stream.max_frame_size(data.max_frame_size);

    info!(tag = "[Connection Opened]", connection_id = %connection_id);

    let span = tracing::info_span!("socket", connection_id = %connection_id);
    rt::spawn(
        serve(
            data.into_inner(),
            connection_id,
            session,
            msg_stream,
            outbound,
        )
        .instrument(span),
    );

    Ok(response)
}

async fn serve(
    data: std::sync::Arc<AppState>,
    connection_id: ConnectionId,
    mut session: Session,
    mut msg_stream: MessageStream,
    mut outbound: UnboundedReceiver<OutboundEvent>,
) {
    loop {
        tokio::select! {
            msg = msg_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(frame))) => {
                        events::handle_frame(&data, &connection_id, &frame).await;
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        debug!(tag = "[Close Frame]", ?reason);
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!(tag = "[Binary Frame Ignored]", connection_id = %connection_id);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(tag = "[Protocol Error]", connection_id = %connection_id, error = %err);
                        break;
                    }
                    None => break,
                }
            }
            Some(event) = outbound.recv() => {
                match serde_json::to_string(&event) {
                    Ok(frame) => {
                        if session.text(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        error!(tag = "[Outbound Serialization]", connection_id = %connection_id, error = %err);
                    }
                }
            }
        }
    }

    data.connections.unregister(&connection_id);
    let _ = session.close(None).await;

    info!(tag = "[Connection Closed]", connection_id = %connection_id);
}
