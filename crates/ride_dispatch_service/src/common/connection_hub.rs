/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{dispatch::ConnectionManager, types::*};
use crate::domain::types::ui::events::OutboundEvent;
use crate::tools::{error::AppError, prometheus::LIVE_CONNECTIONS};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// In-process registry of open sockets and the groups they belong to.
///
/// Each socket task owns the receiving half of its channel and writes whatever
/// arrives to the wire, so emitting never waits on network I/O.
#[derive(Default)]
pub struct ConnectionHub {
    connections: RwLock<FxHashMap<ConnectionId, UnboundedSender<OutboundEvent>>>,
    groups: RwLock<FxHashMap<GroupId, FxHashSet<ConnectionId>>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: &ConnectionId) -> UnboundedReceiver<OutboundEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        if self
            .connections
            .write()
            .insert(connection_id.to_owned(), sender)
            .is_none()
        {
            LIVE_CONNECTIONS.inc();
        }
        receiver
    }

    /// Forgets the connection and removes it from every group.
    pub fn unregister(&self, connection_id: &ConnectionId) {
        if self.connections.write().remove(connection_id).is_some() {
            LIVE_CONNECTIONS.dec();
        }
        self.groups.write().retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    pub fn group_members(&self, group_id: &GroupId) -> Vec<ConnectionId> {
        self.groups
            .read()
            .get(group_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn live_connections(&self) -> usize {
        self.connections.read().len()
    }
}

impl ConnectionManager for ConnectionHub {
    fn is_live(&self, connection_id: &ConnectionId) -> bool {
        self.connections
            .read()
            .get(connection_id)
            .is_some_and(|sender| !sender.is_closed())
    }

    fn create_group(&self, group_id: &GroupId) {
        self.groups
            .write()
            .insert(group_id.to_owned(), FxHashSet::default());
    }

    fn join_group(&self, connection_id: &ConnectionId, group_id: &GroupId) -> Result<(), AppError> {
        // checked under the groups lock so a racing `unregister` cannot leave a dead member
        let mut groups = self.groups.write();
        if !self.is_live(connection_id) {
            return Err(AppError::ConnectionGone(connection_id.to_string()));
        }
        groups
            .entry(group_id.to_owned())
            .or_default()
            .insert(connection_id.to_owned());
        Ok(())
    }

    fn emit(&self, connection_id: &ConnectionId, event: OutboundEvent) -> Result<(), AppError> {
        let connections = self.connections.read();
        let sender = connections
            .get(connection_id)
            .ok_or_else(|| AppError::ConnectionGone(connection_id.to_string()))?;
        sender
            .send(event)
            .map_err(|_| AppError::ConnectionGone(connection_id.to_string()))
    }
}
