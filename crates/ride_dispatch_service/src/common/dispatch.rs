/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::types::*;
use crate::domain::types::ui::events::OutboundEvent;
use crate::tools::{error::AppError, logger::*};
use std::sync::Arc;

/// What the dispatch core needs from the transport layer.
pub trait ConnectionManager: Send + Sync {
    fn is_live(&self, connection_id: &ConnectionId) -> bool;

    /// Starts `group_id` afresh, dropping whoever was in it before.
    fn create_group(&self, group_id: &GroupId);

    fn join_group(&self, connection_id: &ConnectionId, group_id: &GroupId) -> Result<(), AppError>;

    /// Best-effort, at-most-once delivery; `ConnectionGone` when the connection is closed.
    fn emit(&self, connection_id: &ConnectionId, event: OutboundEvent) -> Result<(), AppError>;
}

/// A dispatch group still being populated.
#[derive(Debug)]
pub struct PendingGroup {
    group_id: GroupId,
    requester: ConnectionId,
    members: Vec<ConnectionId>,
}

impl PendingGroup {
    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }

    /// Freezes membership. Only a sealed group can be broadcast to.
    pub fn seal(self) -> GroupHandle {
        GroupHandle {
            group_id: self.group_id,
            requester: self.requester,
            members: self.members.into(),
        }
    }
}

/// Immutable member list of a formed dispatch group.
#[derive(Debug, Clone)]
pub struct GroupHandle {
    group_id: GroupId,
    requester: ConnectionId,
    members: Arc<[ConnectionId]>,
}

impl GroupHandle {
    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn requester(&self) -> &ConnectionId {
        &self.requester
    }

    pub fn members(&self) -> &[ConnectionId] {
        &self.members
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BroadcastReport {
    pub delivered: Vec<ConnectionId>,
    pub gone: Vec<ConnectionId>,
}

pub struct DispatchGroupManager {
    connections: Arc<dyn ConnectionManager>,
}

impl DispatchGroupManager {
    pub fn new(connections: Arc<dyn ConnectionManager>) -> Self {
        Self { connections }
    }

    pub fn create_group(
        &self,
        client_id: &ClientId,
        requester: &ConnectionId,
    ) -> Result<PendingGroup, AppError> {
        if !self.connections.is_live(requester) {
            return Err(AppError::ConnectionGone(requester.to_string()));
        }

        let group_id = GroupId::for_client(client_id);
        self.connections.create_group(&group_id);
        self.connections.join_group(requester, &group_id)?;

        Ok(PendingGroup {
            group_id,
            requester: requester.to_owned(),
            members: vec![requester.to_owned()],
        })
    }

    /// Adds a driver's connection to the group.
    ///
    /// Returns `Ok(false)` when the connection is already a member, so nobody is
    /// enrolled (or later delivered to) twice.
    pub fn enroll_driver(
        &self,
        group: &mut PendingGroup,
        driver_connection: &ConnectionId,
    ) -> Result<bool, AppError> {
        if group.members.contains(driver_connection) {
            return Ok(false);
        }

        if !self.connections.is_live(driver_connection) {
            return Err(AppError::ConnectionGone(driver_connection.to_string()));
        }

        self.connections
            .join_group(driver_connection, &group.group_id)?;
        group.members.push(driver_connection.to_owned());

        Ok(true)
    }

    /// Sends `event` once to every member except `exclude`.
    pub fn broadcast(
        &self,
        group: &GroupHandle,
        event: &OutboundEvent,
        exclude: &ConnectionId,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for member in group.members().iter().filter(|member| *member != exclude) {
            match self.connections.emit(member, event.to_owned()) {
                Ok(()) => report.delivered.push(member.to_owned()),
                Err(err) => {
                    warn!(
                        tag = "[Broadcast Skipped]",
                        group_id = %group.group_id(),
                        connection_id = %member,
                        error = %err.message()
                    );
                    report.gone.push(member.to_owned());
                }
            }
        }

        report
    }
}
