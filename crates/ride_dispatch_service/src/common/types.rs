/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use strum_macros::Display;

#[derive(Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct DriverId(pub String);
#[derive(Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ClientId(pub String);
#[derive(Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct RideRequestId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ConnectionId(pub String);
#[derive(Deserialize, Serialize, Clone, Debug, Eq, Hash, PartialEq)]
pub struct GroupId(pub String);
#[derive(Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Latitude(pub f64);
#[derive(Serialize, Clone, Debug, PartialEq, Copy)]
pub struct Longitude(pub f64);
#[derive(Serialize, Clone, Debug, PartialEq, PartialOrd, Copy)]
pub struct Kilometers(pub f64);
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Hash, Ord)]
pub struct TimeStamp(pub DateTime<Utc>);

macro_rules! impl_display {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

impl_display!(DriverId, ClientId, RideRequestId, ConnectionId, GroupId, Latitude, Longitude);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupId {
    /// Dispatch group of a requester, one per client at a time.
    pub fn for_client(ClientId(client_id): &ClientId) -> Self {
        GroupId(format!("client:{client_id}"))
    }
}

impl TimeStamp {
    pub fn now() -> Self {
        TimeStamp(Utc::now())
    }

    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(TimeStamp)
    }
}

impl Kilometers {
    /// Radii are compared against distances, so only finite, non-negative values make sense.
    pub fn is_valid_radius(&self) -> bool {
        self.0.is_finite() && self.0 >= 0.0
    }
}

/// Accepts a coordinate either as a JSON number or as a string holding one,
/// rejecting anything non-finite or outside `[-limit, limit]`.
struct CoordinateVisitor {
    limit: f64,
}

impl CoordinateVisitor {
    fn check<E: serde::de::Error>(&self, value: f64) -> Result<f64, E> {
        if value.is_finite() && value.abs() <= self.limit {
            Ok(value)
        } else {
            Err(E::custom(format!(
                "coordinate {value} is outside [-{0}, {0}]",
                self.limit
            )))
        }
    }
}

impl<'de> serde::de::Visitor<'de> for CoordinateVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a number (integer/float) or a string containing a floating-point number")
    }

    fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.check(value)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.check(value as f64)
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        self.check(value as f64)
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        let parsed = value.trim().parse::<f64>().map_err(|_| {
            E::invalid_value(serde::de::Unexpected::Str(value), &"a numeric coordinate")
        })?;
        self.check(parsed)
    }
}

impl<'de> Deserialize<'de> for Latitude {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_any(CoordinateVisitor { limit: 90.0 })
            .map(Latitude)
    }
}

impl<'de> Deserialize<'de> for Longitude {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_any(CoordinateVisitor { limit: 180.0 })
            .map(Longitude)
    }
}

impl<'de> Deserialize<'de> for Kilometers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_any(CoordinateVisitor { limit: f64::MAX })
            .map(Kilometers)
    }
}

/// Accepts an identifier either as a JSON string or as an integer, keeping its decimal text.
struct IdentifierVisitor;

impl<'de> serde::de::Visitor<'de> for IdentifierVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string or an integer identifier")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value)
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(value.to_string())
    }
}

macro_rules! impl_identifier_deserialize {
    ($($name:ident),*) => {
        $(
            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    deserializer.deserialize_any(IdentifierVisitor).map($name)
                }
            }
        )*
    };
}

impl_identifier_deserialize!(DriverId, ClientId, RideRequestId);

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub lat: Latitude,
    pub lon: Longitude,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Point {
            lat: Latitude(lat),
            lon: Longitude(lon),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationRecord {
    pub driver_id: DriverId,
    #[serde(flatten)]
    pub pt: Point,
    pub timestamp: TimeStamp,
    pub connection_id: ConnectionId,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriver {
    #[serde(flatten)]
    pub record: DriverLocationRecord,
    pub distance_km: Kilometers,
}

/// Lifecycle of a single ride request.
#[derive(Debug, Clone, Copy, Display, Eq, PartialEq)]
pub enum DispatchStage {
    Received,
    Matched,
    GroupFormed,
    Dispatched,
}
