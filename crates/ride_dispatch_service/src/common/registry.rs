/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::{
    storage::{StorageBackend, StorageFields},
    types::*,
};
use crate::redis::keys::{driver_id_from_location_key, driver_location_key, driver_location_pattern};
use crate::tools::{error::AppError, logger::*, prometheus::STORAGE_ERRORS};
use chrono::Utc;
use futures::{stream, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use std::{sync::Arc, time::Duration};

const FIELD_DRIVER_ID: &str = "driverId";
const FIELD_LATITUDE: &str = "latitude";
const FIELD_LONGITUDE: &str = "longitude";
const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_CONNECTION_ID: &str = "connectionId";

/// In-flight `get_fields` calls while scanning.
const SCAN_CONCURRENCY: usize = 32;

/// Expiring store of the last reported position of every driver.
pub struct LocationRegistry {
    storage: Arc<dyn StorageBackend>,
    ttl: Duration,
    last_snapshot: RwLock<Option<Arc<Vec<DriverLocationRecord>>>>,
}

impl LocationRegistry {
    pub fn new(storage: Arc<dyn StorageBackend>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            last_snapshot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Writes the record for its driver, replacing any previous one, and restarts the TTL.
    pub async fn upsert(&self, record: &DriverLocationRecord) -> Result<(), AppError> {
        self.storage
            .set_fields(
                &driver_location_key(&record.driver_id),
                encode_record(record),
                self.ttl,
            )
            .await
            .map_err(|err| {
                STORAGE_ERRORS.with_label_values(&["upsert"]).inc();
                err
            })
    }

    /// Every non-expired record at call time, in no particular order.
    pub async fn scan_all(&self) -> Result<Vec<DriverLocationRecord>, AppError> {
        let records = self.read_all().await.map_err(|err| {
            STORAGE_ERRORS.with_label_values(&["scan"]).inc();
            err
        })?;

        *self.last_snapshot.write() = Some(Arc::new(records.clone()));

        Ok(records)
    }

    /// `scan_all`, falling back to the last good scan when storage is unreachable.
    ///
    /// Records from the fallback that have outlived the TTL since they were written
    /// are dropped, so an outage never resurrects expired drivers.
    pub async fn snapshot(&self) -> Result<Vec<DriverLocationRecord>, AppError> {
        match self.scan_all().await {
            Ok(records) => Ok(records),
            Err(err @ AppError::StorageUnavailable(_)) => {
                let last_snapshot = self.last_snapshot.read().clone();
                match last_snapshot {
                    Some(records) => {
                        warn!(
                            tag = "[Registry Scan Failed - Using Last Snapshot]",
                            error = %err.message(),
                            records = records.len()
                        );
                        Ok(self.unexpired(&records))
                    }
                    None => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    fn unexpired(&self, records: &[DriverLocationRecord]) -> Vec<DriverLocationRecord> {
        let cutoff = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl));
        records
            .iter()
            .filter(|record| cutoff.map_or(true, |cutoff| record.timestamp.0 > cutoff))
            .cloned()
            .collect()
    }

    async fn read_all(&self) -> Result<Vec<DriverLocationRecord>, AppError> {
        let keys = self.storage.list_keys(&driver_location_pattern()).await?;

        let entries: Vec<(String, Option<StorageFields>)> = stream::iter(keys)
            .map(|key| async move {
                let fields = self.storage.get_fields(&key).await?;
                Ok::<_, AppError>((key, fields))
            })
            .buffered(SCAN_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|(key, fields)| {
                // expired between listing and reading
                let fields = fields?;
                match decode_record(&key, &fields) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!(tag = "[Skipping Undecodable Driver Location]", key = %key, error = %err.message());
                        None
                    }
                }
            })
            .collect())
    }
}

pub fn encode_record(record: &DriverLocationRecord) -> Vec<(String, String)> {
    vec![
        (FIELD_DRIVER_ID.to_string(), record.driver_id.0.to_owned()),
        (FIELD_LATITUDE.to_string(), record.pt.lat.0.to_string()),
        (FIELD_LONGITUDE.to_string(), record.pt.lon.0.to_string()),
        (
            FIELD_TIMESTAMP.to_string(),
            record.timestamp.as_millis().to_string(),
        ),
        (
            FIELD_CONNECTION_ID.to_string(),
            record.connection_id.0.to_owned(),
        ),
    ]
}

pub fn decode_record(key: &str, fields: &StorageFields) -> Result<DriverLocationRecord, AppError> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| AppError::MalformedInput(format!("field {name} missing")))
    };
    let number = |name: &str| {
        field(name)?
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| AppError::MalformedInput(format!("field {name} is not a number")))
    };

    let driver_id = match fields.get(FIELD_DRIVER_ID) {
        Some(driver_id) => DriverId(driver_id.to_owned()),
        None => driver_id_from_location_key(key)
            .ok_or_else(|| AppError::MalformedInput(format!("no driver id in key {key}")))?,
    };

    let timestamp = field(FIELD_TIMESTAMP)?
        .parse::<i64>()
        .ok()
        .and_then(TimeStamp::from_millis)
        .ok_or_else(|| AppError::MalformedInput("field timestamp is not epoch millis".to_string()))?;

    Ok(DriverLocationRecord {
        driver_id,
        pt: Point::new(number(FIELD_LATITUDE)?, number(FIELD_LONGITUDE)?),
        timestamp,
        connection_id: ConnectionId(field(FIELD_CONNECTION_ID)?.to_owned()),
    })
}
