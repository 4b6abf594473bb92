/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::tools::{error::AppError, logger::*};
use fred::{
    clients::RedisPool,
    interfaces::ClientLike,
    types::{Blocking, Builder, ConnectHandle, ReconnectPolicy, RedisConfig, TracingConfig},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub pool_size: usize,
    pub partition: usize,
    pub reconnect_max_attempts: u32,
    /// Reconnect delay in milliseconds
    pub reconnect_delay: u32,
    /// Keys fetched per SCAN round-trip
    pub scan_count: u32,
}

impl Default for RedisSettings {
    fn default() -> Self {
        RedisSettings {
            host: String::from("localhost"),
            port: 6379,
            pool_size: 10,
            partition: 0,
            reconnect_max_attempts: 5,
            reconnect_delay: 1000,
            scan_count: 100,
        }
    }
}

pub struct RedisConnectionPool {
    pub pool: RedisPool,
    pub settings: RedisSettings,
    join_handle: Mutex<Option<ConnectHandle>>,
}

impl RedisConnectionPool {
    pub async fn new(settings: RedisSettings) -> Result<Self, AppError> {
        let redis_connection_url = format!(
            "redis://{}:{}/{}",
            settings.host, settings.port, settings.partition
        );

        let mut config = RedisConfig::from_url(&redis_connection_url)
            .map_err(|err| AppError::InvalidConfiguration(err.to_string()))?;
        config.tracing = TracingConfig::new(true);
        config.blocking = Blocking::Error;

        let reconnect_policy =
            ReconnectPolicy::new_constant(settings.reconnect_max_attempts, settings.reconnect_delay);

        let pool = Builder::from_config(config)
            .set_policy(reconnect_policy)
            .build_pool(settings.pool_size)?;

        let join_handle = pool.init().await?;

        info!(
            tag = "[Redis Connected]",
            host = %settings.host,
            port = settings.port,
            pool_size = settings.pool_size
        );

        Ok(Self {
            pool,
            settings,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub async fn close_connections(&self) {
        if let Err(error) = self.pool.quit().await {
            error!(tag = "[Redis Quit Failed]", %error);
        }
        let join_handle = self.join_handle.lock().take();
        if let Some(handle) = join_handle {
            match handle.await {
                Ok(Ok(_)) => (),
                Ok(Err(error)) => error!(%error),
                Err(error) => error!(%error),
            };
        }
    }
}
