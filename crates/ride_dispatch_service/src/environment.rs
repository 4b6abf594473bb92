/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::{
    common::{
        connection_hub::ConnectionHub,
        dispatch::DispatchGroupManager,
        proximity::{DistanceCalculator, Haversine, ProximityMatcher},
        registry::LocationRegistry,
        storage::{InMemoryStorage, StorageBackend},
        types::*,
    },
    redis::types::{RedisConnectionPool, RedisSettings},
    tools::{error::AppError, logger::*},
};
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use strum_macros::Display;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub workers: usize,
    pub logger_cfg: LoggerConfig,
    pub registry_backend: RegistryBackend,
    pub redis_cfg: RedisSettings,
    pub location_ttl_seconds: u64,
    pub location_update_interval_seconds: u64,
    pub default_search_radius_km: f64,
    pub max_frame_size: usize,
}

#[derive(Debug, Deserialize, Clone, Copy, Display, Eq, PartialEq)]
pub enum RegistryBackend {
    Redis,
    InMemory,
}

pub fn read_dhall_config(config_path: &str) -> Result<AppConfig, AppError> {
    serde_dhall::from_file(config_path)
        .parse::<AppConfig>()
        .map_err(|err| AppError::InvalidConfiguration(format!("Error reading config: {err}")))
}

/// A day; anything longer keeps long-gone drivers matchable.
const MAX_LOCATION_TTL_SECONDS: u64 = 86_400;

impl AppConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.location_ttl_seconds == 0 || self.location_ttl_seconds > MAX_LOCATION_TTL_SECONDS {
            return Err(AppError::InvalidConfiguration(format!(
                "location_ttl_seconds must be within 1..={MAX_LOCATION_TTL_SECONDS}, got {}",
                self.location_ttl_seconds
            )));
        }
        if !(self.default_search_radius_km.is_finite() && self.default_search_radius_km > 0.0) {
            return Err(AppError::InvalidConfiguration(format!(
                "default_search_radius_km must be a positive number, got {}",
                self.default_search_radius_km
            )));
        }
        if self.max_frame_size == 0 {
            return Err(AppError::InvalidConfiguration(
                "max_frame_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Problems with the TTL relative to how often drivers report.
    ///
    /// A TTL at or below the update interval drops live drivers between updates;
    /// one spanning many intervals keeps disconnected drivers matchable.
    pub fn ttl_warnings(&self) -> Vec<String> {
        let (ttl, interval) = (
            self.location_ttl_seconds,
            self.location_update_interval_seconds,
        );
        let mut warnings = Vec::new();
        if interval > 0 && ttl <= interval {
            warnings.push(format!(
                "location_ttl_seconds ({ttl}) is not larger than location_update_interval_seconds ({interval}), drivers will flicker out between updates"
            ));
        }
        if interval > 0 && ttl > interval.saturating_mul(10) {
            warnings.push(format!(
                "location_ttl_seconds ({ttl}) spans more than ten update intervals ({interval}s), stale drivers stay matchable that long"
            ));
        }
        warnings
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub location_ttl: Duration,
    pub default_search_radius: Kilometers,
    pub max_frame_size: usize,
}

impl From<&AppConfig> for DispatchSettings {
    fn from(app_config: &AppConfig) -> Self {
        DispatchSettings {
            location_ttl: Duration::from_secs(app_config.location_ttl_seconds),
            default_search_radius: Kilometers(app_config.default_search_radius_km),
            max_frame_size: app_config.max_frame_size,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub redis: Option<Arc<RedisConnectionPool>>,
    pub registry: Arc<LocationRegistry>,
    pub matcher: Arc<ProximityMatcher>,
    pub dispatcher: Arc<DispatchGroupManager>,
    pub connections: Arc<ConnectionHub>,
    pub default_search_radius: Kilometers,
    pub max_frame_size: usize,
}

impl AppState {
    pub async fn new(app_config: AppConfig) -> Result<AppState, AppError> {
        app_config.validate()?;

        for warning in app_config.ttl_warnings() {
            warn!(tag = "[Location TTL]", "{warning}");
        }

        let settings = DispatchSettings::from(&app_config);

        let (storage, redis) = match app_config.registry_backend {
            RegistryBackend::Redis => {
                let redis = Arc::new(RedisConnectionPool::new(app_config.redis_cfg).await?);
                let storage: Arc<dyn StorageBackend> = redis.clone();
                (storage, Some(redis))
            }
            RegistryBackend::InMemory => {
                warn!(
                    tag = "[Registry Backend]",
                    "Using in-memory registry, locations are not shared across instances"
                );
                let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
                (storage, None)
            }
        };

        let mut app_state = AppState::from_parts(
            storage,
            Arc::new(ConnectionHub::new()),
            Arc::new(Haversine),
            settings,
        );
        app_state.redis = redis;

        Ok(app_state)
    }

    /// Wires the dispatch core over already-built collaborators.
    pub fn from_parts(
        storage: Arc<dyn StorageBackend>,
        connections: Arc<ConnectionHub>,
        distance: Arc<dyn DistanceCalculator>,
        settings: DispatchSettings,
    ) -> AppState {
        let registry = Arc::new(LocationRegistry::new(storage.clone(), settings.location_ttl));
        let matcher = Arc::new(ProximityMatcher::new(registry.clone(), distance));
        let dispatcher = Arc::new(DispatchGroupManager::new(connections.clone()));

        AppState {
            storage,
            redis: None,
            registry,
            matcher,
            dispatcher,
            connections,
            default_search_radius: settings.default_search_radius,
            max_frame_size: settings.max_frame_size,
        }
    }
}
