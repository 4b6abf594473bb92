/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::common::storage::{StorageBackend, StorageFields};
use crate::redis::types::RedisConnectionPool;
use crate::tools::{error::AppError, logger::*};
use async_trait::async_trait;
use fred::{
    interfaces::{HashesInterface, KeysInterface, TransactionInterface},
    types::Scanner,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;

impl RedisConnectionPool {
    // DEL + HSET + EXPIRE in one MULTI so readers never see a half-replaced hash
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn replace_hash_with_expiry(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        expiry: i64,
    ) -> Result<(), AppError> {
        let trx = self.pool.next().multi();
        trx.del::<(), _>(key).await?;
        trx.hset::<(), _, _>(key, fields).await?;
        trx.expire::<(), _>(key, expiry).await?;
        trx.exec::<()>(true).await?;
        Ok(())
    }

    //HGETALL
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn get_hash_fields(&self, key: &str) -> Result<Option<StorageFields>, AppError> {
        let fields = self
            .pool
            .hgetall::<HashMap<String, String>, _>(key)
            .await?;

        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields.into_iter().collect()))
        }
    }

    //SCAN MATCH
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::new();
        let mut pages = Box::pin(self.pool.next().scan(
            pattern,
            Some(self.settings.scan_count),
            None,
        ));

        while let Some(page) = pages.next().await {
            let mut page = page?;
            if let Some(results) = page.take_results() {
                keys.extend(results.into_iter().filter_map(|key| key.into_string()));
            }
            let _ = page.next();
        }

        Ok(keys)
    }
}

#[async_trait]
impl StorageBackend for RedisConnectionPool {
    async fn set_fields(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), AppError> {
        // EXPIRE has second granularity, round up so a record never expires early
        let expiry = ttl.as_secs() as i64 + i64::from(ttl.subsec_nanos() > 0);
        self.replace_hash_with_expiry(key, fields, expiry.max(1))
            .await
    }

    async fn get_fields(&self, key: &str) -> Result<Option<StorageFields>, AppError> {
        self.get_hash_fields(key).await
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        self.scan_keys(pattern).await
    }
}
